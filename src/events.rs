//! Channel lifecycle events
//!
//! Health transitions, sensor swaps and calibration outcomes are not
//! reported inline by the code that detects them; they are pushed onto a
//! small fixed-capacity queue the station drains once per tick. Any
//! drained event forces an immediate metadata emission, so offline and
//! swap conditions reach the platform without waiting for the periodic
//! cadence.
//!
//! Events are small `Copy` values; the queue overwrites its oldest entry
//! when full since recent state changes matter more than stale ones.

use crate::time::Timestamp;

/// Capacity of the station event queue.
pub const EVENT_QUEUE_DEPTH: usize = 8;

/// Identifies one of the three sensor channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelKind {
    /// Sulfur dioxide electrochemical sensor.
    So2 = 0,
    /// Nitrogen dioxide electrochemical sensor.
    No2 = 1,
    /// Optical particulate matter sensor.
    Particulate = 2,
}

impl ChannelKind {
    /// Human-readable channel name for logs and payloads.
    pub const fn name(&self) -> &'static str {
        match self {
            ChannelKind::So2 => "SO2",
            ChannelKind::No2 => "NO2",
            ChannelKind::Particulate => "PMS",
        }
    }

    /// Whether this channel speaks the gas sensor ASCII protocol.
    pub const fn is_gas(&self) -> bool {
        matches!(self, ChannelKind::So2 | ChannelKind::No2)
    }

    /// Stable index for per-channel bookkeeping arrays.
    pub const fn index(&self) -> usize {
        *self as usize
    }
}

/// A state change worth reporting out-of-band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Retry threshold exceeded; channel torn down and averages reset.
    WentOffline {
        /// Affected channel.
        kind: ChannelKind,
        /// When the transition happened (monotonic ms).
        timestamp: Timestamp,
    },
    /// A probe succeeded on a previously offline channel.
    Recovered {
        /// Affected channel.
        kind: ChannelKind,
        /// When the probe succeeded (monotonic ms).
        timestamp: Timestamp,
    },
    /// A successful read reported a serial number different from the
    /// stored one; calibration history was cleared.
    SensorSwapped {
        /// Affected channel.
        kind: ChannelKind,
        /// When the swap was detected (monotonic ms).
        timestamp: Timestamp,
    },
    /// Zero calibration completed and a new baseline is in effect.
    ZeroSucceeded {
        /// Affected channel.
        kind: ChannelKind,
        /// When the confirmation arrived (monotonic ms).
        timestamp: Timestamp,
    },
    /// Zero calibration failed; previous baseline and averages kept.
    ZeroFailed {
        /// Affected channel.
        kind: ChannelKind,
        /// When the failure was recorded (monotonic ms).
        timestamp: Timestamp,
    },
    /// The publish interval was changed and persisted.
    IntervalChanged {
        /// New interval in seconds.
        seconds: i32,
        /// When the change took effect (monotonic ms).
        timestamp: Timestamp,
    },
}

impl ChannelEvent {
    /// Channel the event concerns, if any.
    pub fn kind(&self) -> Option<ChannelKind> {
        match self {
            ChannelEvent::WentOffline { kind, .. }
            | ChannelEvent::Recovered { kind, .. }
            | ChannelEvent::SensorSwapped { kind, .. }
            | ChannelEvent::ZeroSucceeded { kind, .. }
            | ChannelEvent::ZeroFailed { kind, .. } => Some(*kind),
            ChannelEvent::IntervalChanged { .. } => None,
        }
    }

    /// Event timestamp (monotonic ms).
    pub fn timestamp(&self) -> Timestamp {
        match self {
            ChannelEvent::WentOffline { timestamp, .. }
            | ChannelEvent::Recovered { timestamp, .. }
            | ChannelEvent::SensorSwapped { timestamp, .. }
            | ChannelEvent::ZeroSucceeded { timestamp, .. }
            | ChannelEvent::ZeroFailed { timestamp, .. }
            | ChannelEvent::IntervalChanged { timestamp, .. } => *timestamp,
        }
    }
}

/// Fixed-capacity event queue, oldest entry dropped on overflow.
#[derive(Debug, Default)]
pub struct EventQueue {
    events: heapless::Deque<ChannelEvent, EVENT_QUEUE_DEPTH>,
}

impl EventQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event, evicting the oldest if the queue is full.
    pub fn push(&mut self, event: ChannelEvent) {
        if self.events.is_full() {
            let _ = self.events.pop_front();
        }
        // Cannot fail: a slot was just freed if necessary
        let _ = self.events.push_back(event);
    }

    /// Remove and return the oldest event.
    pub fn pop(&mut self) -> Option<ChannelEvent> {
        self.events.pop_front()
    }

    /// Number of queued events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if no events are queued.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
