//! Publish cadence and the outbound sink
//!
//! The aggregator owns the two outbound timers: the reading publish
//! interval and the metadata cadence (periodic plus a one-shot early
//! metadata shortly after boot, so the platform learns the device's
//! state without waiting out the first full period).
//!
//! Event-triggered metadata goes out through the station directly and
//! deliberately does not touch the periodic timer; a burst of events
//! must not starve the regular cadence.

use crate::{
    constants::time::{BOOT_METADATA_DELAY_S, METADATA_INTERVAL_S},
    time::{elapsed, Timestamp},
};

/// Outbound transport for encoded telemetry.
///
/// Implementations wrap whatever session layer the device uses; `false`
/// means the publish did not go out, which the caller logs and
/// otherwise ignores. Delivery retries belong to the transport, not the
/// acquisition core.
pub trait TelemetrySink {
    /// Publish one payload. `retain` asks the broker to keep the last
    /// value for late subscribers.
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> bool;
}

/// Sink that discards everything, for hosts without a session layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn publish(&mut self, _topic: &str, _payload: &[u8], _retain: bool) -> bool {
        true
    }
}

/// Reading and metadata publish timers.
#[derive(Debug)]
pub struct TelemetryAggregator {
    publish_interval_ms: u64,
    last_reading_at: Timestamp,
    last_metadata_at: Timestamp,
    boot_metadata_done: bool,
}

impl TelemetryAggregator {
    /// Create timers for the given publish interval.
    pub fn new(publish_interval_s: i32) -> Self {
        Self {
            publish_interval_ms: publish_interval_s as u64 * 1_000,
            last_reading_at: 0,
            last_metadata_at: 0,
            boot_metadata_done: false,
        }
    }

    /// Apply a changed publish interval from the next tick on.
    pub fn apply_publish_interval(&mut self, publish_interval_s: i32) {
        self.publish_interval_ms = publish_interval_s as u64 * 1_000;
    }

    /// Whether a reading publish is due at `now`; marks the timer fired.
    pub fn reading_due(&mut self, now: Timestamp) -> bool {
        if elapsed(self.last_reading_at, now) >= self.publish_interval_ms {
            self.last_reading_at = now;
            true
        } else {
            false
        }
    }

    /// Whether a periodic or boot metadata publish is due at `now`.
    ///
    /// The boot one-shot fires once the boot delay has passed and does
    /// not reset the periodic timer. A periodic fire also counts as the
    /// boot one-shot, so a skipped delay window never queues a second
    /// publish later.
    pub fn metadata_due(&mut self, now: Timestamp) -> bool {
        if elapsed(self.last_metadata_at, now) >= METADATA_INTERVAL_S * 1_000 {
            self.last_metadata_at = now;
            self.boot_metadata_done = true;
            return true;
        }
        if !self.boot_metadata_done && now >= BOOT_METADATA_DELAY_S * 1_000 {
            self.boot_metadata_done = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_fires_on_the_publish_interval() {
        let mut aggregator = TelemetryAggregator::new(60);
        assert!(!aggregator.reading_due(59_999));
        assert!(aggregator.reading_due(60_000));
        assert!(!aggregator.reading_due(60_001));
        assert!(aggregator.reading_due(120_000));
    }

    #[test]
    fn interval_change_applies_from_next_tick() {
        let mut aggregator = TelemetryAggregator::new(60);
        assert!(aggregator.reading_due(60_000));
        aggregator.apply_publish_interval(120);
        assert!(!aggregator.reading_due(120_000));
        assert!(aggregator.reading_due(180_000));
    }

    #[test]
    fn boot_metadata_fires_once_after_the_delay() {
        let mut aggregator = TelemetryAggregator::new(60);
        assert!(!aggregator.metadata_due(69_000));
        assert!(aggregator.metadata_due(70_000));
        // One-shot; next due is the periodic cadence
        assert!(!aggregator.metadata_due(71_000));
        assert!(!aggregator.metadata_due(899_000));
        assert!(aggregator.metadata_due(900_000));
    }

    #[test]
    fn periodic_metadata_restarts_from_fire_time() {
        let mut aggregator = TelemetryAggregator::new(60);
        assert!(aggregator.metadata_due(900_000));
        assert!(!aggregator.metadata_due(1_799_000));
        assert!(aggregator.metadata_due(1_800_000));
    }
}
