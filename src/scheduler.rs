//! Acquisition cadence bookkeeping
//!
//! The scheduler decides, once per tick and per channel, whether the
//! channel should be read, probed or left alone. It owns only
//! timestamps; all sensor state lives in the channels.
//!
//! Two cadences derive from the publish interval:
//!
//! - read interval: publish interval divided by the averaging window,
//!   so one publish cycle fills the rolling averages exactly once
//! - probe interval: twice the publish interval, the degraded cadence
//!   for Offline channels
//!
//! Decisions within one tick all use the timestamp taken at the start
//! of the round, so a slow serial exchange on one channel cannot skew
//! the bookkeeping of the next.

use crate::{
    channel::Health,
    constants::time::{AVERAGING_SAMPLES, OFFLINE_PROBE_FACTOR},
    events::ChannelKind,
    time::{elapsed, Timestamp},
};

/// Number of scheduled channel slots.
pub const CHANNEL_SLOTS: usize = 3;

/// What the current tick should do with one channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollAction {
    /// Channel is Online and its read interval elapsed.
    Read,
    /// Channel is Offline and its probe interval elapsed.
    Probe,
    /// Nothing due.
    Skip,
}

/// Per-channel read and probe timers derived from the publish interval.
#[derive(Debug)]
pub struct AcquisitionScheduler {
    read_interval_ms: u64,
    probe_interval_ms: u64,
    last_read_at: [Timestamp; CHANNEL_SLOTS],
    last_probe_at: [Timestamp; CHANNEL_SLOTS],
}

impl AcquisitionScheduler {
    /// Create a scheduler with cadences derived from `publish_interval_s`.
    pub fn new(publish_interval_s: i32) -> Self {
        let mut scheduler = Self {
            read_interval_ms: 0,
            probe_interval_ms: 0,
            last_read_at: [0; CHANNEL_SLOTS],
            last_probe_at: [0; CHANNEL_SLOTS],
        };
        scheduler.apply_publish_interval(publish_interval_s);
        scheduler
    }

    /// Re-derive both cadences after the publish interval changed.
    ///
    /// Running timers keep their last-fired timestamps; the new
    /// cadence takes effect from the next tick.
    pub fn apply_publish_interval(&mut self, publish_interval_s: i32) {
        let publish_ms = publish_interval_s as u64 * 1_000;
        self.read_interval_ms = publish_ms / AVERAGING_SAMPLES as u64;
        self.probe_interval_ms = publish_ms * OFFLINE_PROBE_FACTOR;
        log::debug!(
            "cadence: read every {}ms, probe every {}ms",
            self.read_interval_ms,
            self.probe_interval_ms,
        );
    }

    /// Decide what to do with one channel at round timestamp `now`.
    ///
    /// Returning [`PollAction::Read`] or [`PollAction::Probe`] marks
    /// the corresponding timer as fired at `now`.
    pub fn decide(&mut self, kind: ChannelKind, health: Health, now: Timestamp) -> PollAction {
        let slot = kind.index();
        match health {
            Health::Online => {
                if elapsed(self.last_read_at[slot], now) >= self.read_interval_ms {
                    self.last_read_at[slot] = now;
                    PollAction::Read
                } else {
                    PollAction::Skip
                }
            }
            Health::Offline => {
                if elapsed(self.last_probe_at[slot], now) >= self.probe_interval_ms {
                    self.last_probe_at[slot] = now;
                    PollAction::Probe
                } else {
                    PollAction::Skip
                }
            }
            Health::Uninitialized | Health::Initializing => PollAction::Skip,
        }
    }

    /// Read cadence in whole seconds, reported in device metadata.
    pub fn read_interval_s(&self) -> u64 {
        self.read_interval_ms / 1_000
    }
}
