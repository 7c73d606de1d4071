//! Intervals, Timeouts and Retry Policy
//!
//! Deployment policy for how often sensors are polled, how long serial
//! operations may block, and when a sensor is declared offline.

/// Milliseconds to wait for a sensor reply before the operation times out.
///
/// The gas sensors answer well under a second; 1.5s gives margin without
/// stalling the control loop noticeably.
pub const SERIAL_TIMEOUT_MS: u64 = 1500;

/// Default seconds between reading emissions.
pub const DEFAULT_PUBLISH_INTERVAL_S: i32 = 60;

/// Minimum user-settable publish interval (seconds).
pub const PUBLISH_INTERVAL_MIN_S: i32 = 30;

/// Maximum user-settable publish interval (seconds).
pub const PUBLISH_INTERVAL_MAX_S: i32 = 600;

/// Samples held by each rolling average.
///
/// The read interval is derived as publish interval / this count, so one
/// averaging window always spans one publish period.
pub const AVERAGING_SAMPLES: usize = 10;

/// Consecutive failed reads before a channel is considered offline.
pub const RETRIES_BEFORE_OFFLINE: u8 = 5;

/// Multiplier applied to the publish interval to derive the degraded
/// probe cadence used while a channel is offline.
pub const OFFLINE_PROBE_FACTOR: u64 = 2;

/// Seconds between metadata emissions.
pub const METADATA_INTERVAL_S: u64 = 900;

/// Seconds after boot at which the one-shot initial metadata emission
/// fires, so the platform learns the device state shortly after power-up.
pub const BOOT_METADATA_DELAY_S: u64 = 70;
