//! Constants for the acquisition core
//!
//! Centralized numeric values used throughout the station logic, grouped
//! by domain. Always use these instead of magic numbers; when adding a
//! constant, document where the value comes from (sensor datasheet,
//! platform contract, or deployment policy).

/// Sensor wire formats, conversion constants and calibration offsets.
pub mod sensors;

/// Intervals, timeouts and retry policy.
pub mod time;

// Re-export commonly used constants for convenience
pub use sensors::{NO2_MOLAR_MASS, PPB_TO_UGM3_FACTOR, SO2_MOLAR_MASS};
pub use time::{
    AVERAGING_SAMPLES, DEFAULT_PUBLISH_INTERVAL_S, PUBLISH_INTERVAL_MAX_S,
    PUBLISH_INTERVAL_MIN_S, RETRIES_BEFORE_OFFLINE, SERIAL_TIMEOUT_MS,
};
