//! Error types for sensor acquisition and calibration
//!
//! Kept small and `Copy` since errors are returned in the polling hot
//! path and stored in retry counters. No heap allocation: messages are
//! `&'static str` only.
//!
//! Error taxonomy:
//! - [`ReadError`]: a single failed poll (timeout or malformed reply).
//!   Never surfaced individually; counted toward the offline threshold.
//! - [`ZeroError`]: a failed calibration sequence. Recorded as a
//!   persisted failure timestamp, never retried automatically.
//! - [`ConfigError`]: a rejected configuration change.

use thiserror_no_std::Error;

/// Result type for single poll operations.
pub type ReadResult<T> = Result<T, ReadError>;

/// A single failed read or probe attempt.
///
/// Timeouts and malformed data are treated identically for retry
/// counting; the distinction only matters for logging.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    /// Sensor did not reply within the serial timeout
    #[error("sensor did not reply within the serial timeout")]
    Timeout,

    /// Reply was received but could not be parsed
    #[error("malformed reply: {reason}")]
    Malformed {
        /// What was wrong with the reply
        reason: &'static str,
    },
}

/// A failed zero-calibration sequence.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroError {
    /// Sensor did not reply (or did not stop replying) within the timeout
    #[error("sensor did not complete the zeroing handshake in time")]
    Timeout,

    /// Sensor replied with something other than the confirmation sequence
    #[error("zeroing confirmation mismatch")]
    ConfirmationMismatch,
}

/// A rejected configuration change.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Requested publish interval is outside the accepted range
    #[error("publish interval {seconds}s outside [{min}s, {max}s]")]
    IntervalOutOfRange {
        /// The rejected value
        seconds: i32,
        /// Lower bound of the accepted range
        min: i32,
        /// Upper bound of the accepted range
        max: i32,
    },
}

#[cfg(feature = "defmt")]
impl defmt::Format for ReadError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Timeout => defmt::write!(fmt, "serial timeout"),
            Self::Malformed { reason } => defmt::write!(fmt, "malformed reply: {}", reason),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ZeroError {
    fn format(&self, fmt: defmt::Formatter) {
        match self {
            Self::Timeout => defmt::write!(fmt, "zeroing timeout"),
            Self::ConfirmationMismatch => defmt::write!(fmt, "zeroing confirmation mismatch"),
        }
    }
}
