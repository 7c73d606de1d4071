//! Acquisition and health core for a three-channel air quality station
//!
//! Drives three heterogeneous gas/particulate sensors over serial links,
//! tracks each sensor's health independently, smooths readings with a
//! rolling average and decides when telemetry is emitted.
//!
//! Key constraints:
//! - Single-threaded, tick-driven control loop (no locks, no re-entrancy)
//! - No heap allocation in the acquisition path
//! - Serial reads block for a bounded timeout (1.5s per operation)
//!
//! ```no_run
//! use trisense::{Station, ChannelPorts};
//! use trisense::transport::ScriptedPort;
//! use trisense::storage::MemoryStore;
//! use trisense::aggregator::NullSink;
//! use trisense::time::{SharedClock, FixedWallClock};
//! use trisense::snapshot::StaticDiagnostics;
//!
//! let clock = SharedClock::new();
//! let ports = ChannelPorts {
//!     so2: ScriptedPort::new(clock.clone()),
//!     no2: ScriptedPort::new(clock.clone()),
//!     particulate: ScriptedPort::new(clock.clone()),
//! };
//! let mut station = Station::new(
//!     ports,
//!     MemoryStore::new(),
//!     NullSink,
//!     clock,
//!     FixedWallClock::new("2024-01-01T00:00:00Z"),
//!     StaticDiagnostics::default(),
//!     "A1B2C3D4E5F6",
//! );
//! station.init_sensors();
//! loop {
//!     station.on_tick();
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![deny(unsafe_code)]
#![warn(missing_docs)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod aggregator;
pub mod buffer;
pub mod calibration;
pub mod channel;
pub mod constants;
pub mod convert;
pub mod errors;
pub mod events;
pub mod payload;
pub mod scheduler;
pub mod snapshot;
pub mod station;
pub mod storage;
pub mod time;
pub mod transport;
pub mod wire;

// Public API
pub use buffer::RollingAverage;
pub use channel::{Health, SensorChannel};
pub use errors::{ConfigError, ReadError, ZeroError};
pub use events::ChannelKind;
pub use calibration::{ZeroReport, ZeroTarget};
pub use station::{ChannelPorts, Station};

/// Crate version, reported as the device firmware version in metadata.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
