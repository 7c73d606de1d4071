//! Time sources for the control loop
//!
//! All interval arithmetic uses a monotonic millisecond counter; the
//! wall clock is only consulted for human-readable timestamps that get
//! persisted (calibration records) or embedded in telemetry payloads.
//!
//! Interval bookkeeping itself lives in the scheduler and aggregator;
//! channels only see a [`Clock`] reference for bounded serial waits.

/// Timestamp in milliseconds since device boot (monotonic).
pub type Timestamp = u64;

/// Formatted wall-clock timestamp, e.g. `2024-05-01T10:00:00Z`.
pub type DateString = heapless::String<24>;

/// Monotonic millisecond counter.
pub trait Clock {
    /// Current monotonic time in milliseconds.
    fn now(&self) -> Timestamp;
}

/// Wall-clock source for persisted/reported timestamps.
pub trait WallClock {
    /// Current time formatted as an ISO-8601 UTC string.
    fn formatted_now(&self) -> DateString;
}

/// Monotonic clock backed by `std::time::Instant`.
#[cfg(feature = "std")]
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: std::time::Instant,
}

#[cfg(feature = "std")]
impl SystemClock {
    /// Start counting from the moment of construction.
    pub fn new() -> Self {
        Self {
            started: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        self.started.elapsed().as_millis() as Timestamp
    }
}

/// Wall clock backed by the system time.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct SystemWallClock;

#[cfg(feature = "std")]
impl WallClock for SystemWallClock {
    fn formatted_now(&self) -> DateString {
        use core::fmt::Write;
        let mut out = DateString::new();
        let now = chrono::Utc::now();
        // 20 chars, always fits the 24-byte buffer
        let _ = write!(out, "{}", now.format("%Y-%m-%dT%H:%M:%SZ"));
        out
    }
}

/// Fixed time source for unit tests.
#[derive(Debug, Clone)]
pub struct FixedClock {
    timestamp: Timestamp,
}

impl FixedClock {
    /// Create a clock frozen at the given time.
    pub fn new(timestamp: Timestamp) -> Self {
        Self { timestamp }
    }

    /// Jump to an absolute time.
    pub fn set(&mut self, timestamp: Timestamp) {
        self.timestamp = timestamp;
    }

    /// Advance by the given number of milliseconds.
    pub fn advance(&mut self, ms: u64) {
        self.timestamp += ms;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.timestamp
    }
}

/// Shareable manually-driven clock for integration tests.
///
/// Clones observe the same underlying counter, so a scripted serial port
/// can advance time while the station under test holds its own handle.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct SharedClock(std::rc::Rc<core::cell::Cell<Timestamp>>);

#[cfg(feature = "std")]
impl SharedClock {
    /// Create a clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Jump to an absolute time.
    pub fn set(&self, timestamp: Timestamp) {
        self.0.set(timestamp);
    }

    /// Advance by the given number of milliseconds.
    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

#[cfg(feature = "std")]
impl Clock for SharedClock {
    fn now(&self) -> Timestamp {
        self.0.get()
    }
}

/// Wall clock returning a fixed string, for tests.
#[derive(Debug, Clone)]
pub struct FixedWallClock {
    formatted: DateString,
}

impl FixedWallClock {
    /// Create a wall clock that always reports `formatted`.
    ///
    /// Truncates silently if the string exceeds the date buffer.
    pub fn new(formatted: &str) -> Self {
        let mut out = DateString::new();
        let take = formatted.len().min(out.capacity());
        // Valid UTF-8 prefix is guaranteed for ASCII timestamps
        let _ = out.push_str(&formatted[..take]);
        Self { formatted: out }
    }
}

impl WallClock for FixedWallClock {
    fn formatted_now(&self) -> DateString {
        self.formatted.clone()
    }
}

/// Milliseconds elapsed between two timestamps, saturating at zero.
pub fn elapsed(earlier: Timestamp, later: Timestamp) -> u64 {
    later.saturating_sub(earlier)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_advances() {
        let mut clock = FixedClock::new(1000);
        assert_eq!(clock.now(), 1000);

        clock.advance(500);
        assert_eq!(clock.now(), 1500);
    }

    #[cfg(feature = "std")]
    #[test]
    fn shared_clock_clones_observe_updates() {
        let clock = SharedClock::new();
        let other = clock.clone();

        clock.advance(250);
        assert_eq!(other.now(), 250);

        other.set(1000);
        assert_eq!(clock.now(), 1000);
    }

    #[test]
    fn elapsed_saturates() {
        assert_eq!(elapsed(100, 400), 300);
        assert_eq!(elapsed(400, 100), 0);
    }

    #[test]
    fn fixed_wall_clock_reports_constant() {
        let wall = FixedWallClock::new("2024-05-01T10:00:00Z");
        assert_eq!(wall.formatted_now().as_str(), "2024-05-01T10:00:00Z");
    }
}
