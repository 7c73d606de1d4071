//! Persisted settings store contract
//!
//! The station does not own a persistence engine; it consumes a simple
//! key-value store assumed to exist externally (flash preferences on the
//! target, an in-memory map in tests). Stored values: sensor serial
//! numbers, calibration timestamps, OTA outcomes and the configurable
//! publish interval.

/// A stored string value (serial number, formatted timestamp and the like).
pub type SettingString = heapless::String<24>;

/// Sentinel for "no information recorded", used for serial numbers and
/// calibration timestamps that have never been written.
pub const NO_INFO: &str = "NO INFO";

/// Keys under which the station persists its state.
pub mod keys {
    /// SO2 sensor serial number.
    pub const SO2_SERIAL: &str = "so2_serial";
    /// SO2 last successful zeroing timestamp.
    pub const SO2_LAST_ZERO: &str = "so2_zeroed";
    /// SO2 last failed zeroing timestamp.
    pub const SO2_LAST_FAILED_ZERO: &str = "so2_zero_failed";
    /// NO2 sensor serial number.
    pub const NO2_SERIAL: &str = "no2_serial";
    /// NO2 last successful zeroing timestamp.
    pub const NO2_LAST_ZERO: &str = "no2_zeroed";
    /// NO2 last failed zeroing timestamp.
    pub const NO2_LAST_FAILED_ZERO: &str = "no2_zero_failed";
    /// Last successful firmware update timestamp.
    pub const LAST_OTA_OK: &str = "last_ota_ok";
    /// Last failed firmware update timestamp.
    pub const LAST_OTA_FAILED: &str = "last_ota_failed";
    /// User-configured publish interval, seconds.
    pub const PUBLISH_INTERVAL: &str = "pub_interval";
}

/// External key-value settings store.
pub trait SettingsStore {
    /// Read a string, falling back to `default` when the key is absent.
    fn get_str(&self, key: &str, default: &str) -> SettingString;

    /// Persist a string value.
    fn put_str(&mut self, key: &str, value: &str);

    /// Read an integer, falling back to `default` when the key is absent.
    fn get_i32(&self, key: &str, default: i32) -> i32;

    /// Persist an integer value.
    fn put_i32(&mut self, key: &str, value: i32);
}

/// In-memory store for tests and host-side tooling.
#[cfg(feature = "std")]
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    strings: std::collections::HashMap<String, String>,
    ints: std::collections::HashMap<String, i32>,
}

#[cfg(feature = "std")]
impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "std")]
impl SettingsStore for MemoryStore {
    fn get_str(&self, key: &str, default: &str) -> SettingString {
        let value = self.strings.get(key).map(String::as_str).unwrap_or(default);
        let mut out = SettingString::new();
        let take = value.len().min(out.capacity());
        let _ = out.push_str(&value[..take]);
        out
    }

    fn put_str(&mut self, key: &str, value: &str) {
        self.strings.insert(key.to_owned(), value.to_owned());
    }

    fn get_i32(&self, key: &str, default: i32) -> i32 {
        self.ints.get(key).copied().unwrap_or(default)
    }

    fn put_i32(&mut self, key: &str, value: i32) {
        self.ints.insert(key.to_owned(), value);
    }
}
