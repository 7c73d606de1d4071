//! Sensor Wire Formats and Conversion Constants
//!
//! Values here come from the electrochemical gas sensor serial protocol
//! and the particulate sensor's vendor frame format. Changing any of them
//! breaks compatibility with the deployed hardware.

// ===== GAS CONCENTRATION CONVERSION =====

/// Conversion factor from parts-per-billion to µg/m³.
///
/// Derived from the ideal gas law at 1 atm: 12.187 = 1000 / R with R in
/// (L·mmHg)/(K·mol) terms. Used as `ppb * 12.187 * M / (273.15 + T)`.
pub const PPB_TO_UGM3_FACTOR: f32 = 12.187;

/// Molar mass of sulfur dioxide (g/mol).
pub const SO2_MOLAR_MASS: f32 = 64.0638;

/// Molar mass of nitrogen dioxide (g/mol).
pub const NO2_MOLAR_MASS: f32 = 46.0055;

/// Absolute zero in Celsius.
///
/// A reported temperature at or below this value makes the ppb conversion
/// degenerate; such samples are discarded as malformed.
pub const ABSOLUTE_ZERO_CELSIUS: f32 = -273.15;

// ===== GAS SENSOR SERIAL PROTOCOL =====

/// Number of comma-delimited fields in a gas sensor data line.
///
/// Layout: serial number, ppb, temperature, humidity, ADC word, digital
/// temperature, digital humidity, uptime days/hours/minutes/seconds.
pub const GAS_FIELD_COUNT: usize = 11;

/// Length of a valid sensor serial number string.
pub const SERIAL_NUMBER_LEN: usize = 12;

/// Length of a valid firmware version reply to the handshake query.
pub const FIRMWARE_REPLY_LEN: usize = 7;

/// Calibration offset applied to the analog temperature field (°C).
///
/// Empirical correction for self-heating of the sensor board.
pub const TEMPERATURE_OFFSET_C: i32 = -2;

/// Calibration offset applied to the analog humidity field (%RH).
pub const HUMIDITY_OFFSET_PCT: i32 = -1;

/// Continuous sensor uptime (hours) after which gas readings are
/// scientifically valid. Electrochemical cells need a warm-up period
/// before their baseline settles.
pub const READY_UPTIME_HOURS: i32 = 3;

/// Confirmation line the gas sensor prints after a successful zeroing.
/// The trailing carriage return is part of the line (replies are CRLF
/// terminated and lines are split on LF).
pub const ZERO_CONFIRMATION: &str = "Setting zero...done\r";

// ===== PARTICULATE SENSOR VENDOR FRAME =====

/// Total length of a particulate sensor frame in bytes.
pub const PM_FRAME_LEN: usize = 32;

/// Frame start bytes ("BM" in ASCII).
pub const PM_FRAME_HEADER: [u8; 2] = [0x42, 0x4D];

/// Value of the frame length word (payload after the length field:
/// 13 data words plus the checksum word).
pub const PM_FRAME_BODY_LEN: u16 = 28;
