//! Sensor wire format parsing
//!
//! Two formats are spoken on the serial links:
//!
//! - The gas sensors answer a poll with one ASCII line of eleven
//!   comma-delimited fields: serial number, concentration (ppb), analog
//!   temperature and humidity, ADC word, digital temperature and
//!   humidity, and the sensor's continuous uptime split into
//!   days/hours/minutes/seconds.
//! - The particulate sensor streams fixed 32-byte binary frames with a
//!   two-byte header, big-endian data words and a trailing additive
//!   checksum.
//!
//! Parsers are pure: calibration offsets and unit conversion are applied
//! by the channel, not here.

use crate::{
    constants::sensors::{
        GAS_FIELD_COUNT, PM_FRAME_BODY_LEN, PM_FRAME_HEADER, PM_FRAME_LEN,
    },
    errors::{ReadError, ReadResult},
};

/// Sensor serial number as reported on the wire.
pub type SerialNumber = heapless::String<16>;

/// Sensor firmware version as reported by the handshake.
pub type FirmwareVersion = heapless::String<16>;

/// Continuous sensor uptime as reported in a gas data line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorUptime {
    /// Whole days of continuous operation.
    pub days: i32,
    /// Hours component.
    pub hours: i32,
    /// Minutes component.
    pub minutes: i32,
    /// Seconds component.
    pub seconds: i32,
}

/// One parsed gas sensor data line, raw (no offsets applied).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasFrame {
    /// Serial number field (validity checked by the channel).
    pub serial: SerialNumber,
    /// Concentration in parts-per-billion.
    pub ppb: i32,
    /// Analog temperature, °C, uncorrected.
    pub temperature_c: i32,
    /// Analog relative humidity, %, uncorrected.
    pub humidity_pct: i32,
    /// Raw ADC word backing the concentration measurement.
    pub adc: i32,
    /// Digital temperature channel, °C.
    pub temperature_digital: i32,
    /// Digital humidity channel, %.
    pub humidity_digital: i32,
    /// Continuous uptime reported by the sensor.
    pub uptime: SensorUptime,
}

/// Parse one gas sensor data line into its eleven fields.
///
/// Any empty or non-numeric field, or a field count other than eleven,
/// is a malformed read and counts as a retry upstream.
pub fn parse_gas_line(line: &str) -> ReadResult<GasFrame> {
    let mut fields: heapless::Vec<&str, GAS_FIELD_COUNT> = heapless::Vec::new();
    for field in line.split(',') {
        let field = field.trim();
        if field.is_empty() {
            return Err(ReadError::Malformed {
                reason: "empty field",
            });
        }
        if fields.push(field).is_err() {
            return Err(ReadError::Malformed {
                reason: "too many fields",
            });
        }
    }
    if fields.len() != GAS_FIELD_COUNT {
        return Err(ReadError::Malformed {
            reason: "wrong field count",
        });
    }

    let mut serial = SerialNumber::new();
    let take = fields[0].len().min(serial.capacity());
    let _ = serial.push_str(&fields[0][..take]);

    let mut numbers = [0i32; GAS_FIELD_COUNT - 1];
    for (slot, field) in numbers.iter_mut().zip(&fields[1..]) {
        *slot = field.parse().map_err(|_| ReadError::Malformed {
            reason: "non-numeric field",
        })?;
    }

    Ok(GasFrame {
        serial,
        ppb: numbers[0],
        temperature_c: numbers[1],
        humidity_pct: numbers[2],
        adc: numbers[3],
        temperature_digital: numbers[4],
        humidity_digital: numbers[5],
        uptime: SensorUptime {
            days: numbers[6],
            hours: numbers[7],
            minutes: numbers[8],
            seconds: numbers[9],
        },
    })
}

/// One decoded particulate frame (atmospheric-environment values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmFrame {
    /// PM1.0 concentration, µg/m³.
    pub pm1: u16,
    /// PM2.5 concentration, µg/m³.
    pub pm2_5: u16,
    /// PM10 concentration, µg/m³.
    pub pm10: u16,
}

/// Decode and verify one 32-byte particulate vendor frame.
pub fn parse_pm_frame(frame: &[u8]) -> ReadResult<PmFrame> {
    if frame.len() != PM_FRAME_LEN {
        return Err(ReadError::Malformed {
            reason: "wrong frame length",
        });
    }
    if frame[0..2] != PM_FRAME_HEADER {
        return Err(ReadError::Malformed {
            reason: "bad frame header",
        });
    }
    if word(frame, 2) != PM_FRAME_BODY_LEN {
        return Err(ReadError::Malformed {
            reason: "bad frame length word",
        });
    }

    let sum: u16 = frame[..PM_FRAME_LEN - 2]
        .iter()
        .fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
    if sum != word(frame, PM_FRAME_LEN - 2) {
        return Err(ReadError::Malformed {
            reason: "checksum mismatch",
        });
    }

    // Words 4..10 are factory-condition values; the atmospheric set
    // starts at byte 10.
    Ok(PmFrame {
        pm1: word(frame, 10),
        pm2_5: word(frame, 12),
        pm10: word(frame, 14),
    })
}

fn word(frame: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([frame[at], frame[at + 1]])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    const GOOD_LINE: &str = "212602030952, 100, 27, 46, 512, 25, 44, 0, 4, 20, 7";

    /// Build a valid frame carrying the given atmospheric PM values.
    pub(crate) fn pm_frame(pm1: u16, pm2_5: u16, pm10: u16) -> [u8; PM_FRAME_LEN] {
        let mut frame = [0u8; PM_FRAME_LEN];
        frame[0] = PM_FRAME_HEADER[0];
        frame[1] = PM_FRAME_HEADER[1];
        frame[2..4].copy_from_slice(&PM_FRAME_BODY_LEN.to_be_bytes());
        frame[10..12].copy_from_slice(&pm1.to_be_bytes());
        frame[12..14].copy_from_slice(&pm2_5.to_be_bytes());
        frame[14..16].copy_from_slice(&pm10.to_be_bytes());
        let sum: u16 = frame[..PM_FRAME_LEN - 2]
            .iter()
            .fold(0u16, |acc, &b| acc.wrapping_add(b as u16));
        frame[30..32].copy_from_slice(&sum.to_be_bytes());
        frame
    }

    #[test]
    fn parses_good_gas_line() {
        let frame = parse_gas_line(GOOD_LINE).unwrap();
        assert_eq!(frame.serial.as_str(), "212602030952");
        assert_eq!(frame.ppb, 100);
        assert_eq!(frame.temperature_c, 27);
        assert_eq!(frame.humidity_pct, 46);
        assert_eq!(frame.adc, 512);
        assert_eq!(frame.temperature_digital, 25);
        assert_eq!(frame.humidity_digital, 44);
        assert_eq!(
            frame.uptime,
            SensorUptime {
                days: 0,
                hours: 4,
                minutes: 20,
                seconds: 7
            }
        );
    }

    #[test]
    fn empty_field_is_malformed() {
        let line = "212602030952, , 27, 46, 512, 25, 44, 0, 4, 20, 7";
        assert_eq!(
            parse_gas_line(line),
            Err(ReadError::Malformed {
                reason: "empty field"
            })
        );
    }

    #[test]
    fn wrong_field_count_is_malformed() {
        assert!(parse_gas_line("212602030952, 100, 27").is_err());
        let extra = "212602030952, 100, 27, 46, 512, 25, 44, 0, 4, 20, 7, 9";
        assert!(parse_gas_line(extra).is_err());
    }

    #[test]
    fn non_numeric_field_is_malformed() {
        let line = "212602030952, abc, 27, 46, 512, 25, 44, 0, 4, 20, 7";
        assert_eq!(
            parse_gas_line(line),
            Err(ReadError::Malformed {
                reason: "non-numeric field"
            })
        );
    }

    #[test]
    fn negative_temperature_parses() {
        let line = "212602030952, 100, -12, 46, 512, 25, 44, 0, 4, 20, 7";
        assert_eq!(parse_gas_line(line).unwrap().temperature_c, -12);
    }

    #[test]
    fn decodes_good_pm_frame() {
        let frame = pm_frame(8, 17, 21);
        assert_eq!(
            parse_pm_frame(&frame).unwrap(),
            PmFrame {
                pm1: 8,
                pm2_5: 17,
                pm10: 21
            }
        );
    }

    #[test]
    fn rejects_bad_header() {
        let mut frame = pm_frame(8, 17, 21);
        frame[0] = 0x00;
        assert!(parse_pm_frame(&frame).is_err());
    }

    #[test]
    fn rejects_checksum_mismatch() {
        let mut frame = pm_frame(8, 17, 21);
        frame[12] ^= 0xFF;
        assert_eq!(
            parse_pm_frame(&frame),
            Err(ReadError::Malformed {
                reason: "checksum mismatch"
            })
        );
    }

    #[test]
    fn rejects_short_frame() {
        assert!(parse_pm_frame(&[0x42, 0x4D, 0, 28]).is_err());
    }
}
