//! Point-in-time views over the three channels
//!
//! Snapshots are plain data assembled from channel state. They carry no
//! serialization concerns; the outbound JSON shape lives in `payload`.
//!
//! A reading snapshot follows availability rules: Offline channels are
//! omitted entirely, and ambient temperature and humidity come from the
//! NO2 channel when it is Online, falling back to SO2, otherwise
//! omitted. A metadata snapshot always describes every channel,
//! including Offline ones, because absence is exactly what metadata is
//! for.

use crate::{
    buffer::RollingAverage,
    channel::SensorChannel,
    storage::{keys, SettingString, SettingsStore, NO_INFO},
    time::Timestamp,
    transport::SerialPort,
    wire::SensorUptime,
};

/// Formatted uptime such as `"3d 7h 12m 9s"`.
pub type ActiveTime = heapless::String<32>;

/// Platform introspection for the metadata snapshot.
///
/// On hardware this wraps the SoC and radio APIs; hosts and tests use
/// [`StaticDiagnostics`].
pub trait DeviceDiagnostics {
    /// Radio signal strength, dBm.
    fn rssi(&self) -> i32;
    /// Free heap, bytes.
    fn free_heap(&self) -> u32;
    /// Total flash size, bytes.
    fn flash_size(&self) -> u32;
    /// Flash used by the running application, bytes.
    fn app_size_used(&self) -> u32;
    /// Flash reserved for application images, bytes.
    fn app_size_total(&self) -> u32;
    /// Why the device last reset.
    fn reset_reason(&self) -> &str;
}

/// Fixed diagnostics values for hosts without platform introspection.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticDiagnostics;

impl DeviceDiagnostics for StaticDiagnostics {
    fn rssi(&self) -> i32 {
        0
    }

    fn free_heap(&self) -> u32 {
        0
    }

    fn flash_size(&self) -> u32 {
        0
    }

    fn app_size_used(&self) -> u32 {
        0
    }

    fn app_size_total(&self) -> u32 {
        0
    }

    fn reset_reason(&self) -> &str {
        "UNKNOWN"
    }
}

/// One gas channel's contribution to a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasReading {
    /// Rolling-average concentration, µg/m³.
    pub concentration: i32,
    /// Most recent raw ADC word.
    pub adc: i32,
    /// Warm-up flag.
    pub ready: bool,
}

/// The particulate channel's contribution to a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PmReading {
    /// Rolling-average PM1.0, µg/m³.
    pub pm1: i32,
    /// Rolling-average PM2.5, µg/m³.
    pub pm2_5: i32,
    /// Rolling-average PM10, µg/m³.
    pub pm10: i32,
}

/// Everything one periodic reading publish can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadingSnapshot {
    /// SO2 data, absent while the channel is not Online.
    pub so2: Option<GasReading>,
    /// NO2 data, absent while the channel is not Online.
    pub no2: Option<GasReading>,
    /// Particle buckets, absent while the channel is not Online.
    pub particulate: Option<PmReading>,
    /// Ambient temperature from NO2, falling back to SO2, °C.
    pub temperature: Option<i32>,
    /// Ambient humidity from NO2, falling back to SO2, %.
    pub humidity: Option<i32>,
}

impl ReadingSnapshot {
    /// Whether the snapshot carries no data at all.
    pub fn is_empty(&self) -> bool {
        self.so2.is_none() && self.no2.is_none() && self.particulate.is_none()
    }
}

/// One gas channel's identity and health for metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMetadata {
    /// Whether the channel is currently Online.
    pub online: bool,
    /// Warm-up flag.
    pub ready: bool,
    /// Formatted continuous sensor uptime.
    pub active_time: ActiveTime,
    /// Persisted sensor serial number.
    pub serial: SettingString,
    /// Firmware version from the last handshake.
    pub firmware: SettingString,
    /// Last successful zeroing timestamp.
    pub last_zeroing: SettingString,
    /// Last failed zeroing timestamp.
    pub last_failed_zeroing: SettingString,
}

/// Device-level identity and platform health for metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMetadata {
    /// Running firmware version.
    pub firmware: &'static str,
    /// Formatted time since boot.
    pub active_time: ActiveTime,
    /// Radio signal strength, dBm.
    pub rssi: i32,
    /// Free heap, bytes.
    pub free_heap: u32,
    /// Total flash size, bytes.
    pub flash_size: u32,
    /// Flash used by the running application, bytes.
    pub app_size_used: u32,
    /// Flash reserved for application images, bytes.
    pub app_size_total: u32,
    /// Timestamp of the last successful firmware update.
    pub last_successful_ota: SettingString,
    /// Timestamp of the last failed firmware update.
    pub last_failed_ota: SettingString,
    /// Why the device last reset.
    pub reset_reason: SettingString,
    /// Current read cadence, seconds.
    pub read_interval_s: u64,
    /// Current publish cadence, seconds.
    pub publish_interval_s: i32,
}

/// Full device and per-channel status, emitted on the metadata cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSnapshot {
    /// Device-level block.
    pub device: DeviceMetadata,
    /// SO2 channel block.
    pub so2: ChannelMetadata,
    /// NO2 channel block.
    pub no2: ChannelMetadata,
    /// Whether the particulate channel is currently Online.
    pub particulate_online: bool,
}

/// Assemble a reading snapshot from the three channels.
pub fn reading_snapshot<P: SerialPort>(
    so2: &SensorChannel<P>,
    no2: &SensorChannel<P>,
    particulate: &SensorChannel<P>,
) -> ReadingSnapshot {
    let so2_reading = gas_reading(so2);
    let no2_reading = gas_reading(no2);

    let (temperature, humidity) = if no2.is_online() {
        ambient(no2)
    } else if so2.is_online() {
        ambient(so2)
    } else {
        (None, None)
    };

    let particulate_reading = particulate.is_online().then(|| {
        let pm = particulate
            .particulate()
            .map(|m| {
                (
                    rounded(&m.avg_pm1),
                    rounded(&m.avg_pm2_5),
                    rounded(&m.avg_pm10),
                )
            })
            .unwrap_or_default();
        PmReading {
            pm1: pm.0,
            pm2_5: pm.1,
            pm10: pm.2,
        }
    });

    ReadingSnapshot {
        so2: so2_reading,
        no2: no2_reading,
        particulate: particulate_reading,
        temperature,
        humidity,
    }
}

/// Assemble a metadata snapshot from channels, settings and platform
/// diagnostics.
#[allow(clippy::too_many_arguments)]
pub fn metadata_snapshot<P, S, D>(
    so2: &SensorChannel<P>,
    no2: &SensorChannel<P>,
    particulate: &SensorChannel<P>,
    store: &S,
    diagnostics: &D,
    uptime_ms: Timestamp,
    read_interval_s: u64,
    publish_interval_s: i32,
) -> MetadataSnapshot
where
    P: SerialPort,
    S: SettingsStore,
    D: DeviceDiagnostics,
{
    MetadataSnapshot {
        device: DeviceMetadata {
            firmware: crate::VERSION,
            active_time: format_active_time(uptime_ms),
            rssi: diagnostics.rssi(),
            free_heap: diagnostics.free_heap(),
            flash_size: diagnostics.flash_size(),
            app_size_used: diagnostics.app_size_used(),
            app_size_total: diagnostics.app_size_total(),
            last_successful_ota: store.get_str(keys::LAST_OTA_OK, NO_INFO),
            last_failed_ota: store.get_str(keys::LAST_OTA_FAILED, NO_INFO),
            reset_reason: setting(diagnostics.reset_reason()),
            read_interval_s,
            publish_interval_s,
        },
        so2: channel_metadata(so2),
        no2: channel_metadata(no2),
        particulate_online: particulate.is_online(),
    }
}

fn channel_metadata<P: SerialPort>(channel: &SensorChannel<P>) -> ChannelMetadata {
    ChannelMetadata {
        online: channel.is_online(),
        ready: channel.ready(),
        active_time: format_sensor_uptime(channel.uptime()),
        serial: setting(channel.serial_number()),
        firmware: setting(channel.firmware_version()),
        last_zeroing: setting(channel.last_zeroed()),
        last_failed_zeroing: setting(channel.last_failed_zero()),
    }
}

fn gas_reading<P: SerialPort>(channel: &SensorChannel<P>) -> Option<GasReading> {
    if !channel.is_online() {
        return None;
    }
    channel.gas().map(|m| GasReading {
        concentration: rounded(&m.avg_concentration),
        adc: m.adc,
        ready: channel.ready(),
    })
}

fn ambient<P: SerialPort>(channel: &SensorChannel<P>) -> (Option<i32>, Option<i32>) {
    match channel.gas() {
        Some(m) => (
            Some(rounded(&m.avg_temperature)),
            Some(rounded(&m.avg_humidity)),
        ),
        None => (None, None),
    }
}

fn rounded<const N: usize>(avg: &RollingAverage<N>) -> i32 {
    libm::roundf(avg.mean().unwrap_or(0.0)) as i32
}

/// Format a millisecond duration the way uptime is reported upstream.
pub fn format_active_time(uptime_ms: Timestamp) -> ActiveTime {
    let total_s = uptime_ms / 1_000;
    format_dhms(
        (total_s / 86_400) as i32,
        ((total_s / 3_600) % 24) as i32,
        ((total_s / 60) % 60) as i32,
        (total_s % 60) as i32,
    )
}

fn format_sensor_uptime(uptime: SensorUptime) -> ActiveTime {
    format_dhms(uptime.days, uptime.hours, uptime.minutes, uptime.seconds)
}

fn format_dhms(days: i32, hours: i32, minutes: i32, seconds: i32) -> ActiveTime {
    use core::fmt::Write;

    let mut out = ActiveTime::new();
    let _ = write!(out, "{days}d {hours}h {minutes}m {seconds}s");
    out
}

fn setting(value: &str) -> SettingString {
    let mut out = SettingString::new();
    let take = value.len().min(out.capacity());
    let _ = out.push_str(&value[..take]);
    out
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::channel::Health;
    use crate::events::{ChannelKind, EventQueue};
    use crate::storage::{keys, MemoryStore, SettingsStore};
    use crate::time::SharedClock;
    use crate::transport::ScriptedPort;

    fn online_gas(kind: ChannelKind, ppb: i32) -> (SensorChannel<ScriptedPort>, SharedClock) {
        let clock = SharedClock::new();
        let mut channel = SensorChannel::new(kind, ScriptedPort::new(clock.clone()));
        let mut store = MemoryStore::new();
        let serial_key = match kind {
            ChannelKind::So2 => keys::SO2_SERIAL,
            _ => keys::NO2_SERIAL,
        };
        store.put_str(serial_key, "212602030952");
        channel.restore(&store);
        let mut events = EventQueue::new();
        channel.port_mut().enqueue_reply(b"1.4.8-b\r");
        assert!(channel.initialize(&clock, &mut store, &mut events));
        let line = format!("212602030952, {ppb}, 27, 46, 512, 25, 44, 0, 4, 20, 7\n");
        channel.port_mut().enqueue_reply(line.as_bytes());
        assert!(channel.read(&clock, &mut store, &mut events));
        assert_eq!(channel.health(), Health::Online);
        (channel, clock)
    }

    fn offline_gas(kind: ChannelKind) -> SensorChannel<ScriptedPort> {
        let clock = SharedClock::new();
        let mut channel = SensorChannel::new(kind, ScriptedPort::new(clock.clone()));
        let mut store = MemoryStore::new();
        let mut events = EventQueue::new();
        channel.port_mut().enqueue_silence();
        assert!(!channel.initialize(&clock, &mut store, &mut events));
        channel
    }

    fn offline_pm() -> SensorChannel<ScriptedPort> {
        let clock = SharedClock::new();
        let mut channel =
            SensorChannel::new(ChannelKind::Particulate, ScriptedPort::new(clock.clone()));
        let mut store = MemoryStore::new();
        let mut events = EventQueue::new();
        assert!(!channel.initialize(&clock, &mut store, &mut events));
        channel
    }

    #[test]
    fn offline_channels_are_omitted_from_readings() {
        let (so2, _clock) = online_gas(ChannelKind::So2, 100);
        let no2 = offline_gas(ChannelKind::No2);
        let pm = offline_pm();

        let snapshot = reading_snapshot(&so2, &no2, &pm);
        assert!(snapshot.so2.is_some());
        assert!(snapshot.no2.is_none());
        assert!(snapshot.particulate.is_none());
    }

    #[test]
    fn ambient_falls_back_to_so2_when_no2_is_offline() {
        let (so2, _clock) = online_gas(ChannelKind::So2, 100);
        let no2 = offline_gas(ChannelKind::No2);
        let pm = offline_pm();

        let snapshot = reading_snapshot(&so2, &no2, &pm);
        // 27-2 and 46-1 after offsets
        assert_eq!(snapshot.temperature, Some(25));
        assert_eq!(snapshot.humidity, Some(45));
    }

    #[test]
    fn all_offline_omits_ambient_entirely() {
        let so2 = offline_gas(ChannelKind::So2);
        let no2 = offline_gas(ChannelKind::No2);
        let pm = offline_pm();

        let snapshot = reading_snapshot(&so2, &no2, &pm);
        assert!(snapshot.is_empty());
        assert_eq!(snapshot.temperature, None);
        assert_eq!(snapshot.humidity, None);
    }

    #[test]
    fn metadata_includes_offline_channels() {
        let (so2, _clock) = online_gas(ChannelKind::So2, 100);
        let no2 = offline_gas(ChannelKind::No2);
        let pm = offline_pm();
        let store = MemoryStore::new();

        let snapshot = metadata_snapshot(
            &so2,
            &no2,
            &pm,
            &store,
            &StaticDiagnostics,
            5_000,
            6,
            60,
        );
        assert!(snapshot.so2.online);
        assert!(!snapshot.no2.online);
        assert!(!snapshot.particulate_online);
        assert_eq!(snapshot.no2.serial.as_str(), NO_INFO);
        assert_eq!(snapshot.device.publish_interval_s, 60);
        assert_eq!(snapshot.device.firmware, crate::VERSION);
    }

    #[test]
    fn active_time_formats_as_dhms() {
        let one_day = 86_400_000u64;
        assert_eq!(format_active_time(0).as_str(), "0d 0h 0m 0s");
        assert_eq!(
            format_active_time(one_day + 3_600_000 * 7 + 60_000 * 12 + 9_000).as_str(),
            "1d 7h 12m 9s"
        );
    }
}
