//! Sensor channel state machine
//!
//! One [`SensorChannel`] owns one physical sensor: its serial transport,
//! its rolling averages and its health state. The three deployed
//! channels (SO2, NO2, particulate) share this single implementation;
//! what differs per [`ChannelKind`] is the wire format and the
//! conversion constants, not the lifecycle.
//!
//! ## Health states
//!
//! ```text
//! Uninitialized → Initializing → Online ⇄ Offline
//! ```
//!
//! - `Initializing` issues the handshake (gas: firmware-version query;
//!   particulate: one frame read) and resolves to Online or Offline
//!   within one bounded call.
//! - Online → Offline after [`RETRIES_BEFORE_OFFLINE`] consecutive
//!   failed reads: the transport is torn down, all averages are reset
//!   (data before an offline period is not comparable to data after)
//!   and a [`ChannelEvent::WentOffline`] is queued.
//! - Offline → Online goes back through `Initializing` when a degraded
//!   probe succeeds; the channel then reads once immediately and queues
//!   [`ChannelEvent::Recovered`] so the recovery metadata is not empty.
//!
//! Orthogonal to health: a successful read reporting a different serial
//! number is a sensor swap. Averages reset, calibration history is
//! cleared and [`ChannelEvent::SensorSwapped`] is queued.
//!
//! Channels never consult the clock for interval bookkeeping; that
//! lives in the scheduler. The clock reference passed into each
//! operation is only used for bounded serial waits and event stamps.

use crate::{
    buffer::RollingAverage,
    constants::sensors::{
        FIRMWARE_REPLY_LEN, HUMIDITY_OFFSET_PCT, NO2_MOLAR_MASS, PM_FRAME_LEN,
        READY_UPTIME_HOURS, SERIAL_NUMBER_LEN, SO2_MOLAR_MASS, TEMPERATURE_OFFSET_C,
    },
    constants::time::{AVERAGING_SAMPLES, RETRIES_BEFORE_OFFLINE, SERIAL_TIMEOUT_MS},
    convert,
    errors::{ReadError, ReadResult},
    events::{ChannelEvent, ChannelKind, EventQueue},
    storage::{keys, SettingString, SettingsStore, NO_INFO},
    time::{Clock, Timestamp},
    transport::{read_exact_with_timeout, read_line_with_timeout, SerialPort},
    wire::{self, FirmwareVersion, SensorUptime},
};

/// Health classification driving retry and reporting behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Health {
    /// Never initialized since boot.
    Uninitialized,
    /// Handshake in progress.
    Initializing,
    /// Sensor answering normally; read on the normal cadence.
    Online,
    /// Retry threshold exceeded; probed on the degraded cadence only.
    Offline,
}

/// Current and averaged quantities for a gas channel.
#[derive(Debug, Clone, Default)]
pub struct GasMeasurements {
    /// Last concentration straight from the sensor, ppb.
    pub ppb: i32,
    /// Last converted concentration, µg/m³.
    pub concentration: i32,
    /// Last raw ADC word.
    pub adc: i32,
    /// Last analog temperature with offset applied, °C.
    pub temperature_c: i32,
    /// Last analog humidity with offset applied, %.
    pub humidity_pct: i32,
    /// Last digital temperature, °C.
    pub temperature_digital: i32,
    /// Last digital humidity, %.
    pub humidity_digital: i32,
    /// Rolling mean of converted concentration.
    pub avg_concentration: RollingAverage<AVERAGING_SAMPLES>,
    /// Rolling mean of corrected temperature.
    pub avg_temperature: RollingAverage<AVERAGING_SAMPLES>,
    /// Rolling mean of corrected humidity.
    pub avg_humidity: RollingAverage<AVERAGING_SAMPLES>,
}

/// Current and averaged particle buckets for the particulate channel.
#[derive(Debug, Clone, Default)]
pub struct PmMeasurements {
    /// Last PM1.0 reading, µg/m³.
    pub pm1: u16,
    /// Last PM2.5 reading, µg/m³.
    pub pm2_5: u16,
    /// Last PM10 reading, µg/m³.
    pub pm10: u16,
    /// Rolling mean of PM1.0.
    pub avg_pm1: RollingAverage<AVERAGING_SAMPLES>,
    /// Rolling mean of PM2.5.
    pub avg_pm2_5: RollingAverage<AVERAGING_SAMPLES>,
    /// Rolling mean of PM10.
    pub avg_pm10: RollingAverage<AVERAGING_SAMPLES>,
}

/// Kind-specific measurement state.
#[derive(Debug, Clone)]
pub enum Measurements {
    /// Electrochemical gas sensor quantities.
    Gas(GasMeasurements),
    /// Optical particle counter buckets.
    Particulate(PmMeasurements),
}

/// One physical sensor: transport, health, identity and averages.
pub struct SensorChannel<P: SerialPort> {
    kind: ChannelKind,
    port: P,
    molar_mass: f32,
    health: Health,
    retry_count: u8,
    ready: bool,
    last_read_at: Timestamp,
    serial_number: SettingString,
    firmware_version: FirmwareVersion,
    uptime: SensorUptime,
    last_zeroed: SettingString,
    last_failed_zero: SettingString,
    measurements: Measurements,
}

impl<P: SerialPort> SensorChannel<P> {
    /// Create a channel owning the given transport, not yet initialized.
    pub fn new(kind: ChannelKind, port: P) -> Self {
        let (molar_mass, measurements) = match kind {
            ChannelKind::So2 => (SO2_MOLAR_MASS, Measurements::Gas(GasMeasurements::default())),
            ChannelKind::No2 => (NO2_MOLAR_MASS, Measurements::Gas(GasMeasurements::default())),
            ChannelKind::Particulate => {
                (0.0, Measurements::Particulate(PmMeasurements::default()))
            }
        };
        Self {
            kind,
            port,
            molar_mass,
            health: Health::Uninitialized,
            retry_count: 0,
            ready: false,
            last_read_at: 0,
            serial_number: setting(NO_INFO),
            firmware_version: FirmwareVersion::new(),
            uptime: SensorUptime::default(),
            last_zeroed: setting(NO_INFO),
            last_failed_zero: setting(NO_INFO),
            measurements,
        }
    }

    /// Load persisted identity and calibration history.
    ///
    /// Stored externally so serial numbers and zeroing records survive
    /// reboots. The particulate channel persists nothing.
    pub fn restore<S: SettingsStore>(&mut self, store: &S) {
        let Some(channel_keys) = persisted_keys(self.kind) else {
            return;
        };
        self.serial_number = store.get_str(channel_keys.serial, NO_INFO);
        self.last_zeroed = store.get_str(channel_keys.last_zero, NO_INFO);
        self.last_failed_zero = store.get_str(channel_keys.last_failed_zero, NO_INFO);
        log::info!(
            "[{}] restored serial {}, last zeroed {}, last failed zeroing {}",
            self.kind.name(),
            self.serial_number,
            self.last_zeroed,
            self.last_failed_zero,
        );
    }

    /// Run the initialization handshake.
    ///
    /// Opens the transport, performs the kind-specific handshake and
    /// resolves to Online or Offline. When the channel was previously
    /// Offline and the handshake succeeds, one read is performed
    /// immediately and a recovery event is queued.
    pub fn initialize<C, S>(&mut self, clock: &C, store: &mut S, events: &mut EventQueue) -> bool
    where
        C: Clock,
        S: SettingsStore,
    {
        let was_offline = self.health == Health::Offline;
        self.health = Health::Initializing;
        log::info!("[{}] initializing", self.kind.name());

        if !self.port.open() {
            log::warn!("[{}] transport refused to open", self.kind.name());
            self.health = Health::Offline;
            return false;
        }

        let outcome = if self.kind.is_gas() {
            self.gas_handshake(clock)
        } else {
            self.pm_sample(clock)
        };

        match outcome {
            Ok(()) => {
                self.health = Health::Online;
                self.retry_count = 0;
                log::info!("[{}] initialized", self.kind.name());
                if was_offline {
                    if self.kind.is_gas() {
                        // Refresh data so the recovery metadata isn't empty
                        self.read(clock, store, events);
                    }
                    events.push(ChannelEvent::Recovered {
                        kind: self.kind,
                        timestamp: clock.now(),
                    });
                }
                true
            }
            Err(err) => {
                log::warn!("[{}] initialization failed: {}", self.kind.name(), err);
                self.health = Health::Offline;
                false
            }
        }
    }

    /// Poll the sensor once on the normal cadence.
    ///
    /// A success resets the retry counter; a failure counts toward the
    /// offline threshold and may trigger the Offline transition.
    pub fn read<C, S>(&mut self, clock: &C, store: &mut S, events: &mut EventQueue) -> bool
    where
        C: Clock,
        S: SettingsStore,
    {
        let outcome = if self.kind.is_gas() {
            self.gas_sample(clock, store, events)
        } else {
            self.pm_sample(clock)
        };

        match outcome {
            Ok(()) => {
                self.retry_count = 0;
                self.health = Health::Online;
                true
            }
            Err(err) => {
                self.mark_failure(err, clock, events);
                false
            }
        }
    }

    /// Degraded-cadence availability check while Offline.
    ///
    /// Goes through the full initialization path so a recovered sensor
    /// is re-identified before data flows again.
    pub fn probe<C, S>(&mut self, clock: &C, store: &mut S, events: &mut EventQueue) -> bool
    where
        C: Clock,
        S: SettingsStore,
    {
        self.initialize(clock, store, events)
    }

    /// Empty every rolling average on this channel.
    ///
    /// Called on the Offline transition, on sensor swap and after a
    /// successful zeroing, because those boundaries invalidate the
    /// previous samples.
    pub fn reset_averages(&mut self) {
        match &mut self.measurements {
            Measurements::Gas(m) => {
                m.avg_concentration.reset();
                m.avg_temperature.reset();
                m.avg_humidity.reset();
            }
            Measurements::Particulate(m) => {
                m.avg_pm1.reset();
                m.avg_pm2_5.reset();
                m.avg_pm10.reset();
            }
        }
    }

    fn gas_handshake<C: Clock>(&mut self, clock: &C) -> ReadResult<()> {
        self.port.flush();
        self.port.write(b"fw");
        let line = read_line_with_timeout(&mut self.port, clock, b'\r', SERIAL_TIMEOUT_MS)?;
        if line.len() != FIRMWARE_REPLY_LEN {
            return Err(ReadError::Malformed {
                reason: "unexpected firmware reply length",
            });
        }
        self.firmware_version = FirmwareVersion::new();
        let _ = self.firmware_version.push_str(line.as_str());
        Ok(())
    }

    fn gas_sample<C, S>(&mut self, clock: &C, store: &mut S, events: &mut EventQueue) -> ReadResult<()>
    where
        C: Clock,
        S: SettingsStore,
    {
        // A bare carriage return polls one line; the "c" command would
        // switch the sensor into continuous output.
        self.port.write(b"\r");
        let line = read_line_with_timeout(&mut self.port, clock, b'\n', SERIAL_TIMEOUT_MS)?;
        let frame = wire::parse_gas_line(line.as_str())?;

        let temperature = frame.temperature_c + TEMPERATURE_OFFSET_C;
        let humidity = frame.humidity_pct + HUMIDITY_OFFSET_PCT;
        if !convert::temperature_plausible(temperature as f32) {
            // Converting would divide by a vanishing denominator
            return Err(ReadError::Malformed {
                reason: "implausible temperature",
            });
        }

        let concentration = libm::roundf(convert::mass_concentration(
            frame.ppb as f32,
            temperature as f32,
            self.molar_mass,
        )) as i32;

        if let Measurements::Gas(m) = &mut self.measurements {
            m.ppb = frame.ppb;
            m.concentration = concentration;
            m.adc = frame.adc;
            m.temperature_c = temperature;
            m.humidity_pct = humidity;
            m.temperature_digital = frame.temperature_digital;
            m.humidity_digital = frame.humidity_digital;
            m.avg_concentration.reading(concentration as f32);
            m.avg_temperature.reading(temperature as f32);
            m.avg_humidity.reading(humidity as f32);
        }

        self.uptime = frame.uptime;
        self.ready = frame.uptime.hours >= READY_UPTIME_HOURS || frame.uptime.days > 0;
        self.last_read_at = clock.now();

        log::debug!(
            "[{}] s/n {} conc {}µg/m³ ({}ppb) temp {}°C hum {}%",
            self.kind.name(),
            frame.serial,
            concentration,
            frame.ppb,
            temperature,
            humidity,
        );

        if frame.serial.len() == SERIAL_NUMBER_LEN
            && frame.serial.as_str() != self.serial_number.as_str()
        {
            self.handle_swap(frame.serial.as_str(), clock, store, events);
        }

        Ok(())
    }

    fn pm_sample<C: Clock>(&mut self, clock: &C) -> ReadResult<()> {
        let mut raw = [0u8; PM_FRAME_LEN];
        read_exact_with_timeout(&mut self.port, clock, &mut raw, SERIAL_TIMEOUT_MS)?;
        let frame = wire::parse_pm_frame(&raw)?;

        if let Measurements::Particulate(m) = &mut self.measurements {
            m.pm1 = frame.pm1;
            m.pm2_5 = frame.pm2_5;
            m.pm10 = frame.pm10;
            m.avg_pm1.reading(frame.pm1 as f32);
            m.avg_pm2_5.reading(frame.pm2_5 as f32);
            m.avg_pm10.reading(frame.pm10 as f32);
        }
        self.last_read_at = clock.now();

        log::debug!(
            "[{}] pm1 {} pm2.5 {} pm10 {}",
            self.kind.name(),
            frame.pm1,
            frame.pm2_5,
            frame.pm10,
        );
        Ok(())
    }

    /// Sensor swap: new identity, old calibration history is meaningless.
    fn handle_swap<C, S>(&mut self, new_serial: &str, clock: &C, store: &mut S, events: &mut EventQueue)
    where
        C: Clock,
        S: SettingsStore,
    {
        log::warn!(
            "[{}] sensor changed: stored serial '{}', reported '{}'; clearing zeroing history",
            self.kind.name(),
            self.serial_number,
            new_serial,
        );
        self.serial_number = setting(new_serial);
        self.last_zeroed = setting(NO_INFO);
        self.last_failed_zero = setting(NO_INFO);
        if let Some(channel_keys) = persisted_keys(self.kind) {
            store.put_str(channel_keys.serial, new_serial);
            store.put_str(channel_keys.last_zero, NO_INFO);
            store.put_str(channel_keys.last_failed_zero, NO_INFO);
        }
        self.reset_averages();
        events.push(ChannelEvent::SensorSwapped {
            kind: self.kind,
            timestamp: clock.now(),
        });
    }

    fn mark_failure<C: Clock>(&mut self, err: ReadError, clock: &C, events: &mut EventQueue) {
        self.retry_count = self.retry_count.saturating_add(1);
        log::warn!(
            "[{}] read failed ({}/{}): {}",
            self.kind.name(),
            self.retry_count,
            RETRIES_BEFORE_OFFLINE,
            err,
        );
        if self.retry_count >= RETRIES_BEFORE_OFFLINE && self.health == Health::Online {
            self.go_offline(clock, events);
        }
    }

    fn go_offline<C: Clock>(&mut self, clock: &C, events: &mut EventQueue) {
        log::warn!(
            "[{}] considered offline; averages reset, falling back to probe cadence",
            self.kind.name(),
        );
        self.port.close();
        self.health = Health::Offline;
        self.ready = false;
        self.reset_averages();
        events.push(ChannelEvent::WentOffline {
            kind: self.kind,
            timestamp: clock.now(),
        });
    }

    // ---- accessors -------------------------------------------------

    /// Which sensor this channel drives.
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Current health classification.
    pub fn health(&self) -> Health {
        self.health
    }

    /// Whether the channel is currently Online.
    pub fn is_online(&self) -> bool {
        self.health == Health::Online
    }

    /// Whether the sensor has warmed up enough for valid concentrations.
    pub fn ready(&self) -> bool {
        self.ready
    }

    /// Failed reads since the last success or recovery.
    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    /// Stored sensor serial number (or the "NO INFO" sentinel).
    pub fn serial_number(&self) -> &str {
        self.serial_number.as_str()
    }

    /// Firmware version reported by the last handshake.
    pub fn firmware_version(&self) -> &str {
        self.firmware_version.as_str()
    }

    /// Continuous uptime reported by the sensor.
    pub fn uptime(&self) -> SensorUptime {
        self.uptime
    }

    /// When the last successful read completed (monotonic ms).
    pub fn last_read_at(&self) -> Timestamp {
        self.last_read_at
    }

    /// Last successful zeroing timestamp (or "NO INFO").
    pub fn last_zeroed(&self) -> &str {
        self.last_zeroed.as_str()
    }

    /// Last failed zeroing timestamp (or "NO INFO").
    pub fn last_failed_zero(&self) -> &str {
        self.last_failed_zero.as_str()
    }

    /// Gas measurement state, if this is a gas channel.
    pub fn gas(&self) -> Option<&GasMeasurements> {
        match &self.measurements {
            Measurements::Gas(m) => Some(m),
            Measurements::Particulate(_) => None,
        }
    }

    /// Particulate measurement state, if this is the particulate channel.
    pub fn particulate(&self) -> Option<&PmMeasurements> {
        match &self.measurements {
            Measurements::Particulate(m) => Some(m),
            Measurements::Gas(_) => None,
        }
    }

    /// Direct access to the owned transport, for setup and tests.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub(crate) fn record_zero_success<S: SettingsStore>(&mut self, stamp: &str, store: &mut S) {
        self.last_zeroed = setting(stamp);
        if let Some(channel_keys) = persisted_keys(self.kind) {
            store.put_str(channel_keys.last_zero, stamp);
        }
    }

    pub(crate) fn record_zero_failure<S: SettingsStore>(&mut self, stamp: &str, store: &mut S) {
        self.last_failed_zero = setting(stamp);
        if let Some(channel_keys) = persisted_keys(self.kind) {
            store.put_str(channel_keys.last_failed_zero, stamp);
        }
    }

    pub(crate) fn clear_zero_history<S: SettingsStore>(&mut self, store: &mut S) {
        self.last_zeroed = setting(NO_INFO);
        self.last_failed_zero = setting(NO_INFO);
        if let Some(channel_keys) = persisted_keys(self.kind) {
            store.put_str(channel_keys.last_zero, NO_INFO);
            store.put_str(channel_keys.last_failed_zero, NO_INFO);
        }
    }
}

/// Persisted-store keys for one gas channel.
struct ChannelKeys {
    serial: &'static str,
    last_zero: &'static str,
    last_failed_zero: &'static str,
}

fn persisted_keys(kind: ChannelKind) -> Option<ChannelKeys> {
    match kind {
        ChannelKind::So2 => Some(ChannelKeys {
            serial: keys::SO2_SERIAL,
            last_zero: keys::SO2_LAST_ZERO,
            last_failed_zero: keys::SO2_LAST_FAILED_ZERO,
        }),
        ChannelKind::No2 => Some(ChannelKeys {
            serial: keys::NO2_SERIAL,
            last_zero: keys::NO2_LAST_ZERO,
            last_failed_zero: keys::NO2_LAST_FAILED_ZERO,
        }),
        ChannelKind::Particulate => None,
    }
}

fn setting(value: &str) -> SettingString {
    let mut out = SettingString::new();
    let take = value.len().min(out.capacity());
    let _ = out.push_str(&value[..take]);
    out
}
