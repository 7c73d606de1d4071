//! Gas sensor zeroing
//!
//! Zeroing recalibrates a gas sensor's baseline in clean air. The wire
//! sequence is: drain anything the sensor is still sending, issue `Z`,
//! then expect two line-delimited replies where the second must be the
//! exact confirmation string. Anything else is a failure.
//!
//! Every attempt is recorded: a success stores a formatted timestamp
//! under the channel's last-zeroing key and resets the rolling averages
//! (pre-zeroing samples no longer share a baseline with what follows);
//! a failure stores the timestamp under the failed-zeroing key and
//! leaves measurements alone. Both outcomes queue an event so metadata
//! goes out immediately.

use crate::{
    channel::SensorChannel,
    constants::sensors::ZERO_CONFIRMATION,
    constants::time::SERIAL_TIMEOUT_MS,
    errors::ZeroError,
    events::{ChannelEvent, EventQueue},
    time::{elapsed, Clock, WallClock},
    storage::SettingsStore,
    transport::{read_line_with_timeout, SerialPort},
};

/// Which gas channels one zeroing request covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZeroTarget {
    /// SO2 only.
    So2,
    /// NO2 only.
    No2,
    /// Both gas channels, SO2 first; outcomes are independent.
    All,
}

/// Per-channel outcomes of one zeroing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ZeroReport {
    /// SO2 outcome, if the target covered SO2.
    pub so2: Option<Result<(), ZeroError>>,
    /// NO2 outcome, if the target covered NO2.
    pub no2: Option<Result<(), ZeroError>>,
}

impl ZeroReport {
    /// Whether every attempted channel zeroed successfully.
    pub fn succeeded(&self) -> bool {
        self.so2.map_or(true, |outcome| outcome.is_ok())
            && self.no2.map_or(true, |outcome| outcome.is_ok())
    }
}

/// Zero the targeted gas channels and record every outcome.
///
/// A failure on SO2 does not stop the NO2 attempt when the target is
/// [`ZeroTarget::All`].
pub fn zero<P, C, W, S>(
    target: ZeroTarget,
    so2: &mut SensorChannel<P>,
    no2: &mut SensorChannel<P>,
    clock: &C,
    wall: &W,
    store: &mut S,
    events: &mut EventQueue,
) -> ZeroReport
where
    P: SerialPort,
    C: Clock,
    W: WallClock,
    S: SettingsStore,
{
    let mut report = ZeroReport::default();
    if matches!(target, ZeroTarget::So2 | ZeroTarget::All) {
        report.so2 = Some(zero_channel(so2, clock, wall, store, events));
    }
    if matches!(target, ZeroTarget::No2 | ZeroTarget::All) {
        report.no2 = Some(zero_channel(no2, clock, wall, store, events));
    }
    report
}

/// Zero one gas channel and persist the outcome timestamp.
pub fn zero_channel<P, C, W, S>(
    channel: &mut SensorChannel<P>,
    clock: &C,
    wall: &W,
    store: &mut S,
    events: &mut EventQueue,
) -> Result<(), ZeroError>
where
    P: SerialPort,
    C: Clock,
    W: WallClock,
    S: SettingsStore,
{
    log::info!("[{}] zeroing sensor", channel.kind().name());
    let outcome = run_zero_sequence(channel.port_mut(), clock);
    let stamp = wall.formatted_now();

    match outcome {
        Ok(()) => {
            // Samples taken against the old baseline are no longer comparable
            channel.reset_averages();
            channel.record_zero_success(stamp.as_str(), store);
            log::info!("[{}] sensor zeroed, averages reset", channel.kind().name());
            events.push(ChannelEvent::ZeroSucceeded {
                kind: channel.kind(),
                timestamp: clock.now(),
            });
            Ok(())
        }
        Err(err) => {
            channel.record_zero_failure(stamp.as_str(), store);
            log::warn!("[{}] zeroing failed: {}", channel.kind().name(), err);
            events.push(ChannelEvent::ZeroFailed {
                kind: channel.kind(),
                timestamp: clock.now(),
            });
            Err(err)
        }
    }
}

fn run_zero_sequence<P, C>(port: &mut P, clock: &C) -> Result<(), ZeroError>
where
    P: SerialPort,
    C: Clock,
{
    // Drain stale output first so the confirmation lines are the next
    // thing read. A sensor that never stops streaming is a timeout.
    let drain_start = clock.now();
    while port.available() {
        let _ = port.read_byte();
        if elapsed(drain_start, clock.now()) >= SERIAL_TIMEOUT_MS {
            return Err(ZeroError::Timeout);
        }
    }
    port.flush();
    port.write(b"Z");

    // Expected reply: "\r\nSetting zero...done\r\n" as two lines
    let _preamble = read_line_with_timeout(port, clock, b'\n', SERIAL_TIMEOUT_MS)
        .map_err(|_| ZeroError::Timeout)?;
    let confirmation = read_line_with_timeout(port, clock, b'\n', SERIAL_TIMEOUT_MS)
        .map_err(|_| ZeroError::Timeout)?;

    if confirmation.as_str() == ZERO_CONFIRMATION {
        Ok(())
    } else {
        Err(ZeroError::ConfirmationMismatch)
    }
}
