//! Top-level station composite
//!
//! Wires the three channels, the scheduler, the publish timers and the
//! event queue behind one tick-driven interface. All control flow is
//! single-threaded: the owner calls [`Station::on_tick`] from its main
//! loop and everything else happens inside that call.
//!
//! Per tick, in order: one acquisition round (the round-start timestamp
//! drives every cadence decision), event drain (any drained event
//! forces a metadata publish), reading publish if due, metadata publish
//! if due.

use crate::{
    aggregator::{TelemetryAggregator, TelemetrySink},
    calibration::{self, ZeroReport, ZeroTarget},
    channel::SensorChannel,
    constants::time::{
        DEFAULT_PUBLISH_INTERVAL_S, PUBLISH_INTERVAL_MAX_S, PUBLISH_INTERVAL_MIN_S,
    },
    errors::ConfigError,
    events::{ChannelEvent, ChannelKind, EventQueue},
    payload,
    scheduler::{AcquisitionScheduler, PollAction},
    snapshot::{self, DeviceDiagnostics, MetadataSnapshot, ReadingSnapshot},
    storage::{keys, SettingsStore},
    time::{Clock, Timestamp, WallClock},
    transport::SerialPort,
};

/// Device identifier used in topics and payloads.
pub type ClientId = heapless::String<32>;

/// The three serial transports, one per channel.
pub struct ChannelPorts<P> {
    /// SO2 sensor link.
    pub so2: P,
    /// NO2 sensor link.
    pub no2: P,
    /// Particulate sensor link.
    pub particulate: P,
}

/// Tick-driven acquisition and telemetry core for one device.
pub struct Station<P, S, K, C, W, D>
where
    P: SerialPort,
    S: SettingsStore,
    K: TelemetrySink,
    C: Clock,
    W: WallClock,
    D: DeviceDiagnostics,
{
    so2: SensorChannel<P>,
    no2: SensorChannel<P>,
    particulate: SensorChannel<P>,
    store: S,
    sink: K,
    clock: C,
    wall: W,
    diagnostics: D,
    scheduler: AcquisitionScheduler,
    aggregator: TelemetryAggregator,
    events: EventQueue,
    client_id: ClientId,
    publish_interval_s: i32,
}

impl<P, S, K, C, W, D> Station<P, S, K, C, W, D>
where
    P: SerialPort,
    S: SettingsStore,
    K: TelemetrySink,
    C: Clock,
    W: WallClock,
    D: DeviceDiagnostics,
{
    /// Assemble a station, restoring persisted settings.
    ///
    /// A persisted publish interval outside the accepted range falls
    /// back to the default rather than failing construction.
    pub fn new(
        ports: ChannelPorts<P>,
        store: S,
        sink: K,
        clock: C,
        wall: W,
        diagnostics: D,
        client_id: &str,
    ) -> Self {
        let stored = store.get_i32(keys::PUBLISH_INTERVAL, DEFAULT_PUBLISH_INTERVAL_S);
        let publish_interval_s =
            if (PUBLISH_INTERVAL_MIN_S..=PUBLISH_INTERVAL_MAX_S).contains(&stored) {
                stored
            } else {
                log::warn!(
                    "persisted publish interval {}s out of range, using default {}s",
                    stored,
                    DEFAULT_PUBLISH_INTERVAL_S,
                );
                DEFAULT_PUBLISH_INTERVAL_S
            };
        log::info!("publish interval: {}s", publish_interval_s);

        let mut so2 = SensorChannel::new(ChannelKind::So2, ports.so2);
        let mut no2 = SensorChannel::new(ChannelKind::No2, ports.no2);
        so2.restore(&store);
        no2.restore(&store);

        let mut id = ClientId::new();
        let take = client_id.len().min(id.capacity());
        let _ = id.push_str(&client_id[..take]);

        Self {
            so2,
            no2,
            particulate: SensorChannel::new(ChannelKind::Particulate, ports.particulate),
            store,
            sink,
            clock,
            wall,
            diagnostics,
            scheduler: AcquisitionScheduler::new(publish_interval_s),
            aggregator: TelemetryAggregator::new(publish_interval_s),
            events: EventQueue::new(),
            client_id: id,
            publish_interval_s,
        }
    }

    /// Initialize all three channels.
    ///
    /// Returns how many came up Online. Channels that fail stay
    /// Offline and are probed on the degraded cadence.
    pub fn init_sensors(&mut self) -> usize {
        let mut online = 0;
        if self.so2.initialize(&self.clock, &mut self.store, &mut self.events) {
            online += 1;
        }
        if self.no2.initialize(&self.clock, &mut self.store, &mut self.events) {
            online += 1;
        }
        if self
            .particulate
            .initialize(&self.clock, &mut self.store, &mut self.events)
        {
            online += 1;
        }
        online
    }

    /// Run one control-loop tick.
    pub fn on_tick(&mut self) {
        let now = self.clock.now();

        let action = self.scheduler.decide(ChannelKind::So2, self.so2.health(), now);
        drive(&mut self.so2, action, &self.clock, &mut self.store, &mut self.events);
        let action = self.scheduler.decide(ChannelKind::No2, self.no2.health(), now);
        drive(&mut self.no2, action, &self.clock, &mut self.store, &mut self.events);
        let action = self
            .scheduler
            .decide(ChannelKind::Particulate, self.particulate.health(), now);
        drive(
            &mut self.particulate,
            action,
            &self.clock,
            &mut self.store,
            &mut self.events,
        );

        let event_metadata = self.drain_events();
        if self.aggregator.reading_due(now) {
            self.publish_reading();
        }
        let periodic_metadata = self.aggregator.metadata_due(now);
        if event_metadata || periodic_metadata {
            self.publish_metadata(now);
        }
    }

    /// Change the publish interval, persist it and re-derive cadences.
    pub fn set_publish_interval(&mut self, seconds: i32) -> Result<(), ConfigError> {
        if !(PUBLISH_INTERVAL_MIN_S..=PUBLISH_INTERVAL_MAX_S).contains(&seconds) {
            return Err(ConfigError::IntervalOutOfRange {
                seconds,
                min: PUBLISH_INTERVAL_MIN_S,
                max: PUBLISH_INTERVAL_MAX_S,
            });
        }
        self.publish_interval_s = seconds;
        self.store.put_i32(keys::PUBLISH_INTERVAL, seconds);
        self.scheduler.apply_publish_interval(seconds);
        self.aggregator.apply_publish_interval(seconds);
        log::info!("publish interval changed to {}s", seconds);
        self.events.push(ChannelEvent::IntervalChanged {
            seconds,
            timestamp: self.clock.now(),
        });
        Ok(())
    }

    /// Zero the targeted gas channels; metadata goes out immediately.
    pub fn zero(&mut self, target: ZeroTarget) -> ZeroReport {
        let report = calibration::zero(
            target,
            &mut self.so2,
            &mut self.no2,
            &self.clock,
            &self.wall,
            &mut self.store,
            &mut self.events,
        );
        let now = self.clock.now();
        self.drain_events();
        self.publish_metadata(now);
        report
    }

    /// Reset all persisted zeroing records to the sentinel value.
    pub fn erase_zeroing_data(&mut self) {
        log::info!("erasing zeroing history for both gas channels");
        self.so2.clear_zero_history(&mut self.store);
        self.no2.clear_zero_history(&mut self.store);
        let now = self.clock.now();
        self.publish_metadata(now);
    }

    /// Current reading view over the three channels.
    pub fn reading_snapshot(&self) -> ReadingSnapshot {
        snapshot::reading_snapshot(&self.so2, &self.no2, &self.particulate)
    }

    /// Current metadata view over the device and the three channels.
    pub fn metadata_snapshot(&self) -> MetadataSnapshot {
        snapshot::metadata_snapshot(
            &self.so2,
            &self.no2,
            &self.particulate,
            &self.store,
            &self.diagnostics,
            self.clock.now(),
            self.scheduler.read_interval_s(),
            self.publish_interval_s,
        )
    }

    /// Current publish interval in seconds.
    pub fn publish_interval_s(&self) -> i32 {
        self.publish_interval_s
    }

    /// SO2 channel state.
    pub fn so2(&self) -> &SensorChannel<P> {
        &self.so2
    }

    /// NO2 channel state.
    pub fn no2(&self) -> &SensorChannel<P> {
        &self.no2
    }

    /// Particulate channel state.
    pub fn particulate(&self) -> &SensorChannel<P> {
        &self.particulate
    }

    /// Mutable SO2 channel access, for transport setup.
    pub fn so2_mut(&mut self) -> &mut SensorChannel<P> {
        &mut self.so2
    }

    /// Mutable NO2 channel access, for transport setup.
    pub fn no2_mut(&mut self) -> &mut SensorChannel<P> {
        &mut self.no2
    }

    /// Mutable particulate channel access, for transport setup.
    pub fn particulate_mut(&mut self) -> &mut SensorChannel<P> {
        &mut self.particulate
    }

    /// The outbound sink.
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// The settings store.
    pub fn store(&self) -> &S {
        &self.store
    }

    fn drain_events(&mut self) -> bool {
        let mut drained = false;
        while let Some(event) = self.events.pop() {
            log::info!("channel event: {:?}", event);
            drained = true;
        }
        drained
    }

    fn publish_reading(&mut self) {
        let snapshot = snapshot::reading_snapshot(&self.so2, &self.no2, &self.particulate);
        if snapshot.is_empty() {
            log::warn!("all channels offline, publishing empty reading");
        }
        let sent_at = self.wall.formatted_now();
        match payload::encode_reading(&snapshot, self.client_id.as_str(), sent_at.as_str()) {
            Ok(bytes) => {
                let topic = payload::ingest_topic(self.client_id.as_str());
                if self.sink.publish(topic.as_str(), &bytes, true) {
                    log::info!("sensor data published ({} bytes)", bytes.len());
                } else {
                    log::warn!("sensor data publish failed");
                }
            }
            Err(err) => log::error!("sensor data encode failed: {}", err),
        }
    }

    fn publish_metadata(&mut self, now: Timestamp) {
        let snapshot = snapshot::metadata_snapshot(
            &self.so2,
            &self.no2,
            &self.particulate,
            &self.store,
            &self.diagnostics,
            now,
            self.scheduler.read_interval_s(),
            self.publish_interval_s,
        );
        let sent_at = self.wall.formatted_now();
        match payload::encode_metadata(&snapshot, self.client_id.as_str(), sent_at.as_str()) {
            Ok(bytes) => {
                if self
                    .sink
                    .publish(payload::METADATA_TOPIC, &bytes, true)
                {
                    log::info!("metadata published ({} bytes)", bytes.len());
                } else {
                    log::warn!("metadata publish failed");
                }
            }
            Err(err) => log::error!("metadata encode failed: {}", err),
        }
    }
}

fn drive<P, C, S>(
    channel: &mut SensorChannel<P>,
    action: PollAction,
    clock: &C,
    store: &mut S,
    events: &mut EventQueue,
) where
    P: SerialPort,
    C: Clock,
    S: SettingsStore,
{
    match action {
        PollAction::Read => {
            channel.read(clock, store, events);
        }
        PollAction::Probe => {
            channel.probe(clock, store, events);
        }
        PollAction::Skip => {}
    }
}
