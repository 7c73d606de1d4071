//! Shared helpers for station-level integration tests
//!
//! Tests drive a full `Station` against scripted serial ports and a
//! shared simulated clock. Nothing here sleeps: waiting for a timeout
//! advances the clock, and cadences are exercised by advancing the
//! clock between ticks.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use trisense::aggregator::TelemetrySink;
use trisense::storage::SettingsStore;
use trisense::snapshot::StaticDiagnostics;
use trisense::storage::MemoryStore;
use trisense::time::{FixedWallClock, SharedClock};
use trisense::transport::ScriptedPort;
use trisense::{ChannelPorts, Station};

/// Device identity used across all integration tests.
pub const CLIENT_ID: &str = "KLIMERKO-TEST";

/// Wall-clock stamp every publish carries.
pub const STAMP: &str = "2024-06-01T12:00:00Z";

/// Serial numbers for the two gas sensors.
pub const SO2_SERIAL: &str = "212602030952";
pub const NO2_SERIAL: &str = "514402031177";

/// A plausible 7-character firmware handshake reply.
pub const FW_REPLY: &[u8] = b"1.4.8-b\r";

/// Reading topic for [`CLIENT_ID`].
pub const INGEST_TOPIC: &str = "v1/devices/KLIMERKO-TEST/actions/ingest";

/// Metadata topic shared by all devices.
pub const METADATA_TOPIC: &str = "v1/devices/actions";

/// Station type under test.
pub type TestStation =
    Station<ScriptedPort, MemoryStore, RecordingSink, SharedClock, FixedWallClock, StaticDiagnostics>;

/// Sink that records every publish; clones share the same record list.
#[derive(Clone, Default)]
pub struct RecordingSink {
    records: Rc<RefCell<Vec<(String, Vec<u8>, bool)>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parsed JSON payloads published to `topic`, in order.
    pub fn on_topic(&self, topic: &str) -> Vec<serde_json::Value> {
        self.records
            .borrow()
            .iter()
            .filter(|(t, _, _)| t == topic)
            .map(|(_, payload, _)| serde_json::from_slice(payload).unwrap())
            .collect()
    }

    /// Whether every recorded publish asked for retention.
    pub fn all_retained(&self) -> bool {
        self.records.borrow().iter().all(|(_, _, retain)| *retain)
    }

    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }
}

impl TelemetrySink for RecordingSink {
    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> bool {
        self.records
            .borrow_mut()
            .push((topic.to_string(), payload.to_vec(), retain));
        true
    }
}

/// One well-formed gas data line with 4h20m of sensor uptime.
pub fn gas_line(serial: &str, ppb: i32, temp: i32, hum: i32) -> Vec<u8> {
    format!("{serial}, {ppb}, {temp}, {hum}, 512, 25, 44, 0, 4, 20, 7\n").into_bytes()
}

/// One well-formed 32-byte particulate frame.
pub fn pm_frame(pm1: u16, pm2_5: u16, pm10: u16) -> [u8; 32] {
    let mut frame = [0u8; 32];
    frame[0] = 0x42;
    frame[1] = 0x4D;
    frame[2..4].copy_from_slice(&28u16.to_be_bytes());
    frame[10..12].copy_from_slice(&pm1.to_be_bytes());
    frame[12..14].copy_from_slice(&pm2_5.to_be_bytes());
    frame[14..16].copy_from_slice(&pm10.to_be_bytes());
    let checksum: u16 = frame[..30].iter().map(|&b| b as u16).sum();
    frame[30..32].copy_from_slice(&checksum.to_be_bytes());
    frame
}

/// Build an uninitialized station over scripted ports.
pub fn build_station(clock: &SharedClock, sink: &RecordingSink, store: MemoryStore) -> TestStation {
    let ports = ChannelPorts {
        so2: ScriptedPort::new(clock.clone()),
        no2: ScriptedPort::new(clock.clone()),
        particulate: ScriptedPort::new(clock.clone()),
    };
    Station::new(
        ports,
        store,
        sink.clone(),
        clock.clone(),
        FixedWallClock::new(STAMP),
        StaticDiagnostics,
        CLIENT_ID,
    )
}

/// Fresh store pre-seeded with both gas sensor serial numbers, so a
/// matching data line is not treated as a sensor swap.
pub fn seeded_store() -> MemoryStore {
    use trisense::storage::keys;
    let mut store = MemoryStore::new();
    store.put_str(keys::SO2_SERIAL, SO2_SERIAL);
    store.put_str(keys::NO2_SERIAL, NO2_SERIAL);
    store
}

/// Tick the station once per simulated second for `seconds` seconds.
pub fn run_for(station: &mut TestStation, clock: &SharedClock, seconds: u64) {
    for _ in 0..seconds {
        clock.advance(1_000);
        station.on_tick();
    }
}
