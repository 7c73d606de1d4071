//! Health lifecycle integration tests
//!
//! Exercise the Offline transition, the degraded probe cadence and
//! recovery through a full station: scripted serial failures on one
//! channel must surface as metadata publishes while the other channels
//! keep reporting.

mod common;

use common::*;
use trisense::time::SharedClock;
use trisense::Health;

/// Bring only the SO2 channel up; NO2 and PMS stay Offline.
fn so2_only_station(clock: &SharedClock, sink: &RecordingSink) -> TestStation {
    let mut station = build_station(clock, sink, seeded_store());
    station.so2_mut().port_mut().enqueue_reply(FW_REPLY);
    station.no2_mut().port_mut().enqueue_silence();
    assert_eq!(station.init_sensors(), 1);
    assert_eq!(station.so2().health(), Health::Online);
    assert_eq!(station.no2().health(), Health::Offline);
    assert_eq!(station.particulate().health(), Health::Offline);
    station
}

#[test]
fn five_consecutive_failures_publish_offline_metadata() {
    let clock = SharedClock::new();
    let sink = RecordingSink::new();
    let mut station = so2_only_station(&clock, &sink);
    sink.clear();

    // Five reads, every one a timeout
    for _ in 0..5 {
        station.so2_mut().port_mut().enqueue_silence();
    }
    // Reads fire every 6s; run past the fifth one
    run_for(&mut station, &clock, 32);

    assert_eq!(station.so2().health(), Health::Offline);

    // The WentOffline event forced metadata out on the transition tick
    let metadata = sink.on_topic(METADATA_TOPIC);
    assert!(!metadata.is_empty());
    let last = metadata.last().unwrap();
    assert_eq!(last["data"]["so2_online"], false);
    assert_eq!(last["data"]["so2_ready"], false);
}

#[test]
fn reads_before_the_threshold_stay_online() {
    let clock = SharedClock::new();
    let sink = RecordingSink::new();
    let mut station = so2_only_station(&clock, &sink);

    // Four timeouts, then good lines for every later cadenced read.
    // Each timeout burns its wait from the simulated clock, so the run
    // spans more read slots than the tick count alone suggests.
    for _ in 0..4 {
        station.so2_mut().port_mut().enqueue_silence();
    }
    for _ in 0..4 {
        station
            .so2_mut()
            .port_mut()
            .enqueue_reply(&gas_line(SO2_SERIAL, 100, 27, 46));
    }
    run_for(&mut station, &clock, 32);

    assert_eq!(station.so2().health(), Health::Online);
    assert_eq!(station.so2().retry_count(), 0);
}

#[test]
fn offline_channel_recovers_through_a_probe() {
    let clock = SharedClock::new();
    let sink = RecordingSink::new();
    let mut station = build_station(&clock, &sink, seeded_store());
    station.so2_mut().port_mut().enqueue_reply(FW_REPLY);
    station.no2_mut().port_mut().enqueue_silence();
    station.init_sensors();
    assert_eq!(station.no2().health(), Health::Offline);
    sink.clear();

    // Keep SO2 fed while waiting out the probe interval
    for _ in 0..25 {
        station
            .so2_mut()
            .port_mut()
            .enqueue_reply(&gas_line(SO2_SERIAL, 100, 27, 46));
    }
    // Probe answers: handshake plus the immediate post-recovery read
    station.no2_mut().port_mut().enqueue_reply(FW_REPLY);
    station
        .no2_mut()
        .port_mut()
        .enqueue_reply(&gas_line(NO2_SERIAL, 80, 27, 46));

    // Probe cadence is twice the publish interval (120s)
    run_for(&mut station, &clock, 125);

    assert_eq!(station.no2().health(), Health::Online);
    // The immediate read populated the averages before any cadenced read
    assert!(!station.no2().gas().unwrap().avg_concentration.is_empty());

    let metadata = sink.on_topic(METADATA_TOPIC);
    let recovered = metadata
        .iter()
        .any(|m| m["data"]["no2_online"] == true);
    assert!(recovered);
}

#[test]
fn swapped_sensor_clears_zeroing_history_in_metadata() {
    let clock = SharedClock::new();
    let sink = RecordingSink::new();
    let mut store = seeded_store();
    {
        use trisense::storage::{keys, SettingsStore};
        store.put_str(keys::SO2_LAST_ZERO, "2024-01-01T00:00:00Z");
    }
    let mut station = build_station(&clock, &sink, store);
    station.so2_mut().port_mut().enqueue_reply(FW_REPLY);
    station.no2_mut().port_mut().enqueue_silence();
    station.init_sensors();
    sink.clear();

    let replacement = "999888777666";
    station
        .so2_mut()
        .port_mut()
        .enqueue_reply(&gas_line(replacement, 100, 27, 46));
    run_for(&mut station, &clock, 8);

    assert_eq!(station.so2().serial_number(), replacement);

    let metadata = sink.on_topic(METADATA_TOPIC);
    assert!(!metadata.is_empty());
    let last = metadata.last().unwrap();
    assert_eq!(last["data"]["so2_serial"], replacement);
    assert_eq!(last["data"]["so2_last_zeroing"], "NO INFO");
}
