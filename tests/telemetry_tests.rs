//! Telemetry emission integration tests
//!
//! Verify the outbound contract through a full station: reading
//! payloads on the per-device ingest topic, metadata on the shared
//! actions topic, the boot metadata one-shot and publish interval
//! reconfiguration.

mod common;

use common::*;
use trisense::storage::{keys, SettingsStore};
use trisense::time::SharedClock;
use trisense::{ConfigError, Health};

#[test]
fn reading_omits_offline_channels_and_falls_back_for_ambient() {
    let clock = SharedClock::new();
    let sink = RecordingSink::new();
    let mut station = build_station(&clock, &sink, seeded_store());
    station.so2_mut().port_mut().enqueue_reply(FW_REPLY);
    station.no2_mut().port_mut().enqueue_silence();
    station.init_sensors();
    assert_eq!(station.so2().health(), Health::Online);

    for _ in 0..12 {
        station
            .so2_mut()
            .port_mut()
            .enqueue_reply(&gas_line(SO2_SERIAL, 100, 27, 46));
    }
    // First reading publish is due one publish interval after boot
    run_for(&mut station, &clock, 65);

    let readings = sink.on_topic(INGEST_TOPIC);
    assert!(!readings.is_empty());
    let data = readings[0]["data"].as_object().unwrap();

    assert!(data.contains_key("SO2"));
    assert!(data.contains_key("so2_adc"));
    assert!(!data.contains_key("NO2"));
    assert!(!data.contains_key("PM2_5"));
    // NO2 is offline, so ambient values come from the SO2 sensor
    assert_eq!(data["temperature"], 25);
    assert_eq!(data["humidity"], 45);

    assert_eq!(readings[0]["client_id"], CLIENT_ID);
    assert_eq!(readings[0]["sent_at"], STAMP);
    assert!(sink.all_retained());
}

#[test]
fn particulate_reading_uses_platform_field_names() {
    let clock = SharedClock::new();
    let sink = RecordingSink::new();
    let mut station = build_station(&clock, &sink, seeded_store());
    station.so2_mut().port_mut().enqueue_silence();
    station.no2_mut().port_mut().enqueue_silence();
    station
        .particulate_mut()
        .port_mut()
        .preload(&pm_frame(8, 17, 21));
    station.init_sensors();
    assert_eq!(station.particulate().health(), Health::Online);

    for _ in 0..12 {
        station
            .particulate_mut()
            .port_mut()
            .preload(&pm_frame(8, 17, 21));
    }
    run_for(&mut station, &clock, 65);

    let readings = sink.on_topic(INGEST_TOPIC);
    assert!(!readings.is_empty());
    let data = readings[0]["data"].as_object().unwrap();
    assert_eq!(data["PM1"], 8);
    assert_eq!(data["PM2_5"], 17);
    assert_eq!(data["PM10"], 21);
    assert!(!data.contains_key("temperature"));
}

#[test]
fn boot_metadata_fires_seventy_seconds_after_boot() {
    let clock = SharedClock::new();
    let sink = RecordingSink::new();
    let mut station = build_station(&clock, &sink, seeded_store());
    station.so2_mut().port_mut().enqueue_reply(FW_REPLY);
    station.no2_mut().port_mut().enqueue_silence();
    station.init_sensors();

    for _ in 0..15 {
        station
            .so2_mut()
            .port_mut()
            .enqueue_reply(&gas_line(SO2_SERIAL, 100, 27, 46));
    }
    run_for(&mut station, &clock, 75);

    // Metadata includes offline channels; readings never do
    let metadata = sink.on_topic(METADATA_TOPIC);
    assert!(!metadata.is_empty());
    let data = metadata[0]["data"].as_object().unwrap();
    assert_eq!(metadata[0]["type"], "device_metadata");
    assert_eq!(metadata[0]["correlation_id"], CLIENT_ID);
    assert_eq!(data["so2_online"], true);
    assert_eq!(data["so2_serial"], SO2_SERIAL);
    assert_eq!(data["no2_online"], false);
    assert_eq!(data["pms_online"], false);
    assert_eq!(data["device_fw"], trisense::VERSION);
    assert_eq!(data["device_sensor_read_interval"], 6);
    assert_eq!(data["device_sensor_publish_interval"], 60);
}

#[test]
fn publish_interval_is_validated_and_persisted() {
    let clock = SharedClock::new();
    let sink = RecordingSink::new();
    let mut station = build_station(&clock, &sink, seeded_store());

    assert_eq!(
        station.set_publish_interval(29),
        Err(ConfigError::IntervalOutOfRange {
            seconds: 29,
            min: 30,
            max: 600,
        })
    );
    assert_eq!(
        station.set_publish_interval(601),
        Err(ConfigError::IntervalOutOfRange {
            seconds: 601,
            min: 30,
            max: 600,
        })
    );
    assert_eq!(station.publish_interval_s(), 60);

    assert_eq!(station.set_publish_interval(120), Ok(()));
    assert_eq!(station.publish_interval_s(), 120);
    assert_eq!(station.store().get_i32(keys::PUBLISH_INTERVAL, 0), 120);

    // The change event forces metadata on the next tick
    clock.advance(1_000);
    station.on_tick();
    let metadata = sink.on_topic(METADATA_TOPIC);
    assert!(!metadata.is_empty());
    assert_eq!(metadata[0]["data"]["device_sensor_publish_interval"], 120);
    assert_eq!(metadata[0]["data"]["device_sensor_read_interval"], 12);
}

#[test]
fn out_of_range_persisted_interval_falls_back_to_default() {
    let clock = SharedClock::new();
    let sink = RecordingSink::new();
    let mut store = seeded_store();
    store.put_i32(keys::PUBLISH_INTERVAL, 10_000);
    let station = build_station(&clock, &sink, store);

    assert_eq!(station.publish_interval_s(), 60);
}
