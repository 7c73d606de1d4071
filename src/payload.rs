//! Outbound telemetry JSON
//!
//! Field names here are the platform contract; renames happen in the
//! serde attributes, never in the snapshot types. Optional reading
//! fields are skipped rather than nulled so an omitted channel is
//! genuinely absent from the wire.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use serde::Serialize;

use crate::snapshot::{MetadataSnapshot, ReadingSnapshot};

/// Topic all devices publish metadata to.
pub const METADATA_TOPIC: &str = "v1/devices/actions";

/// Rendered per-device topic.
pub type TopicBuf = heapless::String<64>;

/// Per-device reading topic, `v1/devices/{client_id}/actions/ingest`.
pub fn ingest_topic(client_id: &str) -> TopicBuf {
    let mut topic = TopicBuf::new();
    let _ = topic.push_str("v1/devices/");
    let _ = topic.push_str(client_id);
    let _ = topic.push_str("/actions/ingest");
    topic
}

#[derive(Serialize)]
struct ReadingEnvelope<'a> {
    sent_at: &'a str,
    client_id: &'a str,
    data: ReadingData,
}

#[derive(Serialize)]
struct ReadingData {
    #[serde(rename = "SO2", skip_serializing_if = "Option::is_none")]
    so2: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    so2_adc: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    so2_ready: Option<bool>,
    #[serde(rename = "NO2", skip_serializing_if = "Option::is_none")]
    no2: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    no2_adc: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    no2_ready: Option<bool>,
    #[serde(rename = "PM1", skip_serializing_if = "Option::is_none")]
    pm1: Option<i32>,
    #[serde(rename = "PM2_5", skip_serializing_if = "Option::is_none")]
    pm2_5: Option<i32>,
    #[serde(rename = "PM10", skip_serializing_if = "Option::is_none")]
    pm10: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    humidity: Option<i32>,
}

#[derive(Serialize)]
struct MetadataEnvelope<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    client_id: &'a str,
    correlation_id: &'a str,
    sent_at: &'a str,
    data: MetadataData<'a>,
}

#[derive(Serialize)]
struct MetadataData<'a> {
    sent_at: &'a str,
    device_fw: &'a str,
    device_active_time: &'a str,
    device_wifi_rssi: i32,
    device_free_heap: u32,
    device_flash_size: u32,
    device_sketch_used: u32,
    device_sketch_total: u32,
    device_last_successful_ota: &'a str,
    device_last_failed_ota: &'a str,
    device_last_reset_reason: &'a str,
    device_sensor_read_interval: u64,
    device_sensor_publish_interval: i32,
    so2_online: bool,
    so2_ready: bool,
    so2_active_time: &'a str,
    so2_serial: &'a str,
    so2_fw_version: &'a str,
    so2_last_zeroing: &'a str,
    so2_last_failed_zeroing: &'a str,
    no2_online: bool,
    no2_ready: bool,
    no2_active_time: &'a str,
    no2_serial: &'a str,
    no2_fw_version: &'a str,
    no2_last_zeroing: &'a str,
    no2_last_failed_zeroing: &'a str,
    pms_online: bool,
}

/// Encode one periodic reading publish.
pub fn encode_reading(
    snapshot: &ReadingSnapshot,
    client_id: &str,
    sent_at: &str,
) -> serde_json::Result<Vec<u8>> {
    let envelope = ReadingEnvelope {
        sent_at,
        client_id,
        data: ReadingData {
            so2: snapshot.so2.map(|r| r.concentration),
            so2_adc: snapshot.so2.map(|r| r.adc),
            so2_ready: snapshot.so2.map(|r| r.ready),
            no2: snapshot.no2.map(|r| r.concentration),
            no2_adc: snapshot.no2.map(|r| r.adc),
            no2_ready: snapshot.no2.map(|r| r.ready),
            pm1: snapshot.particulate.map(|r| r.pm1),
            pm2_5: snapshot.particulate.map(|r| r.pm2_5),
            pm10: snapshot.particulate.map(|r| r.pm10),
            temperature: snapshot.temperature,
            humidity: snapshot.humidity,
        },
    };
    serde_json::to_vec(&envelope)
}

/// Encode one metadata publish.
pub fn encode_metadata(
    snapshot: &MetadataSnapshot,
    client_id: &str,
    sent_at: &str,
) -> serde_json::Result<Vec<u8>> {
    let device = &snapshot.device;
    let envelope = MetadataEnvelope {
        kind: "device_metadata",
        client_id,
        correlation_id: client_id,
        sent_at,
        data: MetadataData {
            sent_at,
            device_fw: device.firmware,
            device_active_time: device.active_time.as_str(),
            device_wifi_rssi: device.rssi,
            device_free_heap: device.free_heap,
            device_flash_size: device.flash_size,
            device_sketch_used: device.app_size_used,
            device_sketch_total: device.app_size_total,
            device_last_successful_ota: device.last_successful_ota.as_str(),
            device_last_failed_ota: device.last_failed_ota.as_str(),
            device_last_reset_reason: device.reset_reason.as_str(),
            device_sensor_read_interval: device.read_interval_s,
            device_sensor_publish_interval: device.publish_interval_s,
            so2_online: snapshot.so2.online,
            so2_ready: snapshot.so2.ready,
            so2_active_time: snapshot.so2.active_time.as_str(),
            so2_serial: snapshot.so2.serial.as_str(),
            so2_fw_version: snapshot.so2.firmware.as_str(),
            so2_last_zeroing: snapshot.so2.last_zeroing.as_str(),
            so2_last_failed_zeroing: snapshot.so2.last_failed_zeroing.as_str(),
            no2_online: snapshot.no2.online,
            no2_ready: snapshot.no2.ready,
            no2_active_time: snapshot.no2.active_time.as_str(),
            no2_serial: snapshot.no2.serial.as_str(),
            no2_fw_version: snapshot.no2.firmware.as_str(),
            no2_last_zeroing: snapshot.no2.last_zeroing.as_str(),
            no2_last_failed_zeroing: snapshot.no2.last_failed_zeroing.as_str(),
            pms_online: snapshot.particulate_online,
        },
    };
    serde_json::to_vec(&envelope)
}
