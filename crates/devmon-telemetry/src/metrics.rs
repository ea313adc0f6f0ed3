//! Prometheus metrics for devmon.
//!
//! Covers:
//! - Feed connection state and reconnects
//! - Feed message throughput by payload kind
//! - Faults by kind
//! - Device/channel counts from the latest published snapshot
//! - REST request outcomes
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which must crash at startup. Only static initialization can panic.

use crate::error::{TelemetryError, TelemetryResult};
use devmon_core::FaultKind;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_gauge, register_int_gauge, register_int_gauge_vec,
    CounterVec, Encoder, Gauge, IntGauge, IntGaugeVec, TextEncoder,
};

/// Feed connection state (1 = connected, 0 = disconnected).
pub static FEED_CONNECTED: Lazy<Gauge> = Lazy::new(|| {
    register_gauge!(
        "devmon_feed_connected",
        "Push feed connection state (1=connected)"
    )
    .unwrap()
});

/// Total feed reconnections.
/// Labels: reason
pub static FEED_RECONNECT_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "devmon_feed_reconnect_total",
        "Total push feed reconnections",
        &["reason"]
    )
    .unwrap()
});

/// Feed messages by payload kind.
/// Labels: kind (telemetry/status/other)
pub static FEED_MESSAGES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "devmon_feed_messages_total",
        "Total push feed messages accepted, by payload kind",
        &["kind"]
    )
    .unwrap()
});

/// Faults by kind.
/// Labels: kind (network/api/transport/parse/validation/unknown)
pub static FAULTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("devmon_faults_total", "Total reported faults", &["kind"]).unwrap()
});

/// Known devices by aggregate status.
/// Labels: status (alarm/normal)
pub static DEVICES: Lazy<IntGaugeVec> = Lazy::new(|| {
    register_int_gauge_vec!(
        "devmon_devices",
        "Known devices by aggregate status",
        &["status"]
    )
    .unwrap()
});

/// Known channels.
pub static CHANNELS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("devmon_channels", "Known channels across all devices").unwrap()
});

/// REST requests.
/// Labels: endpoint, outcome (ok/error)
pub static API_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "devmon_api_requests_total",
        "Total REST backend requests",
        &["endpoint", "outcome"]
    )
    .unwrap()
});

/// Open dashboard WebSocket clients.
pub static DASHBOARD_CLIENTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "devmon_dashboard_clients",
        "Connected dashboard WebSocket clients"
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn feed_connected() {
        FEED_CONNECTED.set(1.0);
    }

    pub fn feed_disconnected() {
        FEED_CONNECTED.set(0.0);
    }

    pub fn feed_reconnect(reason: &str) {
        FEED_RECONNECT_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record an accepted feed message.
    pub fn feed_message(kind: &str) {
        FEED_MESSAGES_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn fault(kind: FaultKind) {
        FAULTS_TOTAL.with_label_values(&[kind.as_str()]).inc();
    }

    /// Record store counts after a snapshot is published.
    pub fn device_counts(alarm: usize, normal: usize, channels: usize) {
        DEVICES.with_label_values(&["alarm"]).set(alarm as i64);
        DEVICES.with_label_values(&["normal"]).set(normal as i64);
        CHANNELS.set(channels as i64);
    }

    pub fn api_request(endpoint: &str, ok: bool) {
        let outcome = if ok { "ok" } else { "error" };
        API_REQUESTS_TOTAL
            .with_label_values(&[endpoint, outcome])
            .inc();
    }

    pub fn dashboard_client_connected() {
        DASHBOARD_CLIENTS.inc();
    }

    pub fn dashboard_client_disconnected() {
        DASHBOARD_CLIENTS.dec();
    }

    /// Render the default registry in the Prometheus text format.
    pub fn gather_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buf).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
