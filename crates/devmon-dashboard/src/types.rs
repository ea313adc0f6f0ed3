//! Dashboard API types.

use devmon_core::{device_icon, format_device_title, format_timestamp, status_class, status_text};
use devmon_core::{DeviceStatus, MapIcon, Position};
use devmon_feed::{Channel, Device};
use devmon_telemetry::{FaultRecord, Notification};
use serde::Serialize;

/// Store-wide counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub device_count: usize,
    pub alarm_count: usize,
    pub normal_count: usize,
    pub channel_count: usize,
    pub feed_connected: bool,
}

/// One map marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerSnapshot {
    pub device_id: String,
    pub position: Position,
    pub status: DeviceStatus,
    pub title: String,
    pub icon: MapIcon,
    pub address: String,
    /// `YYYY/MM/DD HH:MM:SS`, UTC.
    pub last_update: String,
    pub channel_count: usize,
}

impl MarkerSnapshot {
    pub fn from_device(device: &Device) -> Self {
        Self {
            device_id: device.id().to_string(),
            position: device.position(),
            status: device.status(),
            title: format_device_title(device.id(), device.status()),
            icon: device_icon(device.status()),
            address: device.address().to_string(),
            last_update: format_timestamp(&device.last_update()),
            channel_count: device.channel_count(),
        }
    }
}

/// Device detail panel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceDetailSnapshot {
    pub marker: MarkerSnapshot,
    pub status_text: &'static str,
    pub status_class: &'static str,
    /// Alarm channels first, then by name.
    pub channels: Vec<Channel>,
}

impl DeviceDetailSnapshot {
    pub fn new(device: &Device, sorted_channels: Vec<Channel>) -> Self {
        Self {
            marker: MarkerSnapshot::from_device(device),
            status_text: status_text(device.status()),
            status_class: status_class(device.status()),
            channels: sorted_channels,
        }
    }
}

/// Full dashboard state.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub timestamp_ms: i64,
    pub summary: DeviceSummary,
    /// Sorted by device ID.
    pub devices: Vec<MarkerSnapshot>,
    /// Active loading keys.
    pub loading: Vec<String>,
    /// Newest first.
    pub recent_errors: Vec<FaultRecord>,
}

/// WebSocket message types.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DashboardMessage {
    /// Full snapshot (sent on connect).
    Snapshot(DashboardSnapshot),
    /// Periodic update.
    Update {
        timestamp_ms: i64,
        summary: DeviceSummary,
        /// Present only when the store changed since the last update.
        #[serde(skip_serializing_if = "Option::is_none")]
        devices: Option<Vec<MarkerSnapshot>>,
        loading: Vec<String>,
    },
    /// A newly reported fault.
    Alert {
        timestamp_ms: i64,
        fault: FaultRecord,
        notification: Notification,
    },
}
