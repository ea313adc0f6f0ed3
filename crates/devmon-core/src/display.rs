//! Presentation helpers.
//!
//! Pure functions that turn domain values into strings and marker
//! descriptors for the map surface. No state.

use crate::device::DeviceStatus;
use chrono::{DateTime, TimeZone};
use serde::Serialize;
use std::fmt;

/// Returned by [`format_timestamp_str`] when the input cannot be parsed.
pub const INVALID_TIMESTAMP: &str = "Invalid time";

/// Marker icon size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IconSize {
    pub width: u32,
    pub height: u32,
}

/// Marker icon descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapIcon {
    /// Image URL relative to the static asset root.
    pub url: &'static str,
    pub size: IconSize,
}

/// Pick the marker icon for a device status.
pub fn device_icon(status: DeviceStatus) -> MapIcon {
    MapIcon {
        url: if status.is_alarm() {
            "/red.gif"
        } else {
            "/green.svg"
        },
        size: IconSize {
            width: 31,
            height: 40,
        },
    }
}

/// Human-readable status label.
pub fn status_text(status: DeviceStatus) -> &'static str {
    match status {
        DeviceStatus::Alarm => "Alarm",
        DeviceStatus::Normal => "Normal",
    }
}

/// CSS class name for a status.
pub fn status_class(status: DeviceStatus) -> &'static str {
    match status {
        DeviceStatus::Alarm => "alarm",
        DeviceStatus::Normal => "normal",
    }
}

/// Marker title, e.g. `"Device: DEV001 | Status: Normal"`.
pub fn format_device_title(device_id: &str, status: DeviceStatus) -> String {
    format!("Device: {device_id} | Status: {}", status_text(status))
}

/// Format a timestamp as `YYYY/MM/DD HH:MM:SS` in its own time zone.
pub fn format_timestamp<Tz>(ts: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    ts.format("%Y/%m/%d %H:%M:%S").to_string()
}

/// Parse an RFC 3339 timestamp and format it; [`INVALID_TIMESTAMP`] on failure.
pub fn format_timestamp_str(raw: &str) -> String {
    match DateTime::parse_from_rfc3339(raw) {
        Ok(ts) => format_timestamp(&ts),
        Err(_) => INVALID_TIMESTAMP.to_string(),
    }
}
