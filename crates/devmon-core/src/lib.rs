//! Core domain types for the devmon device monitor.
//!
//! This crate provides the types shared by every other crate:
//! - `DeviceStatus`, `ChannelKey`: device/channel identity and alarm state
//! - `Position`: map coordinates with validation and distance helpers
//! - `FeedMessage`, `FeedPayload`: the unified push-feed message union
//! - `display`: formatting helpers for timestamps, titles and map icons
//! - `FaultKind`: the error taxonomy used for reporting

pub mod device;
pub mod display;
pub mod error;
pub mod position;
pub mod types;

pub use device::{ChannelKey, DeviceStatus};
pub use display::{
    device_icon, format_device_title, format_timestamp, format_timestamp_str, status_class,
    status_text, IconSize, MapIcon, INVALID_TIMESTAMP,
};
pub use error::{CoreError, FaultKind, Result};
pub use position::{calculate_distance, is_valid_coordinate, Position};
pub use types::{FeedMessage, FeedPayload, PowerLimits, TelemetryRecord};
