//! Push-feed message types.
//!
//! The hub delivers either a plain status string (connection notices) or a
//! structured telemetry record for one channel. Both shapes, across every
//! feed variant, are unified behind [`FeedMessage`].

use crate::device::DeviceStatus;
use crate::error::{CoreError, Result};
use crate::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Telemetry for a single channel.
///
/// Field names follow the wire format (`lon`, `lat`, `state`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Device ID echoed inside the payload. The invocation argument wins.
    #[serde(rename = "deviceId", default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Channel name. Numeric channel numbers are accepted and stringified.
    #[serde(deserialize_with = "string_or_number")]
    pub channel: String,
    #[serde(default)]
    pub address: String,
    pub lon: f64,
    pub lat: f64,
    /// Power reading.
    #[serde(default)]
    pub power: f64,
    pub state: DeviceStatus,
}

impl TelemetryRecord {
    pub fn position(&self) -> Position {
        Position::new(self.lon, self.lat)
    }
}

/// Power limits sent alongside telemetry by the four-argument feed variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PowerLimits {
    pub min: f64,
    pub max: f64,
}

impl PowerLimits {
    /// Check whether a reading lies within the limits (inclusive).
    pub fn contains(&self, power: f64) -> bool {
        power >= self.min && power <= self.max
    }
}

/// Payload of a feed message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FeedPayload {
    /// Structured channel telemetry.
    Telemetry(TelemetryRecord),
    /// Plain status notice; carries no device state.
    Status(String),
    /// Any other JSON shape (null, number, array). Ignored by the store.
    Other(serde_json::Value),
}

impl FeedPayload {
    /// Discriminate a raw `response` value by shape.
    ///
    /// Strings become `Status`, objects must decode as telemetry, everything
    /// else is `Other`.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::String(s) => Ok(Self::Status(s)),
            obj @ serde_json::Value::Object(_) => {
                let record: TelemetryRecord = serde_json::from_value(obj)?;
                Ok(Self::Telemetry(record))
            }
            other => Ok(Self::Other(other)),
        }
    }

    pub fn as_telemetry(&self) -> Option<&TelemetryRecord> {
        match self {
            Self::Telemetry(record) => Some(record),
            _ => None,
        }
    }

    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Telemetry(_) => "telemetry",
            Self::Status(_) => "status",
            Self::Other(_) => "other",
        }
    }
}

/// A validated push-feed message for one device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedMessage {
    pub device_id: String,
    pub payload: FeedPayload,
    /// Present only for the four-argument feed variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<PowerLimits>,
    /// Receive time at the adapter boundary.
    pub timestamp: DateTime<Utc>,
}

impl FeedMessage {
    pub fn new(device_id: impl Into<String>, payload: FeedPayload) -> Self {
        Self {
            device_id: device_id.into(),
            payload,
            limits: None,
            timestamp: Utc::now(),
        }
    }

    /// Convenience constructor for a telemetry message.
    pub fn telemetry(device_id: impl Into<String>, record: TelemetryRecord) -> Self {
        Self::new(device_id, FeedPayload::Telemetry(record))
    }

    pub fn with_limits(mut self, limits: PowerLimits) -> Self {
        self.limits = Some(limits);
        self
    }

    /// Reject telemetry whose coordinates are out of range.
    pub fn validate(&self) -> Result<()> {
        if let FeedPayload::Telemetry(record) = &self.payload {
            Position::checked(record.lon, record.lat)?;
            if record.channel.is_empty() {
                return Err(CoreError::InvalidPayload(format!(
                    "empty channel name for device {}",
                    self.device_id
                )));
            }
        }
        Ok(())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}
