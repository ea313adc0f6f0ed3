//! REST payload types.

use devmon_core::{DeviceStatus, Position};
use serde::{Deserialize, Deserializer, Serialize};

/// Device record returned by the list and detail endpoints.
///
/// Only `id` is required; fields the backend adds are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(alias = "deviceId", deserialize_with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub status: DeviceStatus,
    #[serde(default, alias = "lng", skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl DeviceInfo {
    /// Position, when the backend supplied valid coordinates.
    pub fn position(&self) -> Option<Position> {
        match (self.lon, self.lat) {
            (Some(lon), Some(lat)) => Position::checked(lon, lat).ok(),
            _ => None,
        }
    }
}

/// Status endpoint body: a bare number or an object carrying `status`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StatusBody {
    Bare(DeviceStatus),
    Wrapped {
        #[serde(alias = "state")]
        status: DeviceStatus,
    },
}

impl StatusBody {
    pub(crate) fn into_status(self) -> DeviceStatus {
        match self {
            Self::Bare(status) | Self::Wrapped { status } => status,
        }
    }
}

fn id_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Num(n) => n.to_string(),
    })
}
