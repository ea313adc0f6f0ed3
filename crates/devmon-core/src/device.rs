//! Device and channel identity types.
//!
//! A device aggregates one or more measurement channels. Each channel
//! reports its own alarm state; the device state is derived from them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Alarm state of a channel or a device.
///
/// On the wire this is a number: `0` is normal, anything else is an alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum DeviceStatus {
    /// No alarm.
    #[default]
    Normal,
    /// Out-of-normal condition.
    Alarm,
}

impl DeviceStatus {
    /// Build a status from a raw wire value.
    pub fn from_raw(raw: f64) -> Self {
        if raw == 0.0 {
            Self::Normal
        } else {
            Self::Alarm
        }
    }

    /// Numeric wire value (0 = normal, 1 = alarm).
    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Normal => 0,
            Self::Alarm => 1,
        }
    }

    pub fn is_alarm(&self) -> bool {
        matches!(self, Self::Alarm)
    }

    /// Logical OR over alarm bits. An empty iterator is `Normal`.
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = DeviceStatus>,
    {
        if statuses.into_iter().any(|s| s.is_alarm()) {
            Self::Alarm
        } else {
            Self::Normal
        }
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Alarm => write!(f, "alarm"),
        }
    }
}

impl Serialize for DeviceStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for DeviceStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        Ok(Self::from_raw(raw))
    }
}

/// Unique channel identifier: the (device ID, channel name) pair.
///
/// Its textual form is `"{device_id}_{channel}"`. Equality and hashing use
/// the pair, so IDs that contain `_` cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelKey {
    device_id: String,
    channel: String,
}

impl ChannelKey {
    pub fn new(device_id: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            channel: channel.into(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }
}

impl fmt::Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.device_id, self.channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_raw() {
        assert_eq!(DeviceStatus::from_raw(0.0), DeviceStatus::Normal);
        assert_eq!(DeviceStatus::from_raw(1.0), DeviceStatus::Alarm);
        assert_eq!(DeviceStatus::from_raw(2.0), DeviceStatus::Alarm);
    }

    #[test]
    fn test_status_aggregate() {
        assert_eq!(DeviceStatus::aggregate(Vec::new()), DeviceStatus::Normal);
        assert_eq!(
            DeviceStatus::aggregate([DeviceStatus::Normal, DeviceStatus::Normal]),
            DeviceStatus::Normal
        );
        assert_eq!(
            DeviceStatus::aggregate([DeviceStatus::Normal, DeviceStatus::Alarm]),
            DeviceStatus::Alarm
        );
    }

    #[test]
    fn test_status_serde_numeric() {
        assert_eq!(serde_json::to_string(&DeviceStatus::Alarm).unwrap(), "1");
        let parsed: DeviceStatus = serde_json::from_str("0").unwrap();
        assert_eq!(parsed, DeviceStatus::Normal);
        let parsed: DeviceStatus = serde_json::from_str("1.0").unwrap();
        assert_eq!(parsed, DeviceStatus::Alarm);
    }

    #[test]
    fn test_channel_key_display() {
        let key = ChannelKey::new("D1", "A");
        assert_eq!(key.to_string(), "D1_A");
        assert_eq!(key.device_id(), "D1");
        assert_eq!(key.channel(), "A");
    }

    #[test]
    fn test_channel_key_no_collision() {
        // Same concatenated text, different pairs.
        let a = ChannelKey::new("a_b", "c");
        let b = ChannelKey::new("a", "b_c");
        assert_eq!(a.to_string(), b.to_string());
        assert_ne!(a, b);
    }
}
