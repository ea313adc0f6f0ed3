//! Device state aggregation.
//!
//! Combines per-channel telemetry into a per-device view. The store owns
//! both the device map and the flat channel map; every mutation goes
//! through [`DeviceStore::update_device_data`], [`DeviceStore::remove_device`]
//! or [`DeviceStore::clear_all_data`] so the two maps never disagree.

use chrono::{DateTime, Utc};
use devmon_core::{ChannelKey, DeviceStatus, FeedMessage, FeedPayload, Position, PowerLimits};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

/// Last-known state of one measurement channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Channel {
    pub device_id: String,
    pub channel: String,
    pub position: Position,
    pub status: DeviceStatus,
    pub address: String,
    pub power: f64,
    /// Only delivered by the four-argument feed variant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limits: Option<PowerLimits>,
    pub last_update: DateTime<Utc>,
}

impl Channel {
    pub fn key(&self) -> ChannelKey {
        ChannelKey::new(&self.device_id, &self.channel)
    }

    /// Whether the power reading lies outside the delivered limits.
    pub fn power_out_of_limits(&self) -> bool {
        self.limits.is_some_and(|l| !l.contains(self.power))
    }
}

/// Aggregated view of one device.
///
/// Status is the OR of its channels; position and address mirror the most
/// recently updated channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Device {
    id: String,
    position: Position,
    status: DeviceStatus,
    address: String,
    last_update: DateTime<Utc>,
    channels: BTreeMap<String, Channel>,
}

impl Device {
    fn new(id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: id.to_string(),
            position: Position::default(),
            status: DeviceStatus::Normal,
            address: String::new(),
            last_update: now,
            channels: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn last_update(&self) -> DateTime<Utc> {
        self.last_update
    }

    /// Channels ordered by name.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn apply(&mut self, channel: Channel) {
        self.position = channel.position;
        self.address.clone_from(&channel.address);
        self.last_update = channel.last_update;
        self.channels.insert(channel.channel.clone(), channel);
        self.status = DeviceStatus::aggregate(self.channels.values().map(|c| c.status));
    }
}

/// Canonical in-memory view of all known devices and channels.
///
/// Single-writer: mutation takes `&mut self`. Readers get a cloned copy
/// published by the owner.
#[derive(Debug, Clone, Default)]
pub struct DeviceStore {
    devices: HashMap<String, Device>,
    channels: HashMap<ChannelKey, Channel>,
}

impl DeviceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a feed message, stamping it with the current time.
    ///
    /// Returns `true` when state changed. Non-telemetry payloads are
    /// skipped.
    pub fn update_device_data(&mut self, message: &FeedMessage) -> bool {
        self.update_device_data_at(message, Utc::now())
    }

    /// Merge a feed message with an explicit update time.
    pub fn update_device_data_at(&mut self, message: &FeedMessage, now: DateTime<Utc>) -> bool {
        let record = match &message.payload {
            FeedPayload::Telemetry(record) => record,
            other => {
                trace!(
                    device_id = %message.device_id,
                    kind = other.kind(),
                    "Skipping non-telemetry payload"
                );
                return false;
            }
        };

        let channel = Channel {
            device_id: message.device_id.clone(),
            channel: record.channel.clone(),
            position: record.position(),
            status: record.state,
            address: record.address.clone(),
            power: record.power,
            limits: message.limits,
            last_update: now,
        };
        let key = channel.key();

        let device = self
            .devices
            .entry(message.device_id.clone())
            .or_insert_with(|| {
                debug!(device_id = %message.device_id, "New device");
                Device::new(&message.device_id, now)
            });
        let previous = device.status;
        device.apply(channel.clone());

        if previous != device.status {
            debug!(
                device_id = %message.device_id,
                from = %previous,
                to = %device.status,
                "Device status changed"
            );
        }

        self.channels.insert(key, channel);
        true
    }

    /// Aggregate status; `Normal` for unknown devices.
    pub fn get_device_status(&self, device_id: &str) -> DeviceStatus {
        self.devices
            .get(device_id)
            .map(Device::status)
            .unwrap_or_default()
    }

    /// Last reported position; `(0, 0)` for unknown devices.
    pub fn get_device_position(&self, device_id: &str) -> Position {
        self.devices
            .get(device_id)
            .map(Device::position)
            .unwrap_or_default()
    }

    /// Last reported address; empty for unknown devices.
    pub fn get_device_address(&self, device_id: &str) -> String {
        self.devices
            .get(device_id)
            .map(|d| d.address.clone())
            .unwrap_or_default()
    }

    /// Channels of a device ordered by name; empty for unknown devices.
    pub fn get_device_channels(&self, device_id: &str) -> Vec<Channel> {
        self.devices
            .get(device_id)
            .map(|d| d.channels().cloned().collect())
            .unwrap_or_default()
    }

    /// Channels with alarms first, then by channel name.
    pub fn get_sorted_channels(&self, device_id: &str) -> Vec<Channel> {
        let mut channels = self.get_device_channels(device_id);
        channels.sort_by(|a, b| {
            b.status
                .cmp(&a.status)
                .then_with(|| a.channel.cmp(&b.channel))
        });
        channels
    }

    pub fn get_device_data(&self, device_id: &str) -> Option<&Device> {
        self.devices.get(device_id)
    }

    pub fn get_channel(&self, device_id: &str, channel: &str) -> Option<&Channel> {
        self.channels.get(&ChannelKey::new(device_id, channel))
    }

    /// All device IDs, sorted.
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.devices.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.devices.values()
    }

    /// Remove a device together with all of its channels.
    pub fn remove_device(&mut self, device_id: &str) -> bool {
        let Some(device) = self.devices.remove(device_id) else {
            return false;
        };
        for name in device.channels.keys() {
            self.channels.remove(&ChannelKey::new(device_id, name.as_str()));
        }
        debug!(
            device_id,
            channels = device.channels.len(),
            "Device removed"
        );
        true
    }

    /// Drop every device and channel.
    pub fn clear_all_data(&mut self) {
        debug!(
            devices = self.devices.len(),
            channels = self.channels.len(),
            "Clearing device state"
        );
        self.devices.clear();
        self.channels.clear();
    }

    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    pub fn alarm_device_count(&self) -> usize {
        self.devices.values().filter(|d| d.status.is_alarm()).count()
    }

    pub fn normal_device_count(&self) -> usize {
        self.devices.values().filter(|d| !d.status.is_alarm()).count()
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
