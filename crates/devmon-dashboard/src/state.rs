//! Dashboard state.
//!
//! Reads published store snapshots; never touches the live store.

use chrono::Utc;
use devmon_feed::DeviceStore;
use devmon_telemetry::{ErrorReporter, LoadingTracker};
use tokio::sync::watch;

use crate::types::{DashboardSnapshot, DeviceDetailSnapshot, DeviceSummary, MarkerSnapshot};

/// Read-only view assembled from the published snapshot and the shared
/// context objects.
#[derive(Clone)]
pub struct DashboardState {
    store: watch::Receiver<DeviceStore>,
    feed_connected: watch::Receiver<bool>,
    reporter: ErrorReporter,
    loading: LoadingTracker,
    recent_errors: usize,
}

impl DashboardState {
    pub fn new(
        store: watch::Receiver<DeviceStore>,
        feed_connected: watch::Receiver<bool>,
        reporter: ErrorReporter,
        loading: LoadingTracker,
    ) -> Self {
        Self {
            store,
            feed_connected,
            reporter,
            loading,
            recent_errors: 10,
        }
    }

    /// Number of faults included in snapshots.
    pub fn with_recent_errors(mut self, n: usize) -> Self {
        self.recent_errors = n;
        self
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    /// A fresh receiver for change detection.
    pub fn store_receiver(&self) -> watch::Receiver<DeviceStore> {
        self.store.clone()
    }

    pub fn summary(&self) -> DeviceSummary {
        let store = self.store.borrow();
        summarize(&store, *self.feed_connected.borrow())
    }

    pub fn markers(&self) -> Vec<MarkerSnapshot> {
        markers(&self.store.borrow())
    }

    pub fn loading_keys(&self) -> Vec<String> {
        self.loading.active_keys()
    }

    pub fn collect_snapshot(&self) -> DashboardSnapshot {
        let (summary, devices) = {
            let store = self.store.borrow();
            (
                summarize(&store, *self.feed_connected.borrow()),
                markers(&store),
            )
        };

        DashboardSnapshot {
            timestamp_ms: Utc::now().timestamp_millis(),
            summary,
            devices,
            loading: self.loading.active_keys(),
            recent_errors: self.reporter.recent(self.recent_errors),
        }
    }

    pub fn device_detail(&self, device_id: &str) -> Option<DeviceDetailSnapshot> {
        let store = self.store.borrow();
        let device = store.get_device_data(device_id)?;
        Some(DeviceDetailSnapshot::new(
            device,
            store.get_sorted_channels(device_id),
        ))
    }
}

fn summarize(store: &DeviceStore, feed_connected: bool) -> DeviceSummary {
    DeviceSummary {
        device_count: store.device_count(),
        alarm_count: store.alarm_device_count(),
        normal_count: store.normal_device_count(),
        channel_count: store.channel_count(),
        feed_connected,
    }
}

pub(crate) fn markers(store: &DeviceStore) -> Vec<MarkerSnapshot> {
    let mut markers: Vec<MarkerSnapshot> = store.devices().map(MarkerSnapshot::from_device).collect();
    markers.sort_by(|a, b| a.device_id.cmp(&b.device_id));
    markers
}
