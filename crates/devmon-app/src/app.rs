//! Main application orchestration.
//!
//! One task owns the [`DeviceStore`]. Feed events arrive over an mpsc
//! channel, are parsed and applied to the store, and a copy of the store is
//! published through a `watch` channel at most once per publish interval.

use crate::config::AppConfig;
use crate::error::AppResult;
use devmon_api::{DeviceApiClient, DeviceInfo};
use devmon_core::FaultKind;
use devmon_dashboard::DashboardState;
use devmon_feed::{DeviceStore, MessageParser};
use devmon_telemetry::{loading::keys, ErrorReporter, LoadingTracker, Metrics};
use devmon_ws::{FeedClient, FeedConfig, FeedEvent, FeedFaultKind};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

/// Main application.
pub struct Application {
    config: AppConfig,
    store: DeviceStore,
    parser: MessageParser,
    reporter: ErrorReporter,
    loading: LoadingTracker,
    store_tx: watch::Sender<DeviceStore>,
    feed_tx: watch::Sender<bool>,
    shutdown: CancellationToken,
    /// Store changed since the last publication.
    dirty: bool,
}

impl Application {
    /// Create the application. Fails when required configuration is missing.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;

        let parser = MessageParser::with_method(config.feed.method.clone())
            .with_device_filter(config.feed.device_filter.iter().cloned());
        let (store_tx, _) = watch::channel(DeviceStore::new());
        let (feed_tx, _) = watch::channel(false);

        Ok(Self {
            config,
            store: DeviceStore::new(),
            parser,
            reporter: ErrorReporter::new(),
            loading: LoadingTracker::new(),
            store_tx,
            feed_tx,
            shutdown: CancellationToken::new(),
            dirty: false,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &DeviceStore {
        &self.store
    }

    pub fn parser(&self) -> &MessageParser {
        &self.parser
    }

    pub fn reporter(&self) -> &ErrorReporter {
        &self.reporter
    }

    pub fn loading(&self) -> &LoadingTracker {
        &self.loading
    }

    /// Token that stops `run()` when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Receiver of published store snapshots.
    pub fn subscribe_store(&self) -> watch::Receiver<DeviceStore> {
        self.store_tx.subscribe()
    }

    /// Receiver of the feed connection flag.
    pub fn subscribe_feed_status(&self) -> watch::Receiver<bool> {
        self.feed_tx.subscribe()
    }

    /// Read-only view for the dashboard.
    pub fn dashboard_state(&self) -> DashboardState {
        DashboardState::new(
            self.subscribe_store(),
            self.subscribe_feed_status(),
            self.reporter.clone(),
            self.loading.clone(),
        )
        .with_recent_errors(self.config.dashboard.recent_errors)
    }

    /// Apply one feed event.
    pub fn handle_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Connected => {
                info!("Feed connected");
                Metrics::feed_connected();
                self.feed_tx.send_replace(true);
            }
            FeedEvent::Disconnected { reason } => {
                warn!(%reason, "Feed disconnected");
                Metrics::feed_disconnected();
                Metrics::feed_reconnect("disconnected");
                self.feed_tx.send_replace(false);
                self.reporter
                    .report(FaultKind::Transport, "Real-time connection lost", Some(reason));
            }
            FeedEvent::Invocation(invocation) => match self.parser.parse_invocation(&invocation) {
                Ok(Some(message)) => {
                    Metrics::feed_message(message.payload.kind());
                    if self.store.update_device_data(&message) {
                        self.dirty = true;
                    }
                }
                Ok(None) => {
                    trace!(method = %invocation.target, "Invocation ignored");
                }
                Err(e) => {
                    self.reporter
                        .report(e.kind(), "Dropped feed message", Some(e.to_string()));
                }
            },
            FeedEvent::Fault(fault) => {
                if fault.kind == FeedFaultKind::Connection {
                    Metrics::feed_reconnect("connect_failed");
                }
                self.reporter.report(fault.fault_kind(), fault.message, None);
            }
        }
    }

    /// Publish the store if it changed. Returns whether anything was sent.
    pub fn publish(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;

        Metrics::device_counts(
            self.store.alarm_device_count(),
            self.store.normal_device_count(),
            self.store.channel_count(),
        );
        self.store_tx.send_replace(self.store.clone());
        debug!(
            devices = self.store.device_count(),
            channels = self.store.channel_count(),
            "Store published"
        );
        true
    }

    /// Fetch the device catalog from the REST backend.
    ///
    /// Failures are reported and yield `None`; they never stop the service.
    pub async fn load_device_list(
        api: &DeviceApiClient,
        loading: &LoadingTracker,
        reporter: &ErrorReporter,
    ) -> Option<Vec<DeviceInfo>> {
        let result = loading
            .with_loading(keys::API, Some("Loading device list"), api.get_device_list())
            .await;

        match result {
            Ok(devices) => {
                Metrics::api_request("device_list", true);
                info!(count = devices.len(), "Device list loaded");
                Some(devices)
            }
            Err(e) => {
                Metrics::api_request("device_list", false);
                let message = e.user_message().unwrap_or("Failed to load device list");
                reporter.report(e.kind(), message, Some(e.to_string()));
                None
            }
        }
    }

    /// Run until Ctrl-C or the shutdown token is cancelled.
    pub async fn run(mut self) -> AppResult<()> {
        info!(
            api_base_url = %self.config.api_base_url,
            feed_url = %self.config.feed.url,
            "Starting application"
        );

        let api =
            DeviceApiClient::with_timeout(&self.config.api_base_url, self.config.api_timeout())?;
        let api_handle = {
            let loading = self.loading.clone();
            let reporter = self.reporter.clone();
            tokio::spawn(async move {
                Self::load_device_list(&api, &loading, &reporter).await;
            })
        };

        let (event_tx, mut event_rx) =
            mpsc::channel::<FeedEvent>(self.config.event_capacity.max(1));
        let feed = if self.config.feed_enabled() {
            let client = Arc::new(FeedClient::new(FeedConfig::from(&self.config.feed), event_tx));
            Some((client.clone(), self.spawn_feed(client)))
        } else {
            warn!("Feed URL not configured, running without real-time updates");
            drop(event_tx);
            None
        };

        let dashboard_handle = self.spawn_dashboard();

        info!("Entering main event loop");
        let mut feed_open = feed.is_some();
        let mut publish_interval = tokio::time::interval(self.config.publish_interval());
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                event = event_rx.recv(), if feed_open => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        warn!("Feed stopped, no further updates will arrive");
                        feed_open = false;
                        self.feed_tx.send_replace(false);
                    }
                },
                _ = publish_interval.tick() => {
                    self.publish();
                }
                () = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = &mut ctrl_c => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        self.shutdown.cancel();
        if let Some((client, handle)) = feed {
            client.shutdown();
            if let Err(e) = handle.await {
                warn!(error = %e, "Feed task ended abnormally");
            }
        }
        api_handle.abort();
        if let Some(handle) = dashboard_handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Dashboard task ended abnormally");
            }
        }

        self.publish();
        info!(
            devices = self.store.device_count(),
            faults = self.reporter.len(),
            "Shutdown complete"
        );
        Ok(())
    }

    fn spawn_feed(&self, client: Arc<FeedClient>) -> JoinHandle<()> {
        let reporter = self.reporter.clone();
        tokio::spawn(async move {
            if let Err(e) = client.connect().await {
                error!(error = %e, "Feed connection abandoned");
                reporter.report_error(e.kind(), &e);
            }
        })
    }

    fn spawn_dashboard(&self) -> Option<JoinHandle<()>> {
        if !self.config.dashboard.enabled {
            info!("Dashboard disabled");
            return None;
        }
        let state = self.dashboard_state();
        let config = self.config.dashboard.clone();
        let shutdown = self.shutdown.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = devmon_dashboard::run_server(state, config, shutdown).await {
                error!(error = %e, "Dashboard server failed");
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use devmon_core::DeviceStatus;
    use devmon_ws::{FeedFault, HubInvocation};
    use serde_json::json;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.map_ak = "key".to_string();
        config.api_base_url = "http://127.0.0.1:1/api".to_string();
        config
    }

    fn telemetry(device: &str, channel: &str, state: u8) -> FeedEvent {
        FeedEvent::Invocation(HubInvocation::new(
            "ReceiveMessage",
            vec![
                json!(device),
                json!({
                    "channel": channel,
                    "address": "Hall 2",
                    "lon": 121.47,
                    "lat": 31.23,
                    "power": 3.5,
                    "state": state,
                }),
            ],
        ))
    }

    #[test]
    fn test_new_requires_config() {
        let err = Application::new(AppConfig::default()).err().unwrap();
        assert!(matches!(err, AppError::MissingConfig(ref keys) if keys.len() == 2));
    }

    #[test]
    fn test_invocations_update_store() {
        let mut app = Application::new(test_config()).unwrap();
        app.handle_event(telemetry("D1", "A", 0));
        app.handle_event(telemetry("D1", "B", 1));

        assert_eq!(app.store().get_device_status("D1"), DeviceStatus::Alarm);
        assert_eq!(app.store().channel_count(), 2);
        assert_eq!(app.parser().stats().accepted(), 2);
    }

    #[test]
    fn test_publish_only_when_dirty() {
        let mut app = Application::new(test_config()).unwrap();
        let mut rx = app.subscribe_store();
        assert!(!app.publish());

        app.handle_event(telemetry("D1", "A", 1));
        assert!(app.publish());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().alarm_device_count(), 1);

        assert!(!app.publish());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn test_bad_invocation_is_reported() {
        let mut app = Application::new(test_config()).unwrap();
        app.handle_event(FeedEvent::Invocation(HubInvocation::new(
            "ReceiveMessage",
            vec![json!("D1"), json!({"channel": "A", "lon": 500.0, "lat": 0.0, "state": 0})],
        )));
        app.handle_event(FeedEvent::Invocation(HubInvocation::new(
            "ReceiveMessage",
            vec![json!("D1")],
        )));

        assert_eq!(app.store().device_count(), 0);
        let kinds: Vec<FaultKind> = app.reporter().history().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![FaultKind::Parse, FaultKind::Validation]);
    }

    #[test]
    fn test_other_targets_ignored() {
        let mut app = Application::new(test_config()).unwrap();
        app.handle_event(FeedEvent::Invocation(HubInvocation::new(
            "Heartbeat",
            vec![json!("D1")],
        )));
        assert_eq!(app.store().device_count(), 0);
        assert!(app.reporter().is_empty());
    }

    #[test]
    fn test_connection_events_update_status() {
        let mut app = Application::new(test_config()).unwrap();
        let rx = app.subscribe_feed_status();

        app.handle_event(FeedEvent::Connected);
        assert!(*rx.borrow());

        app.handle_event(FeedEvent::Disconnected {
            reason: "closed".to_string(),
        });
        assert!(!*rx.borrow());

        app.handle_event(FeedEvent::Fault(FeedFault::new(
            FeedFaultKind::Connection,
            "refused",
        )));
        let history = app.reporter().history();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|r| r.kind == FaultKind::Transport));
    }

    #[test]
    fn test_dashboard_state_sees_published_store() {
        let mut app = Application::new(test_config()).unwrap();
        let dashboard = app.dashboard_state();
        app.handle_event(telemetry("D7", "A", 0));
        assert_eq!(dashboard.summary().device_count, 0);

        app.publish();
        assert_eq!(dashboard.summary().device_count, 1);
        assert_eq!(dashboard.markers()[0].device_id, "D7");
    }

    #[test]
    fn test_device_filter_from_config() {
        let mut config = test_config();
        config.feed.device_filter = vec!["GW".to_string()];
        let mut app = Application::new(config).unwrap();

        app.handle_event(telemetry("GW-01", "A", 0));
        app.handle_event(telemetry("XX-01", "A", 0));
        assert_eq!(app.store().device_ids(), vec!["GW-01"]);
        assert_eq!(app.parser().stats().filtered(), 1);
    }

    #[tokio::test]
    async fn test_device_list_failure_is_reported() {
        let api = DeviceApiClient::with_timeout(
            "http://127.0.0.1:1/api",
            std::time::Duration::from_secs(1),
        )
        .unwrap();
        let loading = LoadingTracker::new();
        let reporter = ErrorReporter::new();

        let devices = Application::load_device_list(&api, &loading, &reporter).await;
        assert!(devices.is_none());
        assert!(!loading.is_loading(keys::API));
        assert_eq!(reporter.history()[0].kind, FaultKind::Network);
    }
}
