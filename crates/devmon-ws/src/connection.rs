//! Feed connection manager.
//!
//! Handles the connection lifecycle: fixed-interval reconnection, keepalive,
//! hub frame decoding and event delivery to the consumer.

use crate::error::{WsError, WsResult};
use crate::heartbeat::HeartbeatManager;
use crate::message::{split_records, HubInvocation, HubMessage};
use devmon_core::FaultKind;
use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async_tls_with_config, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Feed connection configuration.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Hub WebSocket URL.
    pub url: String,
    /// Consecutive failed attempts before giving up (0 = unlimited).
    pub max_reconnect_attempts: u32,
    /// Fixed delay between attempts.
    pub retry_delay_ms: u64,
    /// Send a ping after this long without sending anything.
    pub keepalive_interval_ms: u64,
    /// Treat the connection as dead after this long without receiving.
    pub server_timeout_ms: u64,
    /// How long to wait on a full event channel before dropping an event.
    pub delivery_timeout_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_reconnect_attempts: 0,
            retry_delay_ms: 5000,
            keepalive_interval_ms: 60000,
            server_timeout_ms: 120000,
            delivery_timeout_ms: 1000,
        }
    }
}

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Adapter-level failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFaultKind {
    /// An attempt that never connected.
    Connection,
    /// Undecodable hub record.
    Parse,
    /// Event could not be handed to the consumer in time.
    Delivery,
}

/// A non-fatal adapter failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedFault {
    pub kind: FeedFaultKind,
    pub message: String,
}

impl FeedFault {
    pub fn new(kind: FeedFaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Reporting class of this fault.
    pub fn fault_kind(&self) -> FaultKind {
        match self.kind {
            FeedFaultKind::Parse => FaultKind::Parse,
            FeedFaultKind::Connection | FeedFaultKind::Delivery => FaultKind::Transport,
        }
    }
}

impl fmt::Display for FeedFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

/// Events delivered to the consumer.
///
/// Each failure yields one event: `Disconnected` when an established
/// session ends, `Fault(Connection)` when an attempt never connected.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Connected,
    Disconnected { reason: String },
    Invocation(HubInvocation),
    Fault(FeedFault),
}

/// Push-feed client.
///
/// `connect()` runs until shutdown or until the attempt limit is reached.
/// Share it behind an `Arc` to call `shutdown()` from another task.
pub struct FeedClient {
    config: FeedConfig,
    state: Arc<RwLock<ConnectionState>>,
    heartbeat: Arc<HeartbeatManager>,
    event_tx: mpsc::Sender<FeedEvent>,
    /// Consecutive failed attempts; reset on every successful connect.
    reconnect_count: AtomicU32,
    shutdown_token: CancellationToken,
}

impl FeedClient {
    pub fn new(config: FeedConfig, event_tx: mpsc::Sender<FeedEvent>) -> Self {
        let heartbeat =
            HeartbeatManager::new(config.keepalive_interval_ms, config.server_timeout_ms);
        Self {
            config,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            heartbeat: Arc::new(heartbeat),
            event_tx,
            reconnect_count: AtomicU32::new(0),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Consecutive failed attempts since the last successful connect.
    pub fn reconnect_count(&self) -> u32 {
        self.reconnect_count.load(Ordering::Relaxed)
    }

    /// Signal shutdown.
    ///
    /// Cancels an in-flight connection attempt, the message loop, or a
    /// pending retry delay.
    pub fn shutdown(&self) {
        info!("FeedClient shutdown requested");
        self.shutdown_token.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Connect to the hub and run the message loop, reconnecting as needed.
    pub async fn connect(&self) -> WsResult<()> {
        self.connect_with_retry().await
    }

    /// Delay before the next attempt; fixed, no backoff.
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.config.retry_delay_ms)
    }

    async fn connect_with_retry(&self) -> WsResult<()> {
        loop {
            if self.is_shutdown() {
                info!("Shutdown requested, exiting connect loop");
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            *self.state.write() = ConnectionState::Connecting;

            let result = self.try_connect().await;
            let was_connected = self.state() == ConnectionState::Connected;

            let reason = match &result {
                Ok(()) => {
                    info!("Feed connection closed");
                    "connection closed".to_string()
                }
                Err(e) => {
                    error!(error = %e, "Feed connection error");
                    e.to_string()
                }
            };
            if was_connected {
                self.emit(FeedEvent::Disconnected {
                    reason: reason.clone(),
                })
                .await;
            }
            // A dropped session is already announced by `Disconnected`.
            if result.is_err() && !was_connected && !self.is_shutdown() {
                self.emit(FeedEvent::Fault(FeedFault::new(
                    FeedFaultKind::Connection,
                    reason,
                )))
                .await;
            }

            if self.is_shutdown() {
                info!("Shutdown requested after disconnect, not reconnecting");
                *self.state.write() = ConnectionState::Disconnected;
                return Ok(());
            }

            let attempt = self.reconnect_count.fetch_add(1, Ordering::Relaxed) + 1;
            if self.config.max_reconnect_attempts > 0
                && attempt >= self.config.max_reconnect_attempts
            {
                error!(attempt, "Max reconnection attempts reached");
                *self.state.write() = ConnectionState::Disconnected;
                return Err(WsError::MaxReconnectAttempts(attempt));
            }

            *self.state.write() = ConnectionState::Reconnecting;

            let delay = self.retry_delay();
            warn!(attempt, delay_ms = delay.as_millis() as u64, "Reconnecting");

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown requested during retry delay, exiting");
                    *self.state.write() = ConnectionState::Disconnected;
                    return Ok(());
                }
            }
        }
    }

    async fn try_connect(&self) -> WsResult<()> {
        info!(url = %self.config.url, "Connecting to feed hub");

        // TCP_NODELAY on
        let (ws_stream, _response) = tokio::select! {
            res = connect_async_tls_with_config(&self.config.url, None, true, None) => res?,
            () = self.shutdown_token.cancelled() => {
                info!("Shutdown requested while connecting");
                return Ok(());
            }
        };
        let (mut write, mut read) = ws_stream.split();

        *self.state.write() = ConnectionState::Connected;
        self.reconnect_count.store(0, Ordering::Relaxed);
        self.heartbeat.reset();
        info!("Feed hub connected");
        self.emit(FeedEvent::Connected).await;

        let mut check = tokio::time::interval(self.heartbeat.check_interval());
        check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // First tick completes immediately.
        check.tick().await;

        loop {
            tokio::select! {
                () = self.shutdown_token.cancelled() => {
                    info!("Shutdown signal received in message loop");
                    if let Err(e) = write.send(Message::Close(None)).await {
                        warn!(error = %e, "Failed to send Close frame during shutdown");
                    }
                    return Ok(());
                }

                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.heartbeat.record_received();
                            self.handle_text_frame(&text).await?;
                        }
                        Some(Ok(Message::Binary(data))) => {
                            self.heartbeat.record_received();
                            match String::from_utf8(data) {
                                Ok(text) => self.handle_text_frame(&text).await?,
                                Err(e) => {
                                    self.report_parse_fault(format!("binary frame is not UTF-8: {e}"))
                                        .await;
                                }
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            self.heartbeat.record_received();
                            debug!("Received ping, sending pong");
                            write.send(Message::Pong(data)).await?;
                            self.heartbeat.record_sent();
                        }
                        Some(Ok(Message::Pong(_))) => {
                            debug!("Received pong");
                            self.heartbeat.record_received();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let (code, reason) = frame
                                .map(|f| (f.code.into(), f.reason.to_string()))
                                .unwrap_or((1000, "Normal close".to_string()));
                            warn!(code, %reason, "Feed hub closed the connection");
                            return Err(WsError::ConnectionClosed { code, reason });
                        }
                        Some(Ok(Message::Frame(_))) => {
                            self.heartbeat.record_received();
                        }
                        Some(Err(e)) => {
                            error!(error = %e, "Feed read error");
                            return Err(e.into());
                        }
                        None => {
                            warn!("Feed stream ended");
                            return Ok(());
                        }
                    }
                }

                _ = check.tick() => {
                    if self.heartbeat.is_timed_out() {
                        let timeout_ms = self.heartbeat.server_timeout_ms();
                        error!(timeout_ms, "Feed server timeout");
                        return Err(WsError::ServerTimeout(timeout_ms));
                    }
                    if self.heartbeat.should_send_keepalive() {
                        write.send(Message::Ping(Vec::new())).await?;
                        self.heartbeat.record_sent();
                        debug!("Sent keepalive ping");
                    }
                }
            }
        }
    }

    /// Decode every record in a frame. Undecodable records are reported
    /// and skipped; a close record ends the connection.
    async fn handle_text_frame(&self, text: &str) -> WsResult<()> {
        for record in split_records(text) {
            match HubMessage::parse_record(record) {
                Ok(HubMessage::Invocation(invocation)) => {
                    debug!(
                        method = %invocation.target,
                        args = invocation.arguments.len(),
                        "Hub invocation"
                    );
                    self.emit(FeedEvent::Invocation(invocation)).await;
                }
                Ok(HubMessage::Ping) => {
                    debug!("Hub keepalive");
                }
                Ok(HubMessage::Close { error }) => {
                    let reason = error.unwrap_or_else(|| "hub requested close".to_string());
                    warn!(%reason, "Hub close record received");
                    return Err(WsError::ConnectionClosed { code: 1000, reason });
                }
                Ok(HubMessage::Other(value)) => {
                    debug!(record = %value, "Ignoring hub record");
                }
                Err(e) => {
                    self.report_parse_fault(e.to_string()).await;
                }
            }
        }
        Ok(())
    }

    async fn report_parse_fault(&self, message: String) {
        warn!(error = %message, "Malformed hub record");
        self.emit(FeedEvent::Fault(FeedFault::new(FeedFaultKind::Parse, message)))
            .await;
    }

    /// Hand an event to the consumer.
    ///
    /// Waits at most `delivery_timeout_ms` on a full channel, then drops the
    /// event and tries to flag a delivery fault instead.
    async fn emit(&self, event: FeedEvent) {
        let timeout = Duration::from_millis(self.config.delivery_timeout_ms);
        match tokio::time::timeout(timeout, self.event_tx.send(event)).await {
            Ok(Ok(())) => {}
            Ok(Err(_)) => {
                warn!("Feed event receiver dropped");
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.delivery_timeout_ms,
                    "Feed event delivery timed out, event dropped"
                );
                let fault = FeedFault::new(
                    FeedFaultKind::Delivery,
                    format!(
                        "consumer did not accept event within {}ms",
                        self.config.delivery_timeout_ms
                    ),
                );
                if self.event_tx.try_send(FeedEvent::Fault(fault)).is_err() {
                    debug!("Delivery fault could not be queued");
                }
            }
        }
    }
}
