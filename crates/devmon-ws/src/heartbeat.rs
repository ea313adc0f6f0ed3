//! Keepalive management for the feed connection.
//!
//! Sends a ping when the client has been quiet for the keepalive interval
//! and declares the server dead when nothing has arrived for the server
//! timeout.

use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tracing::debug;

/// Keepalive and server-timeout tracker.
pub struct HeartbeatManager {
    keepalive_interval: Duration,
    server_timeout: Duration,
    /// Last frame of any kind received from the server.
    last_received: RwLock<Instant>,
    /// Last frame sent by us.
    last_sent: RwLock<Instant>,
}

impl HeartbeatManager {
    pub fn new(keepalive_interval_ms: u64, server_timeout_ms: u64) -> Self {
        let now = Instant::now();
        Self {
            keepalive_interval: Duration::from_millis(keepalive_interval_ms),
            server_timeout: Duration::from_millis(server_timeout_ms),
            last_received: RwLock::new(now),
            last_sent: RwLock::new(now),
        }
    }

    /// Reset timers (called on connection).
    pub fn reset(&self) {
        let now = Instant::now();
        *self.last_received.write() = now;
        *self.last_sent.write() = now;
    }

    /// Record that a frame was received.
    pub fn record_received(&self) {
        *self.last_received.write() = Instant::now();
    }

    /// Record that a keepalive (or any frame) was sent.
    pub fn record_sent(&self) {
        *self.last_sent.write() = Instant::now();
        debug!("Recorded keepalive sent");
    }

    pub fn time_since_last_received(&self) -> Duration {
        self.last_received.read().elapsed()
    }

    /// True once the server has been silent longer than the timeout.
    pub fn is_timed_out(&self) -> bool {
        self.time_since_last_received() > self.server_timeout
    }

    /// True when we have been quiet for a full keepalive interval.
    pub fn should_send_keepalive(&self) -> bool {
        self.last_sent.read().elapsed() >= self.keepalive_interval
    }

    /// How often the connection loop should evaluate the timers.
    pub fn check_interval(&self) -> Duration {
        let half = self.keepalive_interval.min(self.server_timeout) / 2;
        half.max(Duration::from_millis(1))
    }

    pub fn server_timeout_ms(&self) -> u64 {
        self.server_timeout.as_millis() as u64
    }
}
