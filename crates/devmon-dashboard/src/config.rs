//! Dashboard configuration.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

/// Dashboard server settings. Missing keys take their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub enabled: bool,
    /// Interface to bind; all interfaces by default.
    pub bind_address: IpAddr,
    pub port: u16,
    /// Push cadence for connected WebSocket clients (ms).
    pub update_interval_ms: u64,
    /// Concurrent WebSocket clients; further upgrades get 503.
    pub max_connections: usize,
    /// Faults included in each snapshot.
    pub recent_errors: usize,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            update_interval_ms: 1000,
            max_connections: 32,
            recent_errors: 10,
        }
    }
}

impl DashboardConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_address, self.port)
    }

    /// Push cadence, never zero.
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms.max(1))
    }
}
