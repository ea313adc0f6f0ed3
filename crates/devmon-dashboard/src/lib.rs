//! devmon-dashboard - read surface for the device monitor.
//!
//! Serves the published device store to presentation clients:
//!
//! - `GET /api/snapshot`: summary, map markers, loading keys, recent faults
//! - `GET /api/devices/{id}`: one device with channels, alarms first
//! - `GET /metrics`: Prometheus text exposition
//! - `GET /ws`: snapshot on connect, then periodic updates and fault alerts
//!
//! # Usage
//!
//! ```ignore
//! use devmon_dashboard::{run_server, DashboardConfig, DashboardState};
//!
//! let state = DashboardState::new(store_rx, feed_rx, reporter.clone(), loading.clone());
//! tokio::spawn(async move {
//!     if let Err(e) = run_server(state, DashboardConfig::default(), shutdown).await {
//!         tracing::error!(error = %e, "Dashboard server failed");
//!     }
//! });
//! ```

mod broadcast;
mod config;
mod server;
mod state;
mod types;

pub use config::DashboardConfig;
pub use server::{create_router, run_server, ClientSlots, ServerState};
pub use state::DashboardState;
pub use types::{
    DashboardMessage, DashboardSnapshot, DeviceDetailSnapshot, DeviceSummary, MarkerSnapshot,
};
