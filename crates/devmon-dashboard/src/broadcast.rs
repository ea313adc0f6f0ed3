//! WebSocket broadcast.
//!
//! Pushes a summary at a fixed interval, the full marker list only when
//! the published store changed, and one alert per newly reported fault.

use std::time::Duration;

use chrono::Utc;
use devmon_telemetry::Notification;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::state::{markers, DashboardState};
use crate::types::DashboardMessage;

/// Run the broadcaster until `shutdown` is cancelled.
pub async fn run_broadcaster(
    state: DashboardState,
    tx: broadcast::Sender<String>,
    every: Duration,
    shutdown: CancellationToken,
) {
    let mut interval = tokio::time::interval(every);
    let mut store_rx = state.store_receiver();
    let mut last_seq = state.reporter().last_seq();

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            () = shutdown.cancelled() => {
                debug!("Dashboard broadcaster stopped");
                return;
            }
        }

        let fresh = state.reporter().since(last_seq);
        if let Some(newest) = fresh.last() {
            last_seq = newest.seq;
        }
        for fault in fresh {
            let msg = DashboardMessage::Alert {
                timestamp_ms: fault.timestamp.timestamp_millis(),
                notification: Notification::for_fault(fault.kind, &fault.message),
                fault,
            };
            send(&tx, &msg);
        }

        let devices = match store_rx.has_changed() {
            Ok(true) => Some(markers(&store_rx.borrow_and_update())),
            _ => None,
        };
        let msg = DashboardMessage::Update {
            timestamp_ms: Utc::now().timestamp_millis(),
            summary: state.summary(),
            devices,
            loading: state.loading_keys(),
        };
        send(&tx, &msg);
    }
}

fn send(tx: &broadcast::Sender<String>, msg: &DashboardMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => match tx.send(json) {
            Ok(n) => trace!(receivers = n, "Broadcast update sent"),
            // No clients connected
            Err(_) => trace!("No WebSocket receivers connected"),
        },
        Err(e) => debug!(error = %e, "Failed to serialize dashboard message"),
    }
}
