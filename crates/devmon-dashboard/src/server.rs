//! axum routes and the WebSocket push loop.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use devmon_telemetry::Metrics;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::config::DashboardConfig;
use crate::state::DashboardState;
use crate::types::{DashboardMessage, DashboardSnapshot, DeviceDetailSnapshot};

/// Bounded pool of WebSocket client slots.
pub struct ClientSlots {
    taken: AtomicUsize,
    limit: usize,
}

impl ClientSlots {
    pub fn new(limit: usize) -> Self {
        Self {
            taken: AtomicUsize::new(0),
            limit,
        }
    }

    /// Claim a slot. `None` when all are taken.
    pub fn claim(self: &Arc<Self>) -> Option<ClientSlot> {
        self.taken
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .ok()?;
        Metrics::dashboard_client_connected();
        Some(ClientSlot {
            slots: Arc::clone(self),
        })
    }

    pub fn in_use(&self) -> usize {
        self.taken.load(Ordering::Relaxed)
    }
}

/// A claimed slot; released on drop.
pub struct ClientSlot {
    slots: Arc<ClientSlots>,
}

impl Drop for ClientSlot {
    fn drop(&mut self) {
        self.slots.taken.fetch_sub(1, Ordering::AcqRel);
        Metrics::dashboard_client_disconnected();
    }
}

/// State shared by every handler.
#[derive(Clone)]
pub struct ServerState {
    view: DashboardState,
    updates: broadcast::Sender<String>,
    slots: Arc<ClientSlots>,
}

impl ServerState {
    pub fn new(
        view: DashboardState,
        updates: broadcast::Sender<String>,
        config: &DashboardConfig,
    ) -> Self {
        Self {
            view,
            updates,
            slots: Arc::new(ClientSlots::new(config.max_connections)),
        }
    }
}

pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/api/snapshot", get(snapshot))
        .route("/api/devices/{id}", get(device_detail))
        .route("/metrics", get(metrics))
        .route("/ws", get(upgrade))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn snapshot(State(state): State<ServerState>) -> Json<DashboardSnapshot> {
    Json(state.view.collect_snapshot())
}

/// One device with its channels, alarm channels first.
async fn device_detail(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> Result<Json<DeviceDetailSnapshot>, StatusCode> {
    state
        .view
        .device_detail(&id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn metrics() -> Response {
    match Metrics::gather_text() {
        Ok(body) => ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body).into_response(),
        Err(e) => {
            warn!(error = %e, "Metrics encoding failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn upgrade(State(state): State<ServerState>, ws: WebSocketUpgrade) -> Response {
    let Some(slot) = state.slots.claim() else {
        warn!(limit = state.slots.limit, "Dashboard client rejected, no free slot");
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many connections").into_response();
    };
    info!(clients = state.slots.in_use(), "Dashboard client connected");
    ws.on_upgrade(move |socket| serve_client(socket, state, slot))
}

/// Snapshot first, then every broadcast until either side goes away.
async fn serve_client(socket: WebSocket, state: ServerState, _slot: ClientSlot) {
    let (mut outgoing, mut incoming) = socket.split();
    // Subscribed before the snapshot so nothing falls in between.
    let mut updates = state.updates.subscribe();

    let hello = DashboardMessage::Snapshot(state.view.collect_snapshot());
    match serde_json::to_string(&hello) {
        Ok(text) => {
            if outgoing.send(Message::Text(text.into())).await.is_err() {
                debug!("Dashboard client left before the snapshot");
                return;
            }
        }
        Err(e) => warn!(error = %e, "Snapshot serialization failed"),
    }

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(text) => {
                    if outgoing.send(Message::Text(text.into())).await.is_err() {
                        debug!("Dashboard client write failed");
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Dashboard client is behind, skipping updates");
                }
                Err(RecvError::Closed) => break,
            },
            // Pings are answered by axum; only an end of stream matters here.
            frame = incoming.next() => match frame {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    debug!("Dashboard client disconnected");
}

/// Serve the dashboard until `shutdown` is cancelled.
pub async fn run_server(
    view: DashboardState,
    config: DashboardConfig,
    shutdown: CancellationToken,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Per-client backlog before a slow client starts skipping.
    let (updates, _) = broadcast::channel::<String>(32);

    tokio::spawn(crate::broadcast::run_broadcaster(
        view.clone(),
        updates.clone(),
        config.update_interval(),
        shutdown.clone(),
    ));

    let app = create_router(ServerState::new(view, updates, &config));
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Dashboard listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    info!("Dashboard stopped");
    Ok(())
}
