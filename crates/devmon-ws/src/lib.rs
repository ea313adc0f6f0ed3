//! Push-feed adapter for devmon.
//!
//! Maintains a WebSocket connection to the telemetry hub and relays hub
//! invocations to a single consumer over an mpsc channel:
//! - Fixed-interval reconnection, bounded or unlimited attempts
//! - Keepalive pings and server-timeout detection
//! - Connection/parse/delivery faults reported as events, never fatal
//! - Cancellable by explicit shutdown, including during retry delays

pub mod connection;
pub mod error;
pub mod heartbeat;
pub mod message;

pub use connection::{
    ConnectionState, FeedClient, FeedConfig, FeedEvent, FeedFault, FeedFaultKind,
};
pub use error::{WsError, WsResult};
pub use heartbeat::HeartbeatManager;
pub use message::{encode_invocation, split_records, HubInvocation, HubMessage, RECORD_SEPARATOR};

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any `wss://` connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
