//! Observability for devmon.
//!
//! - Prometheus metrics for the feed, the device store and the REST client
//! - Structured logging with tracing (JSON in production)
//! - `ErrorReporter`: fault history and user-facing notifications
//! - `LoadingTracker`: named loading states for the presentation surface

pub mod error;
pub mod loading;
pub mod logging;
pub mod metrics;
pub mod reporter;

pub use error::{TelemetryError, TelemetryResult};
pub use loading::{LoadingGuard, LoadingState, LoadingTracker, DEFAULT_LOADING_MESSAGE};
pub use logging::init_logging;
pub use metrics::Metrics;
pub use reporter::{ErrorReporter, FaultRecord, Notification, NotificationLevel};
