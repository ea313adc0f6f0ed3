//! devmon - device monitoring service.
//!
//! Orchestrates the components:
//! - Push-feed connection (`devmon-ws`)
//! - Invocation parsing and the device/channel store (`devmon-feed`)
//! - Device catalog from the REST backend (`devmon-api`)
//! - Dashboard read surface (`devmon-dashboard`)

pub mod app;
pub mod config;
pub mod error;

pub use app::Application;
pub use config::{AppConfig, FeedSection};
pub use error::{AppError, AppResult};
