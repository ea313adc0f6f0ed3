//! REST backend client for devmon.
//!
//! Fetches the device list, device details and device status from the
//! backend HTTP API. Failures are returned to the caller, never retried.

pub mod client;
pub mod error;
pub mod types;

pub use client::{unwrap_envelope, DeviceApiClient, DEFAULT_TIMEOUT};
pub use error::{ApiError, ApiResult};
pub use types::DeviceInfo;
