//! Device state aggregation for devmon.
//!
//! Merges per-channel telemetry from the push feed into a per-device
//! view: aggregate alarm status, position, address and update times.

pub mod device_state;
pub mod error;
pub mod parser;

pub use device_state::{Channel, Device, DeviceStore};
pub use error::{FeedError, FeedResult};
pub use parser::{MessageParser, ParseStats, RECEIVE_METHOD};
