//! Error types for devmon-core.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid coordinate: lng={lng}, lat={lat}")]
    InvalidCoordinate { lng: f64, lat: f64 },

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Classification of a fault for logging and user notification.
///
/// Every crate maps its own error enum onto one of these kinds before the
/// fault is handed to the error reporter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Request never reached the backend or the response never came back.
    Network,
    /// Backend answered with a non-success business code or HTTP status.
    Api,
    /// Push-feed connection failed, dropped or timed out.
    Transport,
    /// A push-feed message could not be decoded.
    Parse,
    /// A decoded value failed a domain check (e.g. coordinates out of range).
    Validation,
    /// Anything else.
    Unknown,
}

impl FaultKind {
    /// All kinds, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Network,
        Self::Api,
        Self::Transport,
        Self::Parse,
        Self::Validation,
        Self::Unknown,
    ];

    /// Stable lowercase label (used for metric labels and logs).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Api => "api",
            Self::Transport => "transport",
            Self::Parse => "parse",
            Self::Validation => "validation",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_kind_labels_unique() {
        let mut labels: Vec<_> = FaultKind::ALL.iter().map(FaultKind::as_str).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), FaultKind::ALL.len());
    }

    #[test]
    fn test_fault_kind_serde() {
        let json = serde_json::to_string(&FaultKind::Transport).unwrap();
        assert_eq!(json, "\"transport\"");
    }
}
