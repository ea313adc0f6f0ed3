//! Feed error types.

use devmon_core::{CoreError, FaultKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FeedError {
    /// Reporting class of this error.
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::InvalidData(_) => FaultKind::Validation,
            Self::ParseError(_) | Self::Json(_) => FaultKind::Parse,
        }
    }
}

impl From<CoreError> for FeedError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Json(e) => Self::Json(e),
            other => Self::InvalidData(other.to_string()),
        }
    }
}

pub type FeedResult<T> = Result<T, FeedError>;
