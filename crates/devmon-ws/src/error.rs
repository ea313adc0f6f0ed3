//! Feed transport error types.

use devmon_core::FaultKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed: code={code}, reason={reason}")]
    ConnectionClosed { code: u16, reason: String },

    #[error("Max reconnection attempts reached ({0})")]
    MaxReconnectAttempts(u32),

    #[error("Server timeout: nothing received for {0}ms")]
    ServerTimeout(u64),

    #[error("Message parse error: {0}")]
    ParseError(String),

    #[error("Tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WsError {
    /// Reporting class of this error.
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::ParseError(_) | Self::Json(_) => FaultKind::Parse,
            _ => FaultKind::Transport,
        }
    }
}

pub type WsResult<T> = Result<T, WsError>;
