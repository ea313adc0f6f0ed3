//! API client error types.

use devmon_core::FaultKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid base URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("API error (code {code}): {message}")]
    Business { code: i64, message: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ApiError {
    /// Reporting class of this error.
    pub fn kind(&self) -> FaultKind {
        match self {
            Self::Network(_) => FaultKind::Network,
            Self::Http { .. } | Self::Business { .. } => FaultKind::Api,
            Self::Decode(_) => FaultKind::Parse,
            Self::InvalidUrl(_) | Self::HttpClient(_) => FaultKind::Unknown,
        }
    }

    /// Message suitable for showing to a user; the server text when there is one.
    pub fn user_message(&self) -> Option<&str> {
        match self {
            Self::Business { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(ApiError::Network("refused".into()).kind(), FaultKind::Network);
        assert_eq!(
            ApiError::Http {
                status: 500,
                body: String::new()
            }
            .kind(),
            FaultKind::Api
        );
        assert_eq!(ApiError::Decode("bad".into()).kind(), FaultKind::Parse);
    }

    #[test]
    fn test_user_message() {
        let err = ApiError::Business {
            code: 500,
            message: "Device offline".to_string(),
        };
        assert_eq!(err.user_message(), Some("Device offline"));
        let err = ApiError::Business {
            code: 500,
            message: String::new(),
        };
        assert_eq!(err.user_message(), None);
    }
}
