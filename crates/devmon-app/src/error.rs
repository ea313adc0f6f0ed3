//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    #[error("API error: {0}")]
    Api(#[from] devmon_api::ApiError),
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_names_every_key() {
        let err = AppError::MissingConfig(vec!["DEVMON_MAP_AK", "DEVMON_API_BASE_URL"]);
        assert_eq!(
            err.to_string(),
            "Missing required configuration: DEVMON_MAP_AK, DEVMON_API_BASE_URL"
        );
    }
}
