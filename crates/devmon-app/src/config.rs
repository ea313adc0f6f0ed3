//! Application configuration.
//!
//! Loaded from TOML, then overridden from the environment. Required keys are
//! checked by [`AppConfig::validate`] before anything is started.

use crate::error::{AppError, AppResult};
use devmon_dashboard::DashboardConfig;
use devmon_ws::FeedConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Map API key.
pub const ENV_MAP_AK: &str = "DEVMON_MAP_AK";
/// REST backend base URL.
pub const ENV_API_BASE_URL: &str = "DEVMON_API_BASE_URL";
/// Hub WebSocket URL.
pub const ENV_FEED_URL: &str = "DEVMON_FEED_URL";

/// Push-feed section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedSection {
    /// Hub WebSocket URL. Empty disables the feed.
    #[serde(default)]
    pub url: String,
    /// Hub method carrying device telemetry.
    #[serde(default = "default_method")]
    pub method: String,
    /// Fixed delay between connection attempts (ms).
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Consecutive failed attempts before giving up (0 = unlimited).
    #[serde(default)]
    pub max_reconnect_attempts: u32,
    /// Ping interval while idle (ms).
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,
    /// Silence after which the connection is considered dead (ms).
    #[serde(default = "default_server_timeout_ms")]
    pub server_timeout_ms: u64,
    /// Device ID substrings to accept. Empty accepts every device.
    #[serde(default)]
    pub device_filter: Vec<String>,
}

impl Default for FeedSection {
    fn default() -> Self {
        Self {
            url: String::new(),
            method: default_method(),
            retry_delay_ms: default_retry_delay_ms(),
            max_reconnect_attempts: 0,
            keepalive_interval_ms: default_keepalive_interval_ms(),
            server_timeout_ms: default_server_timeout_ms(),
            device_filter: Vec::new(),
        }
    }
}

impl From<&FeedSection> for FeedConfig {
    fn from(section: &FeedSection) -> Self {
        Self {
            url: section.url.clone(),
            max_reconnect_attempts: section.max_reconnect_attempts,
            retry_delay_ms: section.retry_delay_ms,
            keepalive_interval_ms: section.keepalive_interval_ms,
            server_timeout_ms: section.server_timeout_ms,
            ..Default::default()
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Map rendering API key, handed to the presentation surface.
    #[serde(default)]
    pub map_ak: String,
    /// REST backend base URL, e.g. `http://host:5286/api`.
    #[serde(default)]
    pub api_base_url: String,
    /// REST request timeout (ms).
    #[serde(default = "default_api_timeout_ms")]
    pub api_timeout_ms: u64,
    /// Minimum interval between store publications (ms).
    #[serde(default = "default_publish_interval_ms")]
    pub publish_interval_ms: u64,
    /// Capacity of the feed event channel.
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    #[serde(default)]
    pub feed: FeedSection,
    #[serde(default = "default_dashboard")]
    pub dashboard: DashboardConfig,
}

fn default_method() -> String {
    devmon_feed::RECEIVE_METHOD.to_string()
}

fn default_retry_delay_ms() -> u64 {
    5000
}

fn default_keepalive_interval_ms() -> u64 {
    60_000
}

fn default_server_timeout_ms() -> u64 {
    120_000
}

fn default_api_timeout_ms() -> u64 {
    devmon_api::DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_publish_interval_ms() -> u64 {
    250
}

fn default_event_capacity() -> usize {
    1000
}

fn default_dashboard() -> DashboardConfig {
    DashboardConfig::default()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            map_ak: String::new(),
            api_base_url: String::new(),
            api_timeout_ms: default_api_timeout_ms(),
            publish_interval_ms: default_publish_interval_ms(),
            event_capacity: default_event_capacity(),
            feed: FeedSection::default(),
            dashboard: default_dashboard(),
        }
    }
}

impl AppConfig {
    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Apply process environment overrides.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from `lookup`. Empty values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let targets: [(&str, &mut String); 3] = [
            (ENV_MAP_AK, &mut self.map_ak),
            (ENV_API_BASE_URL, &mut self.api_base_url),
            (ENV_FEED_URL, &mut self.feed.url),
        ];
        for (key, slot) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                tracing::debug!(key, "Config value overridden from environment");
                *slot = value;
            }
        }
    }

    /// Fail with every missing required key named.
    pub fn validate(&self) -> AppResult<()> {
        let mut missing = Vec::new();
        if self.map_ak.trim().is_empty() {
            missing.push(ENV_MAP_AK);
        }
        if self.api_base_url.trim().is_empty() {
            missing.push(ENV_API_BASE_URL);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::MissingConfig(missing))
        }
    }

    pub fn feed_enabled(&self) -> bool {
        !self.feed.url.trim().is_empty()
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_millis(self.api_timeout_ms)
    }

    pub fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms.max(1))
    }
}
