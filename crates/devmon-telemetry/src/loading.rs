//! Named loading states.
//!
//! `LoadingTracker` is shared by cloning. Work in progress registers a key
//! with a message; the presentation surface reads the active keys.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_LOADING_MESSAGE: &str = "Loading...";

/// Well-known keys.
pub mod keys {
    pub const PAGE: &str = "page";
    pub const API: &str = "api";
    pub const MAP: &str = "map";
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadingState {
    pub message: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct LoadingTracker {
    states: Arc<RwLock<HashMap<String, LoadingState>>>,
}

impl LoadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` as loading. Restarting a key replaces its message.
    pub fn start(&self, key: &str, message: Option<&str>) {
        let state = LoadingState {
            message: message.unwrap_or(DEFAULT_LOADING_MESSAGE).to_string(),
            started_at: Utc::now(),
        };
        debug!(key, message = %state.message, "Loading started");
        self.states.write().insert(key.to_string(), state);
    }

    /// Clear `key`. Returns whether it was loading.
    pub fn stop(&self, key: &str) -> bool {
        let removed = self.states.write().remove(key).is_some();
        if removed {
            debug!(key, "Loading finished");
        }
        removed
    }

    pub fn is_loading(&self, key: &str) -> bool {
        self.states.read().contains_key(key)
    }

    pub fn state(&self, key: &str) -> Option<LoadingState> {
        self.states.read().get(key).cloned()
    }

    pub fn any_loading(&self) -> bool {
        !self.states.read().is_empty()
    }

    /// Active keys, sorted.
    pub fn active_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.states.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn clear(&self) {
        self.states.write().clear();
    }

    /// Start `key` and stop it when the guard is dropped.
    pub fn guard(&self, key: &str, message: Option<&str>) -> LoadingGuard {
        self.start(key, message);
        LoadingGuard {
            tracker: self.clone(),
            key: key.to_string(),
        }
    }

    /// Run `fut` with `key` loading; the state is cleared however it ends.
    pub async fn with_loading<F>(&self, key: &str, message: Option<&str>, fut: F) -> F::Output
    where
        F: Future,
    {
        let _guard = self.guard(key, message);
        fut.await
    }
}

/// Clears its key on drop.
#[must_use = "the loading state is cleared as soon as the guard is dropped"]
#[derive(Debug)]
pub struct LoadingGuard {
    tracker: LoadingTracker,
    key: String,
}

impl LoadingGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for LoadingGuard {
    fn drop(&mut self) {
        self.tracker.stop(&self.key);
    }
}
