//! Fault reporting.
//!
//! `ErrorReporter` is an explicit context object: clone it into every
//! component that reports faults. Each report is logged, counted, kept in a
//! bounded newest-first history and turned into a [`Notification`] for the
//! presentation surface.

use crate::metrics::Metrics;
use chrono::{DateTime, Utc};
use devmon_core::FaultKind;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{error, warn};

/// History size.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// One reported fault.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FaultRecord {
    /// Report order, strictly increasing per reporter.
    pub seq: u64,
    pub kind: FaultKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationLevel {
    Warning,
    Error,
}

/// User-facing notice derived from a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
}

impl Notification {
    fn new(level: NotificationLevel, title: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            message: message.into(),
        }
    }

    /// Notification for a fault of `kind` carrying `message`.
    pub fn for_fault(kind: FaultKind, message: &str) -> Self {
        let or = |fallback: &str| {
            if message.is_empty() {
                fallback.to_string()
            } else {
                message.to_string()
            }
        };

        match kind {
            FaultKind::Network => Self::new(
                NotificationLevel::Error,
                "Network error",
                "Network connection failed, please check network settings",
            ),
            FaultKind::Api => {
                Self::new(NotificationLevel::Error, "Request failed", or("API request failed"))
            }
            FaultKind::Transport => Self::new(
                NotificationLevel::Warning,
                "Real-time connection interrupted",
                or("Real-time connection lost, reconnecting..."),
            ),
            FaultKind::Validation => Self::new(
                NotificationLevel::Warning,
                "Invalid data",
                or("Data validation failed"),
            ),
            FaultKind::Parse => Self::new(
                NotificationLevel::Warning,
                "Feed error",
                "Received malformed feed message",
            ),
            FaultKind::Unknown => Self::new(
                NotificationLevel::Error,
                "System error",
                "System error, please retry later",
            ),
        }
    }
}

/// Shared fault reporter.
#[derive(Debug, Clone)]
pub struct ErrorReporter {
    history: Arc<Mutex<History>>,
    capacity: usize,
}

#[derive(Debug)]
struct History {
    records: VecDeque<FaultRecord>,
    next_seq: u64,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: Arc::new(Mutex::new(History {
                records: VecDeque::with_capacity(capacity),
                next_seq: 1,
            })),
            capacity,
        }
    }

    /// Record a fault and return the notification to show.
    pub fn report(
        &self,
        kind: FaultKind,
        message: impl Into<String>,
        details: Option<String>,
    ) -> Notification {
        let message = message.into();

        match kind {
            FaultKind::Network | FaultKind::Api | FaultKind::Unknown => {
                error!(kind = %kind, message = %message, details = ?details, "Fault");
            }
            FaultKind::Transport | FaultKind::Parse | FaultKind::Validation => {
                warn!(kind = %kind, message = %message, details = ?details, "Fault");
            }
        }
        Metrics::fault(kind);

        let notification = Notification::for_fault(kind, &message);

        let mut history = self.history.lock();
        let seq = history.next_seq;
        history.next_seq += 1;
        history.records.push_front(FaultRecord {
            seq,
            kind,
            message,
            details,
            timestamp: Utc::now(),
        });
        history.records.truncate(self.capacity);

        notification
    }

    /// Report any error that knows its own kind.
    pub fn report_error<E: std::fmt::Display>(&self, kind: FaultKind, err: &E) -> Notification {
        self.report(kind, err.to_string(), None)
    }

    /// History, newest first.
    pub fn history(&self) -> Vec<FaultRecord> {
        self.history.lock().records.iter().cloned().collect()
    }

    /// Records with `seq` greater than `after`, oldest first.
    pub fn since(&self, after: u64) -> Vec<FaultRecord> {
        let history = self.history.lock();
        let mut fresh: Vec<_> = history
            .records
            .iter()
            .take_while(|r| r.seq > after)
            .cloned()
            .collect();
        fresh.reverse();
        fresh
    }

    /// Sequence number of the newest record, 0 before any report.
    pub fn last_seq(&self) -> u64 {
        self.history.lock().next_seq - 1
    }

    /// The `n` newest records.
    pub fn recent(&self, n: usize) -> Vec<FaultRecord> {
        self.history.lock().records.iter().take(n).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.history.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.lock().records.is_empty()
    }

    pub fn clear_history(&self) {
        self.history.lock().records.clear();
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
