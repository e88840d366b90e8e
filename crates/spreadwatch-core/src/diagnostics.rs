//! Error-logging collaborator.
//!
//! Feed and row failures are absorbed by the views and handed to an
//! [`ErrorSink`]. Sinks are fire-and-forget: [`report_error`] contains any
//! panic raised by a sink so logging can never break rendering.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// User-facing severity for alerts and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Success => write!(f, "success"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Destination for absorbed errors.
pub trait ErrorSink: Send + Sync {
    /// Record an error with key/value context (view name, row id, ...).
    fn log_error(&self, message: &str, error: &dyn std::error::Error, context: &[(&str, String)]);
}

/// Hand an error to a sink, ignoring any panic the sink raises.
pub fn report_error(
    sink: &dyn ErrorSink,
    message: &str,
    error: &dyn std::error::Error,
    context: &[(&str, String)],
) {
    let _ = catch_unwind(AssertUnwindSafe(|| sink.log_error(message, error, context)));
}

/// One entry captured by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggedError {
    pub message: String,
    pub error: String,
    pub context: Vec<(String, String)>,
    pub logged_at: DateTime<Utc>,
}

impl LoggedError {
    /// Look up a context value by key.
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Bounded in-memory sink keeping the most recent errors.
///
/// Oldest entries are evicted once `capacity` is reached.
#[derive(Debug)]
pub struct MemorySink {
    entries: RwLock<VecDeque<LoggedError>>,
    capacity: usize,
}

impl MemorySink {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity: capacity.max(1),
        }
    }

    /// Snapshot of stored entries, oldest first.
    pub fn entries(&self) -> Vec<LoggedError> {
        self.entries.read().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(100)
    }
}

impl ErrorSink for MemorySink {
    fn log_error(&self, message: &str, error: &dyn std::error::Error, context: &[(&str, String)]) {
        let entry = LoggedError {
            message: message.to_string(),
            error: error.to_string(),
            context: context
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            logged_at: Utc::now(),
        };

        let mut entries = self.entries.write();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

impl<T: ErrorSink + ?Sized> ErrorSink for std::sync::Arc<T> {
    fn log_error(&self, message: &str, error: &dyn std::error::Error, context: &[(&str, String)]) {
        (**self).log_error(message, error, context);
    }
}

/// Fans one error out to two sinks.
impl<A: ErrorSink, B: ErrorSink> ErrorSink for (A, B) {
    fn log_error(&self, message: &str, error: &dyn std::error::Error, context: &[(&str, String)]) {
        report_error(&self.0, message, error, context);
        report_error(&self.1, message, error, context);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    struct PanickingSink;

    impl ErrorSink for PanickingSink {
        fn log_error(&self, _: &str, _: &dyn std::error::Error, _: &[(&str, String)]) {
            panic!("sink exploded");
        }
    }

    #[test]
    fn test_memory_sink_records_context() {
        let sink = MemorySink::new(10);
        let err = CoreError::MissingField("price".to_string());
        sink.log_error("row failed", &err, &[("row", "42".to_string())]);

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "row failed");
        assert_eq!(entries[0].error, "Missing field: price");
        assert_eq!(entries[0].context_value("row"), Some("42"));
    }

    #[test]
    fn test_memory_sink_evicts_oldest() {
        let sink = MemorySink::new(2);
        let err = CoreError::MissingField("x".to_string());
        for i in 0..3 {
            sink.log_error(&format!("e{i}"), &err, &[]);
        }
        let messages: Vec<String> = sink.entries().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["e1", "e2"]);
    }

    #[test]
    fn test_report_error_contains_sink_panic() {
        let err = CoreError::MissingField("x".to_string());
        report_error(&PanickingSink, "boom", &err, &[]);
    }

    #[test]
    fn test_pair_sink_reaches_both() {
        let pair = (MemorySink::new(4), MemorySink::new(4));
        let err = CoreError::MissingField("x".to_string());
        pair.log_error("fan out", &err, &[]);
        assert_eq!(pair.0.len(), 1);
        assert_eq!(pair.1.len(), 1);
    }
}
