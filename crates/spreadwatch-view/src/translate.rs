//! Label lookup.

use std::collections::HashMap;

/// `t(key) -> label` lookup used while formatting rows and messages.
#[cfg_attr(test, mockall::automock)]
pub trait Translator: Send + Sync {
    /// Label for `key`. Unknown keys come back unchanged.
    fn t(&self, key: &str) -> String;
}

/// Translator backed by a fixed key/label table.
#[derive(Debug, Clone, Default)]
pub struct StaticTranslator {
    labels: HashMap<String, String>,
}

impl StaticTranslator {
    pub fn new(labels: HashMap<String, String>) -> Self {
        Self { labels }
    }

    /// Add or replace one label.
    pub fn with(mut self, key: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels.insert(key.into(), label.into());
        self
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

impl Translator for StaticTranslator {
    fn t(&self, key: &str) -> String {
        self.labels
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
