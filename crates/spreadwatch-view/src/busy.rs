//! Per-row busy indicator.
//!
//! A mutation marks only its own row busy; unrelated rows stay interactive.

use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

#[derive(Debug, Clone)]
struct BusyEntry {
    action: String,
    started: Instant,
}

/// Rows with an action in flight, keyed by row key.
#[derive(Debug, Clone, Default)]
pub struct BusyTracker {
    rows: Arc<DashMap<String, BusyEntry>>,
}

impl BusyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `key` busy for `action`.
    ///
    /// Returns `None` if the row already has an action in flight. The row
    /// stays busy until the guard is dropped.
    pub fn try_begin(&self, key: &str, action: &str) -> Option<BusyGuard> {
        match self.rows.entry(key.to_string()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(BusyEntry {
                    action: action.to_string(),
                    started: Instant::now(),
                });
                Some(BusyGuard {
                    rows: Arc::clone(&self.rows),
                    key: key.to_string(),
                })
            }
        }
    }

    pub fn is_busy(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    /// Action currently running on `key`.
    pub fn action_for(&self, key: &str) -> Option<String> {
        self.rows.get(key).map(|entry| entry.action.clone())
    }

    /// Milliseconds since the action on `key` started.
    pub fn elapsed_ms(&self, key: &str) -> Option<u64> {
        self.rows
            .get(key)
            .map(|entry| entry.started.elapsed().as_millis() as u64)
    }

    pub fn busy_count(&self) -> usize {
        self.rows.len()
    }
}

/// Clears the row's busy flag on drop.
#[derive(Debug)]
pub struct BusyGuard {
    rows: Arc<DashMap<String, BusyEntry>>,
    key: String,
}

impl BusyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.rows.remove(&self.key);
    }
}
