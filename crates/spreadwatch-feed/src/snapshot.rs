//! Snapshot slot with request ordering.
//!
//! Each poller owns one slot. The slot hands out monotonically increasing
//! request tickets and applies a completed response only if its sequence is
//! newer than the last applied one. Applied snapshots replace the previous
//! one wholesale; failures leave the previous snapshot in place.
//!
//! All state changes happen under one lock, so once [`SnapshotSlot::close`]
//! returns no response can change what subscribers see.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use spreadwatch_telemetry::Metrics;

use crate::error::FeedResult;

/// One complete, immutable result set.
#[derive(Debug)]
pub struct FeedSnapshot<T> {
    pub items: Vec<T>,
    pub fetched_at: DateTime<Utc>,
    pub is_initial: bool,
    pub sequence: u64,
}

/// What a view renders from: latest snapshot plus loading/error state.
#[derive(Debug)]
pub struct FeedView<T> {
    pub snapshot: Option<Arc<FeedSnapshot<T>>>,
    /// True only while the initial request is outstanding and nothing has
    /// been applied yet.
    pub loading: bool,
    /// Most recent fetch failure, cleared by the next applied snapshot.
    pub last_error: Option<String>,
}

impl<T> FeedView<T> {
    fn empty() -> Self {
        Self {
            snapshot: None,
            loading: false,
            last_error: None,
        }
    }

    /// Items of the latest snapshot (empty before the first one lands).
    pub fn items(&self) -> &[T] {
        self.snapshot
            .as_deref()
            .map(|s| s.items.as_slice())
            .unwrap_or(&[])
    }

    /// Sequence of the latest applied snapshot.
    pub fn sequence(&self) -> Option<u64> {
        self.snapshot.as_ref().map(|s| s.sequence)
    }
}

impl<T> Clone for FeedView<T> {
    fn clone(&self) -> Self {
        Self {
            snapshot: self.snapshot.clone(),
            loading: self.loading,
            last_error: self.last_error.clone(),
        }
    }
}

/// Identifies one outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    pub sequence: u64,
    pub is_initial: bool,
}

/// Result of handing a response to the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// Became the current snapshot.
    Applied,
    /// Fetch failed; previous snapshot kept.
    Failed,
    /// A newer response was already applied.
    Stale { latest: u64 },
    /// Slot closed; nothing changed.
    Stopped,
}

#[derive(Debug)]
struct SlotState {
    next_sequence: u64,
    last_applied: Option<u64>,
    live: bool,
    initial_settled: bool,
}

struct SlotInner<T> {
    name: String,
    state: Mutex<SlotState>,
    tx: watch::Sender<FeedView<T>>,
}

/// Ordered, closable holder of a view's current snapshot.
pub struct SnapshotSlot<T> {
    inner: Arc<SlotInner<T>>,
}

impl<T> Clone for SnapshotSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> std::fmt::Debug for SnapshotSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("SnapshotSlot")
            .field("name", &self.inner.name)
            .field("next_sequence", &state.next_sequence)
            .field("last_applied", &state.last_applied)
            .field("live", &state.live)
            .finish()
    }
}

impl<T> SnapshotSlot<T> {
    /// Create an open slot with no snapshot.
    pub fn new(name: impl Into<String>) -> Self {
        let (tx, _rx) = watch::channel(FeedView::empty());
        Self {
            inner: Arc::new(SlotInner {
                name: name.into(),
                state: Mutex::new(SlotState {
                    next_sequence: 0,
                    last_applied: None,
                    live: true,
                    initial_settled: true,
                }),
                tx,
            }),
        }
    }

    /// View name used in logs and metrics.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Receiver notified on every view change.
    pub fn subscribe(&self) -> watch::Receiver<FeedView<T>> {
        self.inner.tx.subscribe()
    }

    /// Current view.
    pub fn view(&self) -> FeedView<T> {
        self.inner.tx.borrow().clone()
    }

    pub fn is_live(&self) -> bool {
        self.inner.state.lock().live
    }

    pub fn last_applied(&self) -> Option<u64> {
        self.inner.state.lock().last_applied
    }

    /// Issue a ticket for a new request. `None` once the slot is closed.
    ///
    /// Issuing an initial ticket turns `loading` on until that request
    /// settles or any snapshot is applied.
    pub fn issue(&self, is_initial: bool) -> Option<RequestTicket> {
        let mut state = self.inner.state.lock();
        if !state.live {
            return None;
        }
        state.next_sequence += 1;
        if is_initial {
            state.initial_settled = false;
            self.inner.tx.send_modify(|view| view.loading = true);
        }
        Some(RequestTicket {
            sequence: state.next_sequence,
            is_initial,
        })
    }

    /// Hand a completed response to the slot.
    pub fn complete(&self, ticket: RequestTicket, result: FeedResult<Vec<T>>) -> ApplyOutcome {
        let mut state = self.inner.state.lock();
        if !state.live {
            Metrics::snapshot_stopped(&self.inner.name);
            return ApplyOutcome::Stopped;
        }

        let settles_initial = ticket.is_initial && !state.initial_settled;
        if settles_initial {
            state.initial_settled = true;
        }
        let superseded = state
            .last_applied
            .filter(|latest| ticket.sequence <= *latest);

        match result {
            Ok(items) => {
                if let Some(latest) = superseded {
                    if settles_initial {
                        self.inner.tx.send_modify(|view| view.loading = false);
                    }
                    Metrics::snapshot_stale(&self.inner.name);
                    debug!(
                        view = %self.inner.name,
                        sequence = ticket.sequence,
                        latest,
                        "Discarding stale response"
                    );
                    return ApplyOutcome::Stale { latest };
                }

                state.last_applied = Some(ticket.sequence);
                state.initial_settled = true;
                let snapshot = Arc::new(FeedSnapshot {
                    items,
                    fetched_at: Utc::now(),
                    is_initial: ticket.is_initial,
                    sequence: ticket.sequence,
                });
                self.inner.tx.send_modify(|view| {
                    view.snapshot = Some(snapshot);
                    view.loading = false;
                    view.last_error = None;
                });
                ApplyOutcome::Applied
            }
            Err(e) => {
                let message = e.to_string();
                self.inner.tx.send_modify(|view| {
                    if settles_initial {
                        view.loading = false;
                    }
                    // An older failure must not mask a newer success.
                    if superseded.is_none() {
                        view.last_error = Some(message);
                    }
                });
                ApplyOutcome::Failed
            }
        }
    }

    /// Close the slot. Later completions are ignored and no new tickets
    /// are issued. The last snapshot stays readable.
    pub fn close(&self) {
        let mut state = self.inner.state.lock();
        if !state.live {
            return;
        }
        state.live = false;
        self.inner.tx.send_modify(|view| view.loading = false);
        debug!(view = %self.inner.name, "Snapshot slot closed");
    }
}
