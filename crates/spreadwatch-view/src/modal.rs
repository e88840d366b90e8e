//! Modal/confirmation broker.
//!
//! Alerts and confirmations go through a FIFO queue with a single visible
//! slot. Each request hands back a [`ModalResponse`] that resolves once the
//! user answers it. While a modal is visible the rest of the UI must not
//! accept input; front-ends check [`ModalBroker::ensure_interactive`].
//!
//! Tests drive the queue by calling [`ModalBroker::resolve`] directly.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{oneshot, watch};
use tracing::debug;
use uuid::Uuid;

use spreadwatch_core::Severity;
use spreadwatch_telemetry::Metrics;

use crate::error::{ViewError, ViewResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalKind {
    Info,
    Success,
    Warning,
    Error,
    Confirm,
}

impl From<Severity> for ModalKind {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Info => Self::Info,
            Severity::Success => Self::Success,
            Severity::Warning => Self::Warning,
            Severity::Error => Self::Error,
        }
    }
}

/// How the user closed the visible modal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalAction {
    Confirm,
    Cancel,
    /// Click outside the dialog.
    Backdrop,
    /// Explicit close (Escape key).
    Escape,
}

/// What a front-end needs to draw the visible modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModalView {
    pub id: Uuid,
    pub message: String,
    pub kind: ModalKind,
    /// Requests waiting behind this one.
    pub queued: usize,
}

struct ModalRequest {
    id: Uuid,
    message: String,
    kind: ModalKind,
    tx: oneshot::Sender<bool>,
}

impl ModalRequest {
    fn answer(self, confirmed: bool) {
        // The caller may have stopped waiting.
        let _ = self.tx.send(confirmed);
    }
}

#[derive(Default)]
struct BrokerState {
    active: Option<ModalRequest>,
    queue: VecDeque<ModalRequest>,
}

impl BrokerState {
    fn depth(&self) -> usize {
        self.queue.len() + usize::from(self.active.is_some())
    }

    fn view(&self) -> Option<ModalView> {
        self.active.as_ref().map(|req| ModalView {
            id: req.id,
            message: req.message.clone(),
            kind: req.kind,
            queued: self.queue.len(),
        })
    }
}

/// Outcome of one modal request.
///
/// Resolves to `true` only if the user chose confirm. Resolves to `false`
/// if the request was dismissed in any other way or the broker went away.
#[derive(Debug)]
#[must_use = "a modal response does nothing unless awaited"]
pub struct ModalResponse {
    id: Uuid,
    rx: oneshot::Receiver<bool>,
}

impl ModalResponse {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl Future for ModalResponse {
    type Output = bool;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<bool> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|answer| answer.unwrap_or(false))
    }
}

/// Single-slot modal queue.
pub struct ModalBroker {
    state: Mutex<BrokerState>,
    tx: watch::Sender<Option<ModalView>>,
}

impl ModalBroker {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            state: Mutex::new(BrokerState::default()),
            tx,
        }
    }

    /// Ask a yes/no question.
    pub fn confirm(&self, message: impl Into<String>) -> ModalResponse {
        self.enqueue(message.into(), ModalKind::Confirm)
    }

    /// Show a message. Completes when the user dismisses it.
    pub fn alert(&self, message: impl Into<String>, kind: ModalKind) -> impl Future<Output = ()> {
        let response = self.enqueue(message.into(), kind);
        async move {
            response.await;
        }
    }

    fn enqueue(&self, message: String, kind: ModalKind) -> ModalResponse {
        let (tx, rx) = oneshot::channel();
        let id = Uuid::new_v4();
        let request = ModalRequest {
            id,
            message,
            kind,
            tx,
        };

        let mut state = self.state.lock();
        if state.active.is_none() {
            state.active = Some(request);
        } else {
            debug!(%id, queued = state.queue.len() + 1, "Modal queued");
            state.queue.push_back(request);
        }
        self.publish(&state);
        ModalResponse { id, rx }
    }

    /// Close the visible modal with `action` and show the next queued one.
    ///
    /// Returns the answer delivered to the waiting caller, or `None` if no
    /// modal was open.
    pub fn resolve(&self, action: ModalAction) -> Option<bool> {
        let mut state = self.state.lock();
        let request = state.active.take()?;
        let confirmed = action == ModalAction::Confirm;
        debug!(id = %request.id, ?action, confirmed, "Modal resolved");
        request.answer(confirmed);

        state.active = state.queue.pop_front();
        self.publish(&state);
        Some(confirmed)
    }

    /// Resolve the visible and all queued requests as not confirmed.
    pub fn dismiss_all(&self) -> usize {
        let mut state = self.state.lock();
        let mut dismissed = 0;
        if let Some(request) = state.active.take() {
            request.answer(false);
            dismissed += 1;
        }
        for request in state.queue.drain(..) {
            request.answer(false);
            dismissed += 1;
        }
        self.publish(&state);
        dismissed
    }

    /// The visible modal, if any.
    pub fn current(&self) -> Option<ModalView> {
        self.tx.borrow().clone()
    }

    /// Receiver notified whenever the visible modal changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<ModalView>> {
        self.tx.subscribe()
    }

    /// Whether a modal is visible and input elsewhere must be ignored.
    pub fn is_blocking(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Err while a modal is visible.
    pub fn ensure_interactive(&self) -> ViewResult<()> {
        if self.is_blocking() {
            Err(ViewError::ModalOpen)
        } else {
            Ok(())
        }
    }

    /// Visible plus queued requests.
    pub fn pending(&self) -> usize {
        self.state.lock().depth()
    }

    fn publish(&self, state: &BrokerState) {
        Metrics::modal_queue_depth(state.depth());
        self.tx.send_replace(state.view());
    }
}

impl Default for ModalBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModalBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ModalBroker")
            .field("active", &state.active.as_ref().map(|r| r.id))
            .field("queued", &state.queue.len())
            .finish()
    }
}
