//! Mutating row actions (delete, toggle).
//!
//! Flow per action: mark the row busy, optionally ask for confirmation,
//! run the operation, then report the outcome through the notifier. A
//! failing operation is caught here; the modal broker only answers the
//! yes/no question.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use spreadwatch_core::Severity;
use spreadwatch_telemetry::Metrics;

use crate::busy::BusyTracker;
use crate::modal::ModalBroker;
use crate::notify::Notifier;
use crate::translate::Translator;

/// How a row action ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// The user declined the confirmation.
    Cancelled,
    /// Another action on the same row was still running.
    Busy,
    Failed(String),
}

impl ActionOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Completed => "ok",
            Self::Cancelled => "cancelled",
            Self::Busy => "busy",
            Self::Failed(_) => "error",
        }
    }
}

/// Runs row actions for one view.
pub struct RowActions {
    view: String,
    broker: Arc<ModalBroker>,
    busy: BusyTracker,
    notifier: Arc<dyn Notifier>,
    translator: Arc<dyn Translator>,
    confirm: bool,
}

impl RowActions {
    pub fn new(
        view: impl Into<String>,
        broker: Arc<ModalBroker>,
        notifier: Arc<dyn Notifier>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            view: view.into(),
            broker,
            busy: BusyTracker::new(),
            notifier,
            translator,
            confirm: true,
        }
    }

    /// Whether actions ask for confirmation first (default: true).
    pub fn with_confirmation(mut self, confirm: bool) -> Self {
        self.confirm = confirm;
        self
    }

    pub fn busy(&self) -> &BusyTracker {
        &self.busy
    }

    /// Run `op` for row `row_key`.
    ///
    /// `prompt` is the confirmation question. The row is busy from the
    /// moment this is called until the outcome is known.
    pub async fn run<F, Fut, E>(&self, row_key: &str, action: &str, prompt: &str, op: F) -> ActionOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: Display,
    {
        let Some(_guard) = self.busy.try_begin(row_key, action) else {
            self.notifier.notify(
                Severity::Warning,
                &format!("{} ({row_key})", self.translator.t("action.busy")),
            );
            return self.finish(action, row_key, ActionOutcome::Busy);
        };

        if self.confirm && !self.broker.confirm(prompt).await {
            return self.finish(action, row_key, ActionOutcome::Cancelled);
        }

        let outcome = match op().await {
            Ok(()) => {
                self.notifier.notify(
                    Severity::Success,
                    &format!("{} ({row_key})", self.translator.t(&format!("action.{action}.done"))),
                );
                ActionOutcome::Completed
            }
            Err(e) => {
                let message = e.to_string();
                warn!(view = %self.view, row = %row_key, action, error = %message, "Row action failed");
                self.notifier.notify(
                    Severity::Error,
                    &format!(
                        "{} ({row_key}): {message}",
                        self.translator.t(&format!("action.{action}.failed"))
                    ),
                );
                ActionOutcome::Failed(message)
            }
        };
        self.finish(action, row_key, outcome)
    }

    fn finish(&self, action: &str, row_key: &str, outcome: ActionOutcome) -> ActionOutcome {
        Metrics::mutation(&self.view, action, outcome.label());
        info!(view = %self.view, row = %row_key, action, outcome = outcome.label(), "Row action finished");
        outcome
    }
}
