//! Console front-end.
//!
//! Reads one command per line. While a dialog is open only `y`, `n`,
//! `esc` and `quit` are accepted, so a confirmation cannot be bypassed.

use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use spreadwatch_core::{MemorySink, Severity};
use spreadwatch_view::{ModalAction, ModalBroker, ModalKind, ModalView, Notifier, ViewError};

use crate::app::ViewSet;
use crate::error::{AppError, AppResult};

pub const HELP: &str = "\
commands:
  views                          list views
  show <view>                    switch the displayed view
  sort <table> <field>           click a column header
  delete <table> <id>            delete a row
  toggle <table> <id> <field>    flip a boolean field
  refresh [view]                 fetch now
  errors                         recent absorbed errors
  y | n | esc                    answer the open dialog
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Views,
    Show(String),
    Sort { table: String, field: String },
    Delete { table: String, id: String },
    Toggle { table: String, id: String, field: String },
    Refresh(Option<String>),
    Errors,
    Help,
    Yes,
    No,
    Escape,
    Quit,
}

impl Command {
    /// Accepted while a dialog is open.
    pub fn allowed_while_modal(&self) -> bool {
        matches!(self, Self::Yes | Self::No | Self::Escape | Self::Quit)
    }
}

impl FromStr for Command {
    type Err = AppError;

    fn from_str(line: &str) -> AppResult<Self> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let Some((&verb, args)) = words.split_first() else {
            return Err(AppError::Command("empty command".into()));
        };

        let owned = |i: usize| args[i].to_string();
        let command = match (verb.to_ascii_lowercase().as_str(), args.len()) {
            ("views", 0) => Self::Views,
            ("show", 1) => Self::Show(owned(0)),
            ("sort", 2) => Self::Sort {
                table: owned(0),
                field: owned(1),
            },
            ("delete", 2) => Self::Delete {
                table: owned(0),
                id: owned(1),
            },
            ("toggle", 3) => Self::Toggle {
                table: owned(0),
                id: owned(1),
                field: owned(2),
            },
            ("refresh", 0) => Self::Refresh(None),
            ("refresh", 1) => Self::Refresh(Some(owned(0))),
            ("errors", 0) => Self::Errors,
            ("help" | "?", 0) => Self::Help,
            ("y" | "yes", 0) => Self::Yes,
            ("n" | "no", 0) => Self::No,
            ("esc" | "escape", 0) => Self::Escape,
            ("quit" | "exit" | "q", 0) => Self::Quit,
            (other, _) => {
                return Err(AppError::Command(format!(
                    "unrecognised command {other:?} with {} argument(s); try `help`",
                    args.len()
                )))
            }
        };
        Ok(command)
    }
}

/// What the caller should do with a handled line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    Silent,
    Quit,
}

/// Dispatches console commands to the running views.
pub struct Console {
    views: Arc<ViewSet>,
    broker: Arc<ModalBroker>,
    errors: Arc<MemorySink>,
    notifier: Arc<dyn Notifier>,
    active: watch::Sender<String>,
}

impl Console {
    pub fn new(
        views: Arc<ViewSet>,
        broker: Arc<ModalBroker>,
        errors: Arc<MemorySink>,
        notifier: Arc<dyn Notifier>,
        active: watch::Sender<String>,
    ) -> Self {
        Self {
            views,
            broker,
            errors,
            notifier,
            active,
        }
    }

    pub fn active_view(&self) -> String {
        self.active.borrow().clone()
    }

    /// Handle one input line. Must be called within a Tokio runtime.
    pub fn handle(&self, line: &str) -> Reply {
        if line.trim().is_empty() {
            return Reply::Silent;
        }
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => return Reply::Text(e.to_string()),
        };
        debug!(?command, "Console command");

        if self.broker.is_blocking() && !command.allowed_while_modal() {
            return Reply::Text(ViewError::ModalOpen.to_string());
        }

        match self.dispatch(command) {
            Ok(reply) => reply,
            Err(e) => Reply::Text(format!("error: {e}")),
        }
    }

    fn dispatch(&self, command: Command) -> AppResult<Reply> {
        match command {
            Command::Views => Ok(Reply::Text(self.views.names().join(", "))),
            Command::Show(view) => {
                // validate before switching
                self.views.render(&view)?;
                self.active.send_replace(view);
                Ok(Reply::Silent)
            }
            Command::Sort { table, field } => {
                let view = self.views.table(&table)?;
                let state = view.toggle_sort(&field)?;
                info!(table = %table, ?state, "Sort changed");
                self.active.send_replace(table);
                Ok(Reply::Text(view.render().to_string()))
            }
            Command::Delete { table, id } => {
                let view = self.views.table(&table)?;
                let notifier = Arc::clone(&self.notifier);
                tokio::spawn(async move {
                    if let Err(e) = view.delete(&id).await {
                        notifier.notify(Severity::Error, &e.to_string());
                    }
                });
                Ok(Reply::Silent)
            }
            Command::Toggle { table, id, field } => {
                let view = self.views.table(&table)?;
                let notifier = Arc::clone(&self.notifier);
                tokio::spawn(async move {
                    if let Err(e) = view.toggle(&id, &field).await {
                        notifier.notify(Severity::Error, &e.to_string());
                    }
                });
                Ok(Reply::Silent)
            }
            Command::Refresh(view) => {
                let view = view.unwrap_or_else(|| self.active_view());
                self.views.refresh(&view)?;
                Ok(Reply::Silent)
            }
            Command::Errors => Ok(Reply::Text(self.recent_errors())),
            Command::Help => Ok(Reply::Text(HELP.to_string())),
            Command::Yes => Ok(self.answer(ModalAction::Confirm)),
            Command::No => Ok(self.answer(ModalAction::Cancel)),
            Command::Escape => Ok(self.answer(ModalAction::Escape)),
            Command::Quit => Ok(Reply::Quit),
        }
    }

    fn answer(&self, action: ModalAction) -> Reply {
        match self.broker.resolve(action) {
            Some(_) => Reply::Silent,
            None => Reply::Text("no dialog is open".to_string()),
        }
    }

    fn recent_errors(&self) -> String {
        let entries = self.errors.entries();
        if entries.is_empty() {
            return "no errors".to_string();
        }
        let mut out = String::new();
        for entry in entries {
            let context: Vec<String> = entry
                .context
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            let _ = writeln!(
                out,
                "{} {}: {} [{}]",
                entry.logged_at.format("%H:%M:%S"),
                entry.message,
                entry.error,
                context.join(" ")
            );
        }
        out.trim_end().to_string()
    }
}

/// Prompt line for a visible dialog.
pub fn modal_prompt(view: &ModalView) -> String {
    let queued = if view.queued > 0 {
        format!(" [{} more waiting]", view.queued)
    } else {
        String::new()
    };
    match view.kind {
        ModalKind::Confirm => format!("? {} (y/n, esc){queued}", view.message),
        kind => format!("[{}] {} (y to dismiss){queued}", kind_label(kind), view.message),
    }
}

fn kind_label(kind: ModalKind) -> &'static str {
    match kind {
        ModalKind::Info => "info",
        ModalKind::Success => "success",
        ModalKind::Warning => "warning",
        ModalKind::Error => "error",
        ModalKind::Confirm => "confirm",
    }
}

/// Toasts printed to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Error | Severity::Warning => warn!(%severity, "{message}"),
            Severity::Info | Severity::Success => info!(%severity, "{message}"),
        }
        println!("[{severity}] {message}");
    }
}
