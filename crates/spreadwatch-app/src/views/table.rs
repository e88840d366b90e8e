//! Admin list views (users, exchanges, symbols, monitoring feed).
//!
//! Each table polls its endpoint, projects the latest snapshot through its
//! sort controller and renders rows with per-row fault isolation. Delete
//! and toggle go through the row action flow: busy guard, optional
//! confirmation, backend call, toast, immediate refresh.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use spreadwatch_core::ListRecord;
use spreadwatch_feed::{FeedView, Fetcher, LivePoller, PollerHandle};
use spreadwatch_sort::{SortController, SortDirection, SortState};
use spreadwatch_view::{
    ActionOutcome, FaultIsolatedRenderer, ModalBroker, RowActions, RowError, RowFormatter,
    Translator,
};

use crate::client::RowMutations;
use crate::config::{ColumnConfig, ColumnKind, TableConfig};
use crate::error::{AppError, AppResult};
use crate::frame::TableFrame;
use crate::views::ViewContext;

const ABSENT: &str = "-";

/// Formats a record as one cell per configured column.
///
/// Absent values render as `-`. Present values that do not match the
/// column kind (a non-finite number, an unparseable timestamp) fail the
/// row.
#[derive(Debug, Clone)]
pub struct ColumnFormatter {
    id_field: String,
    columns: Vec<ColumnConfig>,
}

impl ColumnFormatter {
    pub fn new(id_field: impl Into<String>, columns: Vec<ColumnConfig>) -> Self {
        Self {
            id_field: id_field.into(),
            columns,
        }
    }
}

impl RowFormatter<ListRecord> for ColumnFormatter {
    fn row_key(&self, item: &ListRecord) -> Option<String> {
        item.text(&self.id_field)
    }

    fn format(&self, item: &ListRecord, t: &dyn Translator) -> Result<Vec<String>, RowError> {
        self.columns
            .iter()
            .map(|column| format_cell(item, column, t))
            .collect()
    }
}

fn format_cell(record: &ListRecord, column: &ColumnConfig, t: &dyn Translator) -> Result<String, RowError> {
    let field = column.field.as_str();
    if record.is_absent(field) {
        return Ok(ABSENT.to_string());
    }

    match column.kind {
        ColumnKind::Text | ColumnKind::Rank => record
            .text(field)
            .ok_or_else(|| RowError::invalid(field, "expected a scalar value")),
        ColumnKind::Numeric => finite(field, record.number(field)).map(|n| n.to_string()),
        ColumnKind::Percentage => {
            let raw = match record.get(field) {
                Some(Value::String(s)) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
                _ => record.number(field),
            };
            finite(field, raw).map(|n| format!("{n:.2}%"))
        }
        ColumnKind::Timestamp => record
            .timestamp_ms(field)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|ts| ts.format("%Y-%m-%d %H:%M").to_string())
            .ok_or_else(|| RowError::invalid(field, "not a timestamp")),
        ColumnKind::Boolean => record
            .boolean(field)
            .map(|b| t.t(if b { "value.yes" } else { "value.no" }))
            .ok_or_else(|| RowError::invalid(field, "expected a boolean")),
    }
}

fn finite(field: &str, value: Option<f64>) -> Result<f64, RowError> {
    match value {
        Some(n) if n.is_finite() => Ok(n),
        Some(_) => Err(RowError::invalid(field, "not a finite number")),
        None => Err(RowError::invalid(field, "expected a number")),
    }
}

/// One running admin table.
pub struct AdminTableView {
    config: TableConfig,
    sort: Mutex<SortController>,
    poller: PollerHandle<ListRecord>,
    renderer: FaultIsolatedRenderer,
    formatter: ColumnFormatter,
    actions: RowActions,
    mutations: Arc<dyn RowMutations>,
    broker: Arc<ModalBroker>,
    translator: Arc<dyn Translator>,
}

impl AdminTableView {
    /// Start polling. Must be called within a Tokio runtime.
    pub fn start(
        config: TableConfig,
        fetcher: Arc<dyn Fetcher<ListRecord>>,
        mutations: Arc<dyn RowMutations>,
        ctx: &ViewContext,
    ) -> AppResult<Self> {
        let poller = LivePoller::new(config.name.clone(), config.poll_interval())
            .with_error_sink(Arc::clone(&ctx.sink))
            .start(fetcher)?;
        let renderer = FaultIsolatedRenderer::new(config.name.clone(), Arc::clone(&ctx.translator))
            .with_error_sink(Arc::clone(&ctx.sink));
        let actions = RowActions::new(
            config.name.clone(),
            Arc::clone(&ctx.broker),
            Arc::clone(&ctx.notifier),
            Arc::clone(&ctx.translator),
        )
        .with_confirmation(config.confirm_mutations);

        Ok(Self {
            sort: Mutex::new(SortController::new(config.sort_schema(), config.sort_cycle)),
            formatter: ColumnFormatter::new(config.id_field.clone(), config.columns.clone()),
            poller,
            renderer,
            actions,
            mutations,
            broker: Arc::clone(&ctx.broker),
            translator: Arc::clone(&ctx.translator),
            config,
        })
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedView<ListRecord>> {
        self.poller.subscribe()
    }

    pub fn view(&self) -> FeedView<ListRecord> {
        self.poller.view()
    }

    pub fn sort_state(&self) -> SortState {
        self.sort.lock().state().clone()
    }

    /// Header click on `field`.
    pub fn toggle_sort(&self, field: &str) -> AppResult<SortState> {
        self.broker.ensure_interactive()?;
        if self.config.column(field).is_none() {
            return Err(AppError::UnknownColumn {
                view: self.config.name.clone(),
                field: field.to_string(),
            });
        }
        let mut sort = self.sort.lock();
        Ok(sort.toggle(field)?.clone())
    }

    pub fn render(&self) -> TableFrame {
        let view = self.poller.view();
        let (rows, state) = {
            let sort = self.sort.lock();
            let projected = sort.project(view.items());
            (self.renderer.render_all(projected, &self.formatter), sort.state().clone())
        };

        let headers = self
            .config
            .columns
            .iter()
            .map(|column| {
                let label = self.translator.t(column.label());
                match state.direction_for(&column.field.as_str().into()) {
                    Some(SortDirection::Ascending) => format!("{label} ^"),
                    Some(SortDirection::Descending) => format!("{label} v"),
                    None => label,
                }
            })
            .collect();
        let busy = rows
            .iter()
            .filter(|row| self.actions.busy().is_busy(&row.key))
            .map(|row| row.key.clone())
            .collect();

        TableFrame {
            title: self.translator.t(&format!("view.{}", self.config.name)),
            headers,
            rows,
            loading: view.loading,
            last_error: view.last_error.clone(),
            busy,
            footer: Some(format!("{} rows", view.items().len())),
        }
    }

    /// Current record with id `id`.
    pub fn find_row(&self, id: &str) -> Option<ListRecord> {
        self.poller
            .view()
            .items()
            .iter()
            .find(|record| record.text(&self.config.id_field).as_deref() == Some(id))
            .cloned()
    }

    /// Delete row `id`.
    pub async fn delete(&self, id: &str) -> AppResult<ActionOutcome> {
        self.broker.ensure_interactive()?;
        if self.find_row(id).is_none() {
            return Err(self.unknown_row(id));
        }

        let prompt = format!("{} {} {id}?", self.translator.t("confirm.delete"), self.config.name);
        let endpoint = self.config.endpoint.as_str();
        let outcome = self
            .actions
            .run(id, "delete", &prompt, || self.mutations.delete_row(endpoint, id))
            .await;
        if outcome == ActionOutcome::Completed {
            self.poller.refresh();
        }
        Ok(outcome)
    }

    /// Flip boolean `field` of row `id`.
    pub async fn toggle(&self, id: &str, field: &str) -> AppResult<ActionOutcome> {
        self.broker.ensure_interactive()?;
        let record = self.find_row(id).ok_or_else(|| self.unknown_row(id))?;
        let current = record.boolean(field).ok_or_else(|| AppError::NotToggleable {
            id: id.to_string(),
            field: field.to_string(),
        })?;

        let next = !current;
        let prompt = format!(
            "{} {field} -> {next} ({} {id})?",
            self.translator.t("confirm.toggle"),
            self.config.name
        );
        let endpoint = self.config.endpoint.as_str();
        let outcome = self
            .actions
            .run(id, "toggle", &prompt, || {
                self.mutations.set_flag(endpoint, id, field, next)
            })
            .await;
        if outcome == ActionOutcome::Completed {
            self.poller.refresh();
        }
        Ok(outcome)
    }

    pub fn refresh(&self) {
        self.poller.refresh();
    }

    pub fn stop(&self) {
        self.poller.stop();
    }

    fn unknown_row(&self, id: &str) -> AppError {
        AppError::UnknownRow {
            view: self.config.name.clone(),
            id: id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use spreadwatch_view::StaticTranslator;

    fn column(field: &str, kind: ColumnKind) -> ColumnConfig {
        ColumnConfig {
            field: field.into(),
            label: None,
            kind,
            ranks: Vec::new(),
        }
    }

    fn formatter() -> ColumnFormatter {
        ColumnFormatter::new(
            "id",
            vec![
                column("email", ColumnKind::Text),
                column("balance", ColumnKind::Numeric),
                column("win_rate", ColumnKind::Percentage),
                column("created_at", ColumnKind::Timestamp),
                column("is_admin", ColumnKind::Boolean),
            ],
        )
    }

    fn record(value: serde_json::Value) -> ListRecord {
        ListRecord::try_from(value).unwrap()
    }

    #[test]
    fn test_cells_follow_column_kinds() {
        let t = StaticTranslator::default().with("value.yes", "yes");
        let row = record(json!({
            "id": 7,
            "email": "ops@example.com",
            "balance": 12.5,
            "win_rate": "61.25%",
            "created_at": "2024-03-01T09:30:00Z",
            "is_admin": true
        }));

        let f = formatter();
        assert_eq!(f.row_key(&row).as_deref(), Some("7"));
        assert_eq!(
            f.format(&row, &t).unwrap(),
            vec!["ops@example.com", "12.5", "61.25%", "2024-03-01 09:30", "yes"]
        );
    }

    #[test]
    fn test_absent_values_render_placeholder() {
        let row = record(json!({ "id": 1, "email": null }));
        let cells = formatter().format(&row, &StaticTranslator::default()).unwrap();
        assert_eq!(cells, vec![ABSENT; 5]);
    }

    #[test]
    fn test_mistyped_values_fail_the_row() {
        let t = StaticTranslator::default();
        for bad in [
            json!({ "id": 1, "balance": "NaN" }),
            json!({ "id": 1, "balance": { "amount": 3 } }),
            json!({ "id": 1, "created_at": "yesterday" }),
            json!({ "id": 1, "is_admin": "maybe" }),
        ] {
            assert!(formatter().format(&record(bad), &t).is_err());
        }
    }
}
