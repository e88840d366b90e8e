//! Fault-isolated row rendering.
//!
//! Every row is formatted on its own. A formatter error, or a panic inside
//! the formatter, turns that one row into a fallback row carrying the row
//! key and an error marker; the failure is logged with the row key and the
//! remaining rows render normally.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;

use spreadwatch_core::{report_error, ErrorSink};
use spreadwatch_telemetry::{Metrics, TracingErrorSink};

use crate::error::RowError;
use crate::translate::Translator;

/// Label key of the marker shown in fallback rows.
pub const FALLBACK_MARKER_KEY: &str = "row.render_error";

/// View-specific formatting of one item into display cells.
pub trait RowFormatter<T>: Send + Sync {
    /// Identifying value of the item (e.g. its `id` field).
    fn row_key(&self, item: &T) -> Option<String>;

    /// Display cells, one per column.
    fn format(&self, item: &T, t: &dyn Translator) -> Result<Vec<String>, RowError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RowStatus {
    Ok,
    Fallback { marker: String },
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedRow {
    pub key: String,
    /// Empty for fallback rows.
    pub cells: Vec<String>,
    pub status: RowStatus,
}

impl RenderedRow {
    pub fn is_fallback(&self) -> bool {
        matches!(self.status, RowStatus::Fallback { .. })
    }
}

/// Renders rows for one view with per-row fault isolation.
pub struct FaultIsolatedRenderer {
    view: String,
    translator: Arc<dyn Translator>,
    sink: Arc<dyn ErrorSink>,
}

impl FaultIsolatedRenderer {
    pub fn new(view: impl Into<String>, translator: Arc<dyn Translator>) -> Self {
        Self {
            view: view.into(),
            translator,
            sink: Arc::new(TracingErrorSink),
        }
    }

    /// Route row failures to `sink` instead of tracing.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    /// Render one item. Never fails and never panics on formatter faults.
    ///
    /// `index` is the item's position in the rendered list; it stands in
    /// for the key when the item has none.
    pub fn render_row<T>(
        &self,
        index: usize,
        item: &T,
        formatter: &dyn RowFormatter<T>,
    ) -> RenderedRow {
        let key = catch_unwind(AssertUnwindSafe(|| formatter.row_key(item)))
            .ok()
            .flatten()
            .filter(|key| !key.is_empty())
            .unwrap_or_else(|| format!("#{index}"));

        let translator = self.translator.as_ref();
        let formatted = catch_unwind(AssertUnwindSafe(|| formatter.format(item, translator)))
            .unwrap_or_else(|payload| Err(RowError::Panicked(panic_message(&*payload))));

        match formatted {
            Ok(cells) => RenderedRow {
                key,
                cells,
                status: RowStatus::Ok,
            },
            Err(e) => {
                report_error(
                    self.sink.as_ref(),
                    "Row render failed",
                    &e,
                    &[
                        ("view", self.view.clone()),
                        ("row", key.clone()),
                        ("index", index.to_string()),
                    ],
                );
                Metrics::row_fallback(&self.view);
                RenderedRow {
                    key,
                    cells: Vec::new(),
                    status: RowStatus::Fallback {
                        marker: self.fallback_marker(),
                    },
                }
            }
        }
    }

    /// Render every item in order.
    pub fn render_all<'a, T, I>(&self, items: I, formatter: &dyn RowFormatter<T>) -> Vec<RenderedRow>
    where
        T: 'a,
        I: IntoIterator<Item = &'a T>,
    {
        items
            .into_iter()
            .enumerate()
            .map(|(index, item)| self.render_row(index, item, formatter))
            .collect()
    }

    fn fallback_marker(&self) -> String {
        catch_unwind(AssertUnwindSafe(|| self.translator.t(FALLBACK_MARKER_KEY)))
            .unwrap_or_else(|_| FALLBACK_MARKER_KEY.to_string())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::MockTranslator;
    use serde_json::json;
    use spreadwatch_core::{ListRecord, MemorySink};

    struct PriceFormatter;

    impl RowFormatter<ListRecord> for PriceFormatter {
        fn row_key(&self, item: &ListRecord) -> Option<String> {
            item.text("id")
        }

        fn format(&self, item: &ListRecord, t: &dyn Translator) -> Result<Vec<String>, RowError> {
            let symbol = item
                .text("symbol")
                .ok_or_else(|| RowError::MissingField("symbol".into()))?;
            let price = item
                .number("price")
                .ok_or_else(|| RowError::MissingField("price".into()))?;
            if !price.is_finite() {
                return Err(RowError::invalid("price", "not a finite number"));
            }
            if symbol == "PANIC" {
                panic!("formatter bug");
            }
            Ok(vec![symbol, format!("{price:.2}"), t.t("unit.usd")])
        }
    }

    fn translator() -> Arc<dyn Translator> {
        let mut mock = MockTranslator::new();
        mock.expect_t().returning(|key| match key {
            FALLBACK_MARKER_KEY => "could not render".to_string(),
            other => other.to_string(),
        });
        Arc::new(mock)
    }

    fn record(id: u32, symbol: &str, price: serde_json::Value) -> ListRecord {
        ListRecord::try_from(json!({ "id": id, "symbol": symbol, "price": price })).unwrap()
    }

    #[test]
    fn test_one_malformed_record_among_ten() {
        let sink = Arc::new(MemorySink::new(8));
        let renderer = FaultIsolatedRenderer::new("prices", translator()).with_error_sink(sink.clone());

        let mut items: Vec<ListRecord> = (0..10)
            .map(|i| record(i, &format!("C{i}"), json!(100.0 + f64::from(i))))
            .collect();
        items.insert(4, record(99, "BAD", json!("NaN")));

        let rows = renderer.render_all(&items, &PriceFormatter);
        assert_eq!(rows.len(), 11);
        assert_eq!(rows.iter().filter(|r| !r.is_fallback()).count(), 10);

        let bad = &rows[4];
        assert_eq!(bad.key, "99");
        assert_eq!(
            bad.status,
            RowStatus::Fallback {
                marker: "could not render".into()
            }
        );
        assert_eq!(rows[5].cells, vec!["C4", "104.00", "unit.usd"]);

        let logged = sink.entries();
        assert_eq!(logged.len(), 1);
        assert_eq!(logged[0].context_value("row"), Some("99"));
        assert_eq!(logged[0].context_value("view"), Some("prices"));
    }

    #[test]
    fn test_formatter_panic_is_contained() {
        let sink = Arc::new(MemorySink::new(8));
        let renderer = FaultIsolatedRenderer::new("prices", translator()).with_error_sink(sink.clone());
        let items = vec![record(1, "BTC", json!(1.0)), record(2, "PANIC", json!(2.0))];

        let rows = renderer.render_all(&items, &PriceFormatter);
        assert!(!rows[0].is_fallback());
        assert!(rows[1].is_fallback());
        assert!(sink.entries()[0].error.contains("formatter bug"));
    }

    #[test]
    fn test_missing_key_uses_index() {
        let renderer = FaultIsolatedRenderer::new("prices", translator())
            .with_error_sink(Arc::new(MemorySink::default()));
        let keyless = ListRecord::new().with("symbol", "ETH");

        let row = renderer.render_row(3, &keyless, &PriceFormatter);
        assert_eq!(row.key, "#3");
        assert!(row.is_fallback());
    }
}
