//! Price dashboard.
//!
//! One row per instrument. Each row is parsed and highlighted inside the
//! fault-isolated renderer, so a malformed instrument becomes a fallback
//! row and the rest of the board keeps rendering.

use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::watch;

use spreadwatch_core::{InstrumentQuotes, ListRecord, PriceQuote};
use spreadwatch_feed::{FeedView, Fetcher, LivePoller, PollerHandle};
use spreadwatch_highlight::{compute_highlights, HighlightResult, QuoteBand};
use spreadwatch_view::{FaultIsolatedRenderer, RowError, RowFormatter, Translator};

use crate::config::DashboardConfig;
use crate::error::AppResult;
use crate::frame::TableFrame;
use crate::views::ViewContext;

pub const DASHBOARD_VIEW: &str = "dashboard";

/// Formats one instrument: symbol, one cell per exchange, spread.
#[derive(Debug, Default, Clone, Copy)]
pub struct DashboardFormatter;

impl RowFormatter<ListRecord> for DashboardFormatter {
    fn row_key(&self, item: &ListRecord) -> Option<String> {
        item.text("symbol")
    }

    fn format(&self, item: &ListRecord, t: &dyn Translator) -> Result<Vec<String>, RowError> {
        let instrument = InstrumentQuotes::from_record(item)?;
        let highlights = compute_highlights(&instrument.quotes);

        let mut cells = Vec::with_capacity(instrument.quotes.len() + 2);
        cells.push(instrument.symbol.clone());
        cells.extend(
            instrument
                .quotes
                .iter()
                .enumerate()
                .map(|(i, quote)| quote_cell(quote, &highlights, i, t)),
        );
        cells.push(match highlights.spread_percent() {
            Some(spread) => format!("{}: {}%", t.t("dashboard.spread"), spread.round_dp(2).normalize()),
            None => t.t("dashboard.no_data"),
        });
        Ok(cells)
    }
}

fn quote_cell(quote: &PriceQuote, highlights: &HighlightResult, index: usize, t: &dyn Translator) -> String {
    let (band, price) = match (highlights.band(index), quote.eligible_price()) {
        (QuoteBand::Unsupported, _) | (_, None) => {
            return format!("{} {}", quote.exchange_id, t.t("dashboard.unsupported"));
        }
        (band, Some(price)) => (band, price),
    };

    let deviation = highlights
        .deviation(index)
        .map(|d| format!(" ({}%)", signed(d.round_dp(2).normalize())))
        .unwrap_or_default();
    let marker = match band {
        QuoteBand::Min => " [min]",
        QuoteBand::Max => " [max]",
        QuoteBand::Neutral | QuoteBand::Unsupported => "",
    };
    format!("{} {}{}{}", quote.exchange_id, price.normalize(), deviation, marker)
}

fn signed(value: Decimal) -> String {
    if value > Decimal::ZERO {
        format!("+{value}")
    } else {
        value.to_string()
    }
}

/// Live price board.
pub struct DashboardView {
    poller: PollerHandle<ListRecord>,
    renderer: FaultIsolatedRenderer,
    translator: Arc<dyn Translator>,
}

impl DashboardView {
    /// Start polling. Must be called within a Tokio runtime.
    pub fn start(
        config: &DashboardConfig,
        fetcher: Arc<dyn Fetcher<ListRecord>>,
        ctx: &ViewContext,
    ) -> AppResult<Self> {
        let poller = LivePoller::new(DASHBOARD_VIEW, config.poll_interval())
            .with_error_sink(Arc::clone(&ctx.sink))
            .start(fetcher)?;
        let renderer = FaultIsolatedRenderer::new(DASHBOARD_VIEW, Arc::clone(&ctx.translator))
            .with_error_sink(Arc::clone(&ctx.sink));

        Ok(Self {
            poller,
            renderer,
            translator: Arc::clone(&ctx.translator),
        })
    }

    pub fn name(&self) -> &str {
        DASHBOARD_VIEW
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedView<ListRecord>> {
        self.poller.subscribe()
    }

    pub fn refresh(&self) {
        self.poller.refresh();
    }

    pub fn render(&self) -> TableFrame {
        let view = self.poller.view();
        let rows = self.renderer.render_all(view.items(), &DashboardFormatter);
        TableFrame {
            title: self.translator.t("view.dashboard"),
            headers: Vec::new(),
            rows,
            loading: view.loading,
            last_error: view.last_error.clone(),
            busy: Vec::new(),
            footer: view
                .snapshot
                .as_ref()
                .map(|s| format!("updated {}", s.fetched_at.format("%H:%M:%S"))),
        }
    }

    pub fn stop(&self) {
        self.poller.stop();
    }
}
