//! Prometheus metrics for spreadwatch.
//!
//! Covers:
//! - Feed polling (fetch outcomes, latency, discarded responses)
//! - Row rendering fallbacks
//! - Modal queue depth
//! - Admin row mutations
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a build defect; it only happens during
//! static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, Encoder,
    HistogramVec, IntGauge, TextEncoder,
};

use crate::error::TelemetryResult;

/// Fetches performed by feed pollers.
/// Labels: view, outcome (ok/error)
pub static FETCH_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadwatch_fetch_total",
        "Total feed fetches by outcome",
        &["view", "outcome"]
    )
    .unwrap()
});

/// Fetch latency in milliseconds.
pub static FETCH_LATENCY_MS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "spreadwatch_fetch_latency_ms",
        "Feed fetch latency in milliseconds",
        &["view"],
        vec![5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0]
    )
    .unwrap()
});

/// Responses that were not applied.
/// Labels: view, reason (stale/stopped)
pub static SNAPSHOT_DISCARDED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadwatch_snapshot_discarded_total",
        "Fetch responses discarded instead of applied",
        &["view", "reason"]
    )
    .unwrap()
});

/// Rows rendered as fallback.
pub static ROW_FALLBACK_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadwatch_row_fallback_total",
        "Rows replaced by a fallback row after a formatting failure",
        &["view"]
    )
    .unwrap()
});

/// Open plus queued modal requests.
pub static MODAL_QUEUE_DEPTH: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "spreadwatch_modal_queue_depth",
        "Modal requests open or waiting"
    )
    .unwrap()
});

/// Admin row mutations.
/// Labels: view, action, outcome (ok/error/cancelled/busy)
pub static MUTATION_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "spreadwatch_mutation_total",
        "Admin row mutations by outcome",
        &["view", "action", "outcome"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a completed fetch.
    pub fn fetch(view: &str, ok: bool, latency_ms: f64) {
        let outcome = if ok { "ok" } else { "error" };
        FETCH_TOTAL.with_label_values(&[view, outcome]).inc();
        FETCH_LATENCY_MS
            .with_label_values(&[view])
            .observe(latency_ms);
    }

    /// Record a response that was superseded by a newer one.
    pub fn snapshot_stale(view: &str) {
        SNAPSHOT_DISCARDED_TOTAL
            .with_label_values(&[view, "stale"])
            .inc();
    }

    /// Record a response that arrived after its poller stopped.
    pub fn snapshot_stopped(view: &str) {
        SNAPSHOT_DISCARDED_TOTAL
            .with_label_values(&[view, "stopped"])
            .inc();
    }

    /// Record a fallback row.
    pub fn row_fallback(view: &str) {
        ROW_FALLBACK_TOTAL.with_label_values(&[view]).inc();
    }

    /// Set modal queue depth.
    pub fn modal_queue_depth(depth: usize) {
        MODAL_QUEUE_DEPTH.set(depth as i64);
    }

    /// Record an admin mutation outcome.
    pub fn mutation(view: &str, action: &str, outcome: &str) {
        MUTATION_TOTAL
            .with_label_values(&[view, action, outcome])
            .inc();
    }

    /// Render all registered metrics in the text exposition format.
    pub fn encode_text() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
