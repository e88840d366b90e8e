//! Cross-exchange price highlighting.
//!
//! Given every exchange's quote for one instrument, finds the cheapest and
//! most expensive exchange, the mean price, and each quote's deviation from
//! the mean so the dashboard can colour cells.

pub mod highlight;

pub use highlight::{compute_highlights, HighlightResult, QuoteBand};
