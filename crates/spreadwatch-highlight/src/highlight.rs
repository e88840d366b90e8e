//! Highlight calculator.
//!
//! Only supported quotes with a price are eligible. Ineligible quotes keep
//! their slot in the output with an absent deviation, never zero, so the
//! UI can tell "exactly at average" apart from "unsupported".

use rust_decimal::Decimal;
use serde::Serialize;

use spreadwatch_core::{ExchangeId, PriceQuote};

/// Highlight class of one quote cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteBand {
    /// Cheapest eligible quote.
    Min,
    /// Most expensive eligible quote.
    Max,
    /// Eligible, neither extreme (or all eligible prices equal).
    Neutral,
    /// Unsupported or missing price.
    Unsupported,
}

/// Derived highlight data for one instrument. Recomputed per snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HighlightResult {
    pub min_exchange: Option<ExchangeId>,
    pub max_exchange: Option<ExchangeId>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub average_price: Option<Decimal>,
    /// Aligned with the input quotes.
    pub per_quote_deviation_percent: Vec<Option<Decimal>>,
    min_index: Option<usize>,
    max_index: Option<usize>,
    eligible: Vec<bool>,
}

impl HighlightResult {
    /// Whether at least one quote was eligible.
    pub fn has_data(&self) -> bool {
        self.average_price.is_some()
    }

    /// Spread between cheapest and most expensive quote, in percent of the
    /// cheapest. Absent without data or when the cheapest price is zero.
    pub fn spread_percent(&self) -> Option<Decimal> {
        let min = self.min_price?;
        let max = self.max_price?;
        max.checked_sub(min)
            .and_then(|diff| diff.checked_div(min))
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
    }

    /// Deviation of quote `index` from the average.
    pub fn deviation(&self, index: usize) -> Option<Decimal> {
        self.per_quote_deviation_percent.get(index).copied().flatten()
    }

    /// Highlight class of quote `index`.
    pub fn band(&self, index: usize) -> QuoteBand {
        if !self.eligible.get(index).copied().unwrap_or(false) {
            return QuoteBand::Unsupported;
        }
        if self.min_price == self.max_price {
            return QuoteBand::Neutral;
        }
        if self.min_index == Some(index) {
            QuoteBand::Min
        } else if self.max_index == Some(index) {
            QuoteBand::Max
        } else {
            QuoteBand::Neutral
        }
    }
}

/// Compute highlights for one instrument's quotes.
///
/// Ties for min and max go to the first occurrence in input order. If the
/// average is zero, or the sum of prices overflows, no deviation can be
/// expressed and all are absent.
pub fn compute_highlights(quotes: &[PriceQuote]) -> HighlightResult {
    let eligible: Vec<bool> = quotes.iter().map(|q| q.eligible_price().is_some()).collect();

    let mut min: Option<(usize, Decimal)> = None;
    let mut max: Option<(usize, Decimal)> = None;
    // None once the running sum overflows.
    let mut sum = Some(Decimal::ZERO);
    let mut count: u32 = 0;

    for (idx, price) in quotes
        .iter()
        .enumerate()
        .filter_map(|(idx, q)| q.eligible_price().map(|p| (idx, p)))
    {
        if min.map_or(true, |(_, current)| price < current) {
            min = Some((idx, price));
        }
        if max.map_or(true, |(_, current)| price > current) {
            max = Some((idx, price));
        }
        sum = sum.and_then(|s| s.checked_add(price));
        count += 1;
    }

    let average_price = if count == 0 {
        None
    } else {
        sum.and_then(|s| s.checked_div(Decimal::from(count)))
    };

    let per_quote_deviation_percent = quotes
        .iter()
        .map(|q| {
            let price = q.eligible_price()?;
            let avg = average_price?;
            price
                .checked_sub(avg)
                .and_then(|diff| diff.checked_div(avg))
                .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        })
        .collect();

    HighlightResult {
        min_exchange: min.map(|(idx, _)| quotes[idx].exchange_id.clone()),
        max_exchange: max.map(|(idx, _)| quotes[idx].exchange_id.clone()),
        min_price: min.map(|(_, p)| p),
        max_price: max.map(|(_, p)| p),
        average_price,
        per_quote_deviation_percent,
        min_index: min.map(|(idx, _)| idx),
        max_index: max.map(|(idx, _)| idx),
        eligible,
    }
}
