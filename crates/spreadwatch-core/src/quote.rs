//! Per-exchange price quotes for one instrument.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, Result};
use crate::record::{kind_of, ListRecord};

/// Exchange identifier (e.g. "binance", "kraken").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeId(String);

impl ExchangeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ExchangeId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One exchange's quote for an instrument.
///
/// A quote without a price, or from an exchange that does not list the
/// instrument, still renders but never takes part in min/max/average.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub exchange_id: ExchangeId,
    pub price: Option<Decimal>,
    pub is_supported: bool,
}

impl PriceQuote {
    /// Supported quote with an optional price.
    pub fn new(exchange_id: impl Into<ExchangeId>, price: Option<Decimal>) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            price,
            is_supported: true,
        }
    }

    /// Quote from an exchange that does not list the instrument.
    pub fn unsupported(exchange_id: impl Into<ExchangeId>) -> Self {
        Self {
            exchange_id: exchange_id.into(),
            price: None,
            is_supported: false,
        }
    }

    /// Price if this quote is eligible for highlight computation.
    pub fn eligible_price(&self) -> Option<Decimal> {
        if self.is_supported {
            self.price
        } else {
            None
        }
    }
}

/// All quotes for one instrument, in backend order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstrumentQuotes {
    pub symbol: String,
    pub quotes: Vec<PriceQuote>,
}

impl InstrumentQuotes {
    /// Parse an instrument row from the price endpoint.
    ///
    /// Expected shape:
    /// `{"symbol": "BTC", "quotes": [{"exchange": "binance", "price": 100.5, "supported": true}]}`
    ///
    /// `price` may be a number, a decimal string, or `null`. `supported`
    /// defaults to true. Anything else is an error so the caller can isolate
    /// the row.
    pub fn from_record(record: &ListRecord) -> Result<Self> {
        let symbol = match record.get("symbol") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(other) => {
                return Err(CoreError::invalid(
                    "symbol",
                    format!("expected non-empty string, got {}", kind_of(other)),
                ))
            }
            None => return Err(CoreError::MissingField("symbol".to_string())),
        };

        let raw_quotes = match record.get("quotes") {
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(CoreError::invalid(
                    "quotes",
                    format!("expected array, got {}", kind_of(other)),
                ))
            }
            None => return Err(CoreError::MissingField("quotes".to_string())),
        };

        let quotes = raw_quotes
            .iter()
            .enumerate()
            .map(|(idx, raw)| parse_quote(idx, raw))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { symbol, quotes })
    }
}

fn parse_quote(idx: usize, raw: &Value) -> Result<PriceQuote> {
    let obj = raw
        .as_object()
        .ok_or_else(|| CoreError::invalid(&format!("quotes[{idx}]"), "expected object"))?;

    let exchange = obj
        .get("exchange")
        .or_else(|| obj.get("exchange_id"))
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CoreError::MissingField(format!("quotes[{idx}].exchange")))?;

    let price = match obj.get("price") {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(parse_decimal(&n.to_string(), idx)?),
        Some(Value::String(s)) => Some(parse_decimal(s.trim(), idx)?),
        Some(other) => {
            return Err(CoreError::invalid(
                &format!("quotes[{idx}].price"),
                format!("expected number, got {}", kind_of(other)),
            ))
        }
    };

    let is_supported = match obj.get("supported").or_else(|| obj.get("is_supported")) {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(CoreError::invalid(
                &format!("quotes[{idx}].supported"),
                format!("expected boolean, got {}", kind_of(other)),
            ))
        }
    };

    Ok(PriceQuote {
        exchange_id: ExchangeId::new(exchange),
        price,
        is_supported,
    })
}

fn parse_decimal(raw: &str, idx: usize) -> Result<Decimal> {
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| CoreError::invalid(&format!("quotes[{idx}].price"), format!("not a price: {raw:?}")))
}
