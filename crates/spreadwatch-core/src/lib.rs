//! Core data types for the spreadwatch dashboard.
//!
//! This crate provides the types shared by every view:
//! - `ListRecord`: opaque field map for one row of an admin list
//! - `PriceQuote`, `InstrumentQuotes`: per-exchange quotes for the dashboard
//! - `ErrorSink`: the error-logging collaborator, plus an in-memory sink

pub mod diagnostics;
pub mod error;
pub mod quote;
pub mod record;

pub use diagnostics::{report_error, ErrorSink, LoggedError, MemorySink, Severity};
pub use error::{CoreError, Result};
pub use quote::{ExchangeId, InstrumentQuotes, PriceQuote};
pub use record::{FieldId, ListRecord};
