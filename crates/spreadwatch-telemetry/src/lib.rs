//! Prometheus metrics and structured logging for spreadwatch.
//!
//! - Structured logging with tracing (pretty in development, JSON in production)
//! - `TracingErrorSink`: the error-logging collaborator backed by tracing
//! - Prometheus metrics for feed polling, row rendering and admin mutations

pub mod error;
pub mod error_sink;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use error_sink::TracingErrorSink;
pub use logging::init_logging;
pub use metrics::Metrics;
