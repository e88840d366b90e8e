//! tracing-backed error sink.

use spreadwatch_core::ErrorSink;
use tracing::error;

/// Forwards absorbed errors to `tracing::error!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingErrorSink;

impl ErrorSink for TracingErrorSink {
    fn log_error(&self, message: &str, err: &dyn std::error::Error, context: &[(&str, String)]) {
        let context = context
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");
        error!(error = %err, context = %context, "{message}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spreadwatch_core::{report_error, CoreError};

    #[test]
    fn test_tracing_sink_without_subscriber() {
        let err = CoreError::MissingField("price".to_string());
        report_error(&TracingErrorSink, "row failed", &err, &[("row", "7".to_string())]);
    }
}
