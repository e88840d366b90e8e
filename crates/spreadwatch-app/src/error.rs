//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Feed error: {0}")]
    Feed(#[from] spreadwatch_feed::FeedError),

    #[error("Sort error: {0}")]
    Sort(#[from] spreadwatch_sort::SortError),

    #[error("View error: {0}")]
    View(#[from] spreadwatch_view::ViewError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] spreadwatch_telemetry::TelemetryError),

    #[error("Unknown view: {0}")]
    UnknownView(String),

    #[error("Unknown column {field} in {view}")]
    UnknownColumn { view: String, field: String },

    #[error("No row {id} in {view}")]
    UnknownRow { view: String, id: String },

    #[error("Field {field} of row {id} is not a boolean")]
    NotToggleable { id: String, field: String },

    #[error("Invalid command: {0}")]
    Command(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
