//! Feed error types.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Unexpected payload: {0}")]
    Payload(String),

    #[error("Poll interval must be greater than zero, got {0:?}")]
    InvalidInterval(Duration),

    #[error("Record error: {0}")]
    Record(#[from] spreadwatch_core::CoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type FeedResult<T> = Result<T, FeedError>;
