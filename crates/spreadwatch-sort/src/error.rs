//! Sort error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SortError {
    #[error("Field is not declared sortable for this view: {0}")]
    UndeclaredField(String),
}

pub type SortResult<T> = Result<T, SortError>;
