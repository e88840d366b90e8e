//! Error types for spreadwatch-view.

use thiserror::Error;

use spreadwatch_core::CoreError;

/// View service errors.
#[derive(Debug, Error)]
pub enum ViewError {
    /// Input rejected because a modal is open.
    #[error("A dialog is open; answer it first")]
    ModalOpen,
}

/// Why a single row could not be formatted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RowError {
    #[error("Missing field: {0}")]
    MissingField(String),

    #[error("Invalid field {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Unsupported row: {0}")]
    Unsupported(String),

    #[error("Formatter panicked: {0}")]
    Panicked(String),
}

impl RowError {
    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

impl From<CoreError> for RowError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::MissingField(field) => Self::MissingField(field),
            CoreError::InvalidField { field, reason } => Self::InvalidField { field, reason },
            other => Self::Unsupported(other.to_string()),
        }
    }
}

/// Result type alias for view operations.
pub type ViewResult<T> = std::result::Result<T, ViewError>;
