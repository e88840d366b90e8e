//! Toast collaborator.

use spreadwatch_core::Severity;

/// Surfaces the outcome of a user-invoked action.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}
