//! Runnable views.

pub mod dashboard;
pub mod table;

use std::sync::Arc;

use spreadwatch_core::ErrorSink;
use spreadwatch_view::{ModalBroker, Notifier, Translator};

pub use dashboard::{DashboardFormatter, DashboardView};
pub use table::{AdminTableView, ColumnFormatter};

/// Services every view is built with.
#[derive(Clone)]
pub struct ViewContext {
    pub translator: Arc<dyn Translator>,
    pub sink: Arc<dyn ErrorSink>,
    pub broker: Arc<ModalBroker>,
    pub notifier: Arc<dyn Notifier>,
}
