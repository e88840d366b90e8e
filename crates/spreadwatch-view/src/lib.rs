//! View services shared by the dashboard and the admin tables.
//!
//! - `FaultIsolatedRenderer`: formats rows one by one so a malformed record
//!   becomes a fallback row instead of failing the whole list
//! - `ModalBroker`: FIFO queue of alerts and confirmations with a single
//!   visible slot, resolved as awaitable outcomes
//! - `BusyTracker` and `RowActions`: per-row busy state and the
//!   confirm/run/notify flow for mutating row actions
//! - `Translator` and `Notifier`: label lookup and toast collaborators

pub mod action;
pub mod busy;
pub mod error;
pub mod modal;
pub mod notify;
pub mod row;
pub mod translate;

pub use action::{ActionOutcome, RowActions};
pub use busy::{BusyGuard, BusyTracker};
pub use error::{RowError, ViewError, ViewResult};
pub use modal::{ModalAction, ModalBroker, ModalKind, ModalResponse, ModalView};
pub use notify::Notifier;
pub use row::{FaultIsolatedRenderer, RenderedRow, RowFormatter, RowStatus, FALLBACK_MARKER_KEY};
pub use translate::{StaticTranslator, Translator};
