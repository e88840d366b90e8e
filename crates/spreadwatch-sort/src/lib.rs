//! Sort engine shared by every list view.
//!
//! - `compare`: direction-aware total order over two records for one field,
//!   dispatched on the field's declared `FieldKind`
//! - `SortSchema`: the fields a view allows sorting on
//! - `SortController`: per-view header-click state machine and stable
//!   projection of an input list

pub mod comparator;
pub mod controller;
pub mod error;
pub mod schema;

pub use comparator::{compare, FieldKind, RankTable, SortDirection};
pub use controller::{SortController, SortCycle, SortState};
pub use error::{SortError, SortResult};
pub use schema::SortSchema;
