//! spreadwatch terminal dashboard.
//!
//! Wires the core services into runnable views:
//! - Price dashboard with cross-exchange min/max highlighting
//! - Admin tables (users, exchanges, symbols, monitoring) with tri-state
//!   sorting and confirmed delete/toggle actions
//! - Console front-end reading commands from stdin

pub mod app;
pub mod client;
pub mod config;
pub mod console;
pub mod error;
pub mod frame;
pub mod views;

pub use app::Application;
pub use client::{ApiClient, RowMutations};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use frame::TableFrame;
