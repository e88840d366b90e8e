//! Live feed polling for spreadwatch views.
//!
//! A poller fetches a resource immediately (the "initial" fetch) and then on
//! a fixed interval. Responses may overlap and arrive out of order; every
//! request carries a sequence number and the snapshot slot only applies a
//! response newer than the last one applied. Stopping a poller closes its
//! slot so no in-flight response can change the view afterwards.

pub mod error;
pub mod fetcher;
pub mod poller;
pub mod snapshot;

pub use error::{FeedError, FeedResult};
pub use fetcher::{fetcher_fn, Fetcher, FnFetcher};
pub use poller::{LivePoller, PollerHandle};
pub use snapshot::{ApplyOutcome, FeedSnapshot, FeedView, RequestTicket, SnapshotSlot};
