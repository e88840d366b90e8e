//! Fetch function abstraction.
//!
//! Authentication, URLs and payload shapes live behind this trait; the
//! poller only sees a list of items or an error.

use std::future::Future;

use futures_util::future::BoxFuture;

use crate::error::FeedResult;

/// Source of one complete result set.
pub trait Fetcher<T>: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, FeedResult<Vec<T>>>;
}

/// Adapts a closure returning a future into a [`Fetcher`].
pub struct FnFetcher<F>(F);

/// Wrap a closure as a [`Fetcher`].
pub fn fetcher_fn<F>(f: F) -> FnFetcher<F> {
    FnFetcher(f)
}

impl<T, F, Fut> Fetcher<T> for FnFetcher<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = FeedResult<Vec<T>>> + Send + 'static,
{
    fn fetch(&self) -> BoxFuture<'_, FeedResult<Vec<T>>> {
        Box::pin((self.0)())
    }
}
