//! Live feed poller.
//!
//! The initial request is issued when the poller starts, so the view is
//! loading before `start` returns. Every interval tick after that, and every
//! [`PollerHandle::refresh`], issues a background request. Each request
//! runs as its own task so a slow response never delays the schedule.
//!
//! Failures are logged and leave the previous snapshot displayed; polling
//! continues on schedule with no backoff.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use spreadwatch_core::{report_error, ErrorSink};
use spreadwatch_telemetry::{Metrics, TracingErrorSink};

use crate::error::{FeedError, FeedResult};
use crate::fetcher::Fetcher;
use crate::snapshot::{ApplyOutcome, FeedView, RequestTicket, SnapshotSlot};

/// Poller configuration.
pub struct LivePoller {
    name: String,
    interval: Duration,
    sink: Arc<dyn ErrorSink>,
}

impl LivePoller {
    /// Poller for view `name` with the given refresh interval.
    pub fn new(name: impl Into<String>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            interval,
            sink: Arc::new(TracingErrorSink),
        }
    }

    /// Route fetch failures to `sink` instead of tracing.
    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Start polling. Must be called within a Tokio runtime.
    pub fn start<T>(self, fetcher: Arc<dyn Fetcher<T>>) -> FeedResult<PollerHandle<T>>
    where
        T: Send + Sync + 'static,
    {
        if self.interval.is_zero() {
            return Err(FeedError::InvalidInterval(self.interval));
        }

        let slot = SnapshotSlot::new(self.name.clone());
        let token = CancellationToken::new();
        let refresh = Arc::new(Notify::new());
        let ctx = Arc::new(PollContext {
            slot: slot.clone(),
            fetcher,
            sink: self.sink,
        });

        // Loading shows from the moment start returns.
        let initial = slot.issue(true);

        info!(view = %self.name, interval_ms = self.interval.as_millis() as u64, "Starting poller");
        let task = tokio::spawn(run_loop(
            ctx,
            initial,
            self.interval,
            token.clone(),
            Arc::clone(&refresh),
        ));

        Ok(PollerHandle {
            slot,
            token,
            refresh,
            task,
        })
    }
}

/// Running poller. Dropping the handle stops it.
pub struct PollerHandle<T> {
    slot: SnapshotSlot<T>,
    token: CancellationToken,
    refresh: Arc<Notify>,
    task: JoinHandle<()>,
}

impl<T> PollerHandle<T> {
    pub fn name(&self) -> &str {
        self.slot.name()
    }

    /// Receiver notified on every snapshot or status change.
    pub fn subscribe(&self) -> watch::Receiver<FeedView<T>> {
        self.slot.subscribe()
    }

    /// Current view.
    pub fn view(&self) -> FeedView<T> {
        self.slot.view()
    }

    pub fn is_running(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Request an immediate background fetch (e.g. after a mutation).
    pub fn refresh(&self) {
        self.refresh.notify_one();
    }

    /// Stop polling.
    ///
    /// Once this returns no in-flight response can change the view.
    /// Idempotent.
    pub fn stop(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.slot.close();
        self.token.cancel();
        self.task.abort();
        info!(view = %self.slot.name(), "Poller stopped");
    }
}

impl<T> Drop for PollerHandle<T> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<T> std::fmt::Debug for PollerHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerHandle")
            .field("slot", &self.slot)
            .field("running", &self.is_running())
            .finish()
    }
}

struct PollContext<T> {
    slot: SnapshotSlot<T>,
    fetcher: Arc<dyn Fetcher<T>>,
    sink: Arc<dyn ErrorSink>,
}

impl<T: Send + Sync + 'static> PollContext<T> {
    async fn fetch_and_apply(&self, ticket: RequestTicket) {
        let started = Instant::now();
        let result = self.fetcher.fetch().await;
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        let name = self.slot.name();

        Metrics::fetch(name, result.is_ok(), latency_ms);
        if let Err(e) = &result {
            if self.slot.is_live() {
                report_error(
                    self.sink.as_ref(),
                    "Feed fetch failed",
                    e,
                    &[
                        ("view", name.to_string()),
                        ("sequence", ticket.sequence.to_string()),
                        ("initial", ticket.is_initial.to_string()),
                    ],
                );
            }
        }

        match self.slot.complete(ticket, result) {
            ApplyOutcome::Applied => {
                trace!(view = %name, sequence = ticket.sequence, latency_ms, "Snapshot applied");
            }
            ApplyOutcome::Stale { latest } => {
                debug!(view = %name, sequence = ticket.sequence, latest, "Response superseded");
            }
            ApplyOutcome::Failed | ApplyOutcome::Stopped => {}
        }
    }
}

fn spawn_fetch<T: Send + Sync + 'static>(
    ctx: &Arc<PollContext<T>>,
    in_flight: &mut JoinSet<()>,
) -> bool {
    let Some(ticket) = ctx.slot.issue(false) else {
        return false;
    };
    let ctx = Arc::clone(ctx);
    in_flight.spawn(async move { ctx.fetch_and_apply(ticket).await });
    true
}

async fn run_loop<T: Send + Sync + 'static>(
    ctx: Arc<PollContext<T>>,
    initial: Option<RequestTicket>,
    interval: Duration,
    token: CancellationToken,
    refresh: Arc<Notify>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    // The first tick completes at once; the initial request stands in for it.
    ticker.tick().await;
    if let Some(ticket) = initial {
        let ctx = Arc::clone(&ctx);
        in_flight.spawn(async move { ctx.fetch_and_apply(ticket).await });
    }

    loop {
        tokio::select! {
            biased;

            () = token.cancelled() => break,

            _ = ticker.tick() => {
                if !spawn_fetch(&ctx, &mut in_flight) {
                    break;
                }
            }

            () = refresh.notified() => {
                if !spawn_fetch(&ctx, &mut in_flight) {
                    break;
                }
            }

            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    if e.is_panic() {
                        warn!(view = %ctx.slot.name(), "Fetch task panicked");
                    }
                }
            }
        }
    }

    in_flight.abort_all();
    debug!(view = %ctx.slot.name(), "Poll loop exited");
}
