//! Poller lifecycle tests.
//!
//! Run with a paused clock so interval ticks are deterministic.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::oneshot;

use spreadwatch_core::MemorySink;
use spreadwatch_feed::{fetcher_fn, FeedError, FeedResult, Fetcher, LivePoller};

/// Returns the call number; the first call blocks until released.
struct GatedFetcher {
    calls: AtomicU32,
    gate: Mutex<Option<oneshot::Receiver<Vec<u32>>>>,
}

impl GatedFetcher {
    fn new() -> (Arc<Self>, oneshot::Sender<Vec<u32>>) {
        let (tx, rx) = oneshot::channel();
        let fetcher = Arc::new(Self {
            calls: AtomicU32::new(0),
            gate: Mutex::new(Some(rx)),
        });
        (fetcher, tx)
    }
}

impl Fetcher<u32> for GatedFetcher {
    fn fetch(&self) -> BoxFuture<'_, FeedResult<Vec<u32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let gate = if call == 1 { self.gate.lock().take() } else { None };
        Box::pin(async move {
            match gate {
                Some(rx) => rx.await.map_err(|_| FeedError::Fetch("gate dropped".into())),
                None => Ok(vec![call]),
            }
        })
    }
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_initial_fetch_tagged_once() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let fetcher: Arc<dyn Fetcher<u32>> = Arc::new(fetcher_fn(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok::<_, FeedError>(vec![n]) }
    }));

    let handle = LivePoller::new("users", Duration::from_millis(100))
        .start(fetcher)
        .unwrap();
    let mut rx = handle.subscribe();

    rx.wait_for(|view| view.snapshot.is_some()).await.unwrap();
    let first = handle.view().snapshot.unwrap();
    assert!(first.is_initial);
    assert_eq!(first.items, vec![1]);

    let mut initial_seen = 1;
    for _ in 0..3 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        settle().await;
        let snapshot = handle.view().snapshot.unwrap();
        if snapshot.is_initial {
            initial_seen += 1;
        }
    }

    assert_eq!(initial_seen, 1);
    assert!(calls.load(Ordering::SeqCst) >= 4);
    assert!(!handle.view().snapshot.unwrap().is_initial);
}

#[tokio::test(start_paused = true)]
async fn test_loading_visible_as_soon_as_started() {
    let (fetcher, release_initial) = GatedFetcher::new();
    let handle = LivePoller::new("users", Duration::from_secs(60))
        .start(fetcher as Arc<dyn Fetcher<u32>>)
        .unwrap();

    // No yield yet: the poll task has not run.
    let view = handle.view();
    assert!(view.loading);
    assert!(view.snapshot.is_none());

    release_initial.send(vec![7]).unwrap();
    let mut rx = handle.subscribe();
    rx.wait_for(|view| view.snapshot.is_some()).await.unwrap();
    let view = handle.view();
    assert!(!view.loading);
    assert_eq!(view.items(), &[7]);
}

#[tokio::test(start_paused = true)]
async fn test_slow_initial_response_does_not_overwrite_newer() {
    let (fetcher, release_initial) = GatedFetcher::new();
    let handle = LivePoller::new("prices", Duration::from_millis(100))
        .start(fetcher.clone() as Arc<dyn Fetcher<u32>>)
        .unwrap();

    settle().await;
    assert!(handle.view().loading);

    // Second (background) request completes while the initial one hangs.
    tokio::time::sleep(Duration::from_millis(100)).await;
    settle().await;
    let view = handle.view();
    assert_eq!(view.items(), &[2]);
    assert!(!view.loading);
    let newer = view.sequence().unwrap();

    // Initial response finally arrives with older data.
    release_initial.send(vec![1]).unwrap();
    settle().await;
    let view = handle.view();
    assert!(view.sequence().unwrap() >= newer);
    assert_ne!(view.items(), &[1]);
}

#[tokio::test(start_paused = true)]
async fn test_failures_keep_data_and_polling_continues() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let fetcher: Arc<dyn Fetcher<u32>> = Arc::new(fetcher_fn(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move {
            if n == 1 {
                Ok(vec![n])
            } else {
                Err(FeedError::Http {
                    status: 502,
                    body: "bad gateway".into(),
                })
            }
        }
    }));
    let sink = Arc::new(MemorySink::new(16));

    let handle = LivePoller::new("monitoring", Duration::from_millis(50))
        .with_error_sink(sink.clone())
        .start(fetcher)
        .unwrap();

    tokio::time::sleep(Duration::from_millis(175)).await;
    settle().await;

    let view = handle.view();
    assert_eq!(view.items(), &[1]);
    assert_eq!(view.last_error.as_deref(), Some("HTTP 502: bad gateway"));
    assert!(calls.load(Ordering::SeqCst) >= 4);

    let entries = sink.entries();
    assert!(entries.len() >= 3);
    assert_eq!(entries[0].context_value("view"), Some("monitoring"));
    assert_eq!(entries[0].context_value("initial"), Some("false"));
}

#[tokio::test(start_paused = true)]
async fn test_stop_blocks_in_flight_response() {
    let (fetcher, release_initial) = GatedFetcher::new();
    let handle = LivePoller::new("exchanges", Duration::from_secs(60))
        .start(fetcher.clone() as Arc<dyn Fetcher<u32>>)
        .unwrap();
    settle().await;
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

    handle.stop();
    assert!(!handle.is_running());
    assert!(!handle.view().loading);

    // The gate receiver was dropped with the aborted task.
    let _ = release_initial.send(vec![42]);
    tokio::time::sleep(Duration::from_secs(120)).await;
    settle().await;

    assert!(handle.view().snapshot.is_none());
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drop_stops_polling() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let fetcher: Arc<dyn Fetcher<u32>> = Arc::new(fetcher_fn(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok::<_, FeedError>(Vec::<u32>::new()) }
    }));

    let handle = LivePoller::new("symbols", Duration::from_millis(10))
        .start(fetcher)
        .unwrap();
    settle().await;
    drop(handle);

    let before = calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(100)).await;
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), before);
}

#[tokio::test(start_paused = true)]
async fn test_refresh_fetches_immediately() {
    let calls = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&calls);
    let fetcher: Arc<dyn Fetcher<u32>> = Arc::new(fetcher_fn(move || {
        let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok::<_, FeedError>(vec![n]) }
    }));

    let handle = LivePoller::new("users", Duration::from_secs(3600))
        .start(fetcher)
        .unwrap();
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    handle.refresh();
    settle().await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let snapshot = handle.view().snapshot.unwrap();
    assert_eq!(snapshot.items, vec![2]);
    assert!(!snapshot.is_initial);
}

#[tokio::test]
async fn test_zero_interval_rejected() {
    let fetcher: Arc<dyn Fetcher<u32>> =
        Arc::new(fetcher_fn(|| async { Ok::<_, FeedError>(Vec::<u32>::new()) }));
    let result = LivePoller::new("bad", Duration::ZERO).start(fetcher);
    assert!(matches!(result, Err(FeedError::InvalidInterval(_))));
}
