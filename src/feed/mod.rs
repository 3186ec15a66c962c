//! Periodic polling of the point feed.
//!
//! [`PointFeed`] keeps the latest good snapshot, diffs each new fetch
//! against it and hands updates to its subscribers. A snapshot whose
//! geometry did not change is not published unless
//! [`FeedConfig::publish_unchanged`] is set, so an idle feed never causes
//! an index rebuild downstream.
//!
//! ```no_run
//! # #[cfg(feature = "http")]
//! # async fn run() -> ecomap::Result<()> {
//! use ecomap::feed::{HttpFeatureSource, PointFeed};
//! use ecomap::FeedConfig;
//! use std::sync::Arc;
//!
//! let config = FeedConfig::default();
//! let feed = Arc::new(PointFeed::new(HttpFeatureSource::from_config(&config)?, config));
//! let handle = feed.spawn();
//! // ...
//! handle.stop();
//! handle.join().await;
//! # Ok(())
//! # }
//! ```

mod diff;
mod source;

pub use diff::{SnapshotDiff, diff_snapshots};
pub use source::FeatureSource;
#[cfg(feature = "http")]
pub use source::HttpFeatureSource;

use crate::config::FeedConfig;
use crate::error::Result;
use ecomap_types::feature::FeatureCollection;
use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// One published snapshot.
#[derive(Debug, Clone)]
pub struct FeedUpdate {
    pub snapshot: Arc<FeatureCollection>,
    /// Changes relative to the previously stored snapshot.
    pub diff: SnapshotDiff,
    /// Sequence number of the successful fetch that produced this update.
    pub tick: u64,
}

/// Receives feed updates. Called on the polling task; keep it short.
pub trait FeedSubscriber: Send + Sync {
    fn on_update(&self, update: &FeedUpdate);
}

pub struct PointFeed<S> {
    source: S,
    config: FeedConfig,
    snapshot: RwLock<Option<Arc<FeatureCollection>>>,
    fetches: AtomicU64,
    subscribers: RwLock<Vec<Arc<dyn FeedSubscriber>>>,
}

impl<S: FeatureSource> PointFeed<S> {
    pub fn new(source: S, config: FeedConfig) -> Self {
        Self {
            source,
            config,
            snapshot: RwLock::new(None),
            fetches: AtomicU64::new(0),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    pub fn subscribe(&self, subscriber: Arc<dyn FeedSubscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Latest good snapshot, if any fetch succeeded yet.
    pub fn snapshot(&self) -> Option<Arc<FeatureCollection>> {
        self.snapshot.read().clone()
    }

    /// Fetch once and publish the result.
    ///
    /// Returns the update handed to subscribers, or `None` when the
    /// geometry did not change and unchanged snapshots are not published.
    /// A failed fetch is logged and returned; the stored snapshot is left
    /// untouched.
    pub async fn poll_once(&self) -> Result<Option<FeedUpdate>> {
        let fetched = self.source.fetch_snapshot().await;
        self.apply(fetched)
    }

    fn apply(&self, fetched: Result<FeatureCollection>) -> Result<Option<FeedUpdate>> {
        let next = match fetched {
            Ok(collection) => Arc::new(collection),
            Err(e) => {
                if e.is_transient() {
                    log::warn!("Feed fetch failed, keeping last snapshot: {}", e);
                } else {
                    log::error!("Feed fetch failed, keeping last snapshot: {}", e);
                }
                return Err(e);
            }
        };

        let tick = self.fetches.fetch_add(1, Ordering::Relaxed) + 1;
        let (diff, first) = {
            let mut stored = self.snapshot.write();
            let diff = match stored.as_deref() {
                Some(prev) => diff_snapshots(prev, &next),
                None => diff_snapshots(&FeatureCollection::new(), &next),
            };
            let first = stored.is_none();
            *stored = Some(Arc::clone(&next));
            (diff, first)
        };

        if diff.is_empty() && !first && !self.config.publish_unchanged {
            log::trace!("Feed tick {}: no geometry changes", tick);
            return Ok(None);
        }

        log::debug!(
            "Feed tick {}: {} features ({} added, {} removed, {} moved)",
            tick,
            next.len(),
            diff.added.len(),
            diff.removed.len(),
            diff.moved.len()
        );

        let update = FeedUpdate {
            snapshot: next,
            diff,
            tick,
        };
        let subscribers = self.subscribers.read().clone();
        for subscriber in &subscribers {
            subscriber.on_update(&update);
        }
        Ok(Some(update))
    }
}

impl<S: FeatureSource + 'static> PointFeed<S> {
    /// Poll on a fixed interval until the returned handle is stopped or
    /// dropped.
    ///
    /// The first fetch happens immediately. A slow fetch delays the next
    /// tick rather than overlapping it, and a fetch that completes after
    /// [`FeedHandle::stop`] is discarded.
    pub fn spawn(self: Arc<Self>) -> FeedHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let period = self.config.poll_interval();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {}
                }

                let fetched = self.source.fetch_snapshot().await;
                if stop_requested(&stop_rx) {
                    log::debug!("Feed stopped during fetch, discarding result");
                    break;
                }
                // Already logged.
                let _ = self.apply(fetched);
            }
            log::debug!("Feed polling loop finished");
        });

        FeedHandle { stop_tx, task }
    }
}

fn stop_requested(stop_rx: &watch::Receiver<bool>) -> bool {
    *stop_rx.borrow() || stop_rx.has_changed().is_err()
}

/// Control handle for a running poll loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct FeedHandle {
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// Stop polling. An in-flight fetch completes but is not published.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            log::error!("Feed polling task failed: {}", e);
        }
    }
}
