//! Application context tying the feed, the index and the viewport together.
//!
//! A [`MapSession`] is built once and shared. Feed updates rebuild the
//! index and swap it in atomically; viewport changes only bump a version.
//! [`MapSession::markers`] requeries when either version moved and serves
//! the memoized markers otherwise.

use crate::config::{ClusterOptions, Config};
use crate::error::{EcomapError, Result};
use crate::feed::{FeedSubscriber, FeedUpdate};
use crate::index::ClusterIndex;
use crate::marker::{self, ClickOutcome, Marker};
use crate::viewport::{MapHost, Viewport, ViewportTracker};
use ecomap_types::bbox::BoundingBox;
use ecomap_types::feature::{FeatureCollection, PointFeature};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

struct Versioned {
    index: Arc<ClusterIndex>,
    version: u64,
}

/// Holds the current index. Readers get either the old or the new index,
/// never a partially built one.
pub struct IndexStore {
    current: RwLock<Versioned>,
}

impl IndexStore {
    pub fn new(index: ClusterIndex) -> Self {
        Self {
            current: RwLock::new(Versioned {
                index: Arc::new(index),
                version: 0,
            }),
        }
    }

    pub fn index(&self) -> Arc<ClusterIndex> {
        Arc::clone(&self.current.read().index)
    }

    pub fn version(&self) -> u64 {
        self.current.read().version
    }

    /// Current index together with its version.
    pub fn load(&self) -> (Arc<ClusterIndex>, u64) {
        let current = self.current.read();
        (Arc::clone(&current.index), current.version)
    }

    /// Install a new index and return its version.
    pub fn swap(&self, index: ClusterIndex) -> u64 {
        let mut current = self.current.write();
        current.index = Arc::new(index);
        current.version += 1;
        current.version
    }
}

struct Memo {
    index_version: u64,
    viewport_version: u64,
    markers: Arc<Vec<Marker>>,
}

pub struct MapSession {
    // Held from reading the build inputs until the new index is swapped in.
    build: Mutex<()>,
    options: RwLock<ClusterOptions>,
    store: IndexStore,
    tracker: Mutex<ViewportTracker>,
    snapshot: RwLock<Arc<FeatureCollection>>,
    category: RwLock<Option<String>>,
    memo: Mutex<Option<Memo>>,
    queries: AtomicU64,
}

impl MapSession {
    /// # Errors
    ///
    /// [`EcomapError::Config`] when any section of `config` is invalid.
    pub fn new(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            build: Mutex::new(()),
            options: RwLock::new(config.cluster.clone()),
            store: IndexStore::new(ClusterIndex::empty(config.cluster.clone())),
            tracker: Mutex::new(ViewportTracker::new(config.viewport.clone())),
            snapshot: RwLock::new(Arc::new(FeatureCollection::new())),
            category: RwLock::new(None),
            memo: Mutex::new(None),
            queries: AtomicU64::new(0),
        })
    }

    pub fn options(&self) -> ClusterOptions {
        self.options.read().clone()
    }

    /// Rebuild with new clustering parameters. Invalid options leave both
    /// the options and the index unchanged.
    pub fn set_cluster_options(&self, options: ClusterOptions) -> Result<u64> {
        let _build = self.build.lock();
        let snapshot = self.snapshot();
        let category = self.category_filter();
        let index = self.build_index(&snapshot, category.as_deref(), &options)?;
        *self.options.write() = options;
        Ok(self.install(index))
    }

    pub fn index(&self) -> Arc<ClusterIndex> {
        self.store.index()
    }

    pub fn index_version(&self) -> u64 {
        self.store.version()
    }

    pub fn viewport(&self) -> Viewport {
        self.tracker.lock().current()
    }

    /// Latest snapshot handed to the session, before category filtering.
    pub fn snapshot(&self) -> Arc<FeatureCollection> {
        Arc::clone(&self.snapshot.read())
    }

    /// Number of index queries run so far.
    pub fn query_count(&self) -> u64 {
        self.queries.load(Ordering::Relaxed)
    }

    /// Replace the feature set and rebuild the index.
    ///
    /// On failure the previous snapshot and index stay in place.
    pub fn apply_snapshot(&self, snapshot: Arc<FeatureCollection>) -> Result<u64> {
        let _build = self.build.lock();
        let category = self.category_filter();
        let index = self.build_index(&snapshot, category.as_deref(), &self.options())?;
        *self.snapshot.write() = snapshot;
        Ok(self.install(index))
    }

    /// Only show features whose `"type"` property equals `category`;
    /// `None` shows everything. Rebuilds the index.
    pub fn set_category_filter(&self, category: Option<String>) -> Result<u64> {
        let _build = self.build.lock();
        let index = self.build_index(&self.snapshot(), category.as_deref(), &self.options())?;
        *self.category.write() = category;
        Ok(self.install(index))
    }

    pub fn category_filter(&self) -> Option<String> {
        self.category.read().clone()
    }

    fn build_index(
        &self,
        snapshot: &FeatureCollection,
        category: Option<&str>,
        options: &ClusterOptions,
    ) -> Result<ClusterIndex> {
        let features = snapshot
            .iter()
            .filter(|feature| matches_category(feature, category))
            .cloned();
        ClusterIndex::load(features, options).inspect_err(|e| {
            log::error!("Keeping previous cluster index: {}", e);
        })
    }

    fn install(&self, index: ClusterIndex) -> u64 {
        let count = index.len();
        let version = self.store.swap(index);
        log::info!("Cluster index v{} built over {} features", version, count);
        version
    }

    /// Forward an idle event from the host map.
    pub fn on_idle(&self, host: &dyn MapHost) -> Option<Viewport> {
        self.tracker.lock().on_idle(host)
    }

    /// Set the viewport directly, e.g. from command-line arguments.
    pub fn set_viewport(&self, bbox: BoundingBox, zoom: f64) -> Option<Viewport> {
        self.tracker.lock().update(bbox, zoom)
    }

    /// Markers for the current index and viewport.
    pub fn markers(&self) -> Arc<Vec<Marker>> {
        let (index, index_version) = self.store.load();
        let viewport = self.viewport();

        let mut memo = self.memo.lock();
        if let Some(cached) = memo.as_ref() {
            if cached.index_version == index_version && cached.viewport_version == viewport.version
            {
                return Arc::clone(&cached.markers);
            }
        }

        self.queries.fetch_add(1, Ordering::Relaxed);
        let markers = Arc::new(marker::present(&index.query(&viewport.bbox, viewport.zoom)));
        *memo = Some(Memo {
            index_version,
            viewport_version: viewport.version,
            markers: Arc::clone(&markers),
        });
        markers
    }

    /// Push the current markers to `host`.
    pub fn render(&self, host: &dyn MapHost) -> Arc<Vec<Marker>> {
        let markers = self.markers();
        host.show_markers(&markers);
        markers
    }

    /// Handle a marker click against the current index.
    pub fn click<F>(&self, marker: &Marker, host: &dyn MapHost, on_select: F) -> Result<ClickOutcome>
    where
        F: FnOnce(&Arc<PointFeature>),
    {
        let index = self.index();
        marker::click(marker, &index, host, on_select).inspect_err(|e| {
            if matches!(e, EcomapError::UnknownCluster(_)) {
                log::debug!("Click on a marker from an earlier index build: {}", e);
            }
        })
    }
}

impl FeedSubscriber for MapSession {
    fn on_update(&self, update: &FeedUpdate) {
        // Failures are logged by the rebuild.
        let _ = self.apply_snapshot(Arc::clone(&update.snapshot));
    }
}

fn matches_category(feature: &PointFeature, category: Option<&str>) -> bool {
    match category {
        Some(wanted) => feature.category() == Some(wanted),
        None => true,
    }
}
