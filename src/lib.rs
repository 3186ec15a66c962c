//! Hierarchical clustering of live recycling-point feeds for interactive maps.
//!
//! The crate polls a point feed, rebuilds a cluster index when the geometry
//! changes and answers "what should be drawn here" for the host map's
//! current viewport.
//!
//! ```rust
//! use ecomap::{BoundingBox, ClusterIndex, ClusterOptions, PointFeature};
//!
//! let points = vec![
//!     PointFeature::new(1.into(), -8.4273, 41.5445),
//!     PointFeature::new(2.into(), -8.4270, 41.5447),
//!     PointFeature::new(3.into(), -9.1393, 38.7223),
//! ];
//! let index = ClusterIndex::load(points, &ClusterOptions::default())?;
//!
//! let portugal = BoundingBox::new(-10.0, 36.0, -6.0, 42.5);
//! let entries = index.query(&portugal, 6.0);
//! assert_eq!(entries.iter().map(|e| e.point_count()).sum::<usize>(), 3);
//! # Ok::<(), ecomap::EcomapError>(())
//! ```

pub mod compute;
pub mod config;
pub mod error;
pub mod feed;
pub mod index;
pub mod marker;
pub mod session;
pub mod viewport;

pub use config::{ClusterOptions, Config, FeedConfig, ViewportConfig};
pub use error::{EcomapError, Result};
pub use index::{ClusterId, ClusterIndex, ClusterView, QueryEntry};

pub use ecomap_types::bbox::{BoundingBox, LatLng};
pub use ecomap_types::feature::{FeatureCollection, FeatureId, PointFeature};

pub use feed::{
    FeatureSource, FeedHandle, FeedSubscriber, FeedUpdate, PointFeed, SnapshotDiff, diff_snapshots,
};
#[cfg(feature = "http")]
pub use feed::HttpFeatureSource;
pub use marker::{ClickOutcome, Glyph, Marker, MarkerKey, MarkerKind};
pub use session::{IndexStore, MapSession};
pub use viewport::{MapHost, Viewport, ViewportTracker};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    //! Commonly used items.

    pub use crate::{
        BoundingBox, ClusterId, ClusterIndex, ClusterOptions, Config, EcomapError, FeatureCollection,
        FeatureId, LatLng, MapHost, MapSession, Marker, MarkerKind, PointFeature, QueryEntry,
        Result,
    };
}
