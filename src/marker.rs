//! Turning query results into markers and handling marker clicks.

use crate::compute::geojson::abbreviate_point_count;
use crate::error::Result;
use crate::index::{ClusterId, ClusterIndex, QueryEntry};
use crate::viewport::MapHost;
use ecomap_types::bbox::LatLng;
use ecomap_types::feature::{FeatureId, PointFeature};
use std::sync::Arc;

/// Category value marking a live GPS position rather than a fixed
/// collection point.
const GPS_CATEGORY: &str = "gps";

/// Stable identity of a marker within one index build.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerKey {
    Cluster(ClusterId),
    Feature(FeatureId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    CollectionPoint,
    Gps,
}

impl Glyph {
    pub fn for_feature(feature: &PointFeature) -> Self {
        match feature.category() {
            Some(GPS_CATEGORY) => Glyph::Gps,
            _ => Glyph::CollectionPoint,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerKind {
    Cluster { id: ClusterId, point_count: usize },
    Point { feature: Arc<PointFeature>, glyph: Glyph },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub key: MarkerKey,
    pub position: LatLng,
    pub kind: MarkerKind,
    /// Larger clusters draw on top.
    pub z_index: i32,
}

impl Marker {
    pub fn from_entry(entry: &QueryEntry) -> Self {
        let position = LatLng::from_lng_lat(entry.coordinates());
        match entry {
            QueryEntry::Cluster(cluster) => Marker {
                key: MarkerKey::Cluster(cluster.id),
                position,
                kind: MarkerKind::Cluster {
                    id: cluster.id,
                    point_count: cluster.point_count,
                },
                z_index: i32::try_from(cluster.point_count).unwrap_or(i32::MAX),
            },
            QueryEntry::Feature(feature) => Marker {
                key: MarkerKey::Feature(feature.id.clone()),
                position,
                kind: MarkerKind::Point {
                    feature: Arc::clone(feature),
                    glyph: Glyph::for_feature(feature),
                },
                z_index: 0,
            },
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self.kind, MarkerKind::Cluster { .. })
    }

    /// Badge text: the abbreviated point count for clusters.
    pub fn label(&self) -> Option<String> {
        match &self.kind {
            MarkerKind::Cluster { point_count, .. } => Some(abbreviate_point_count(*point_count)),
            MarkerKind::Point { .. } => None,
        }
    }
}

/// One marker per entry, in entry order.
pub fn present(entries: &[QueryEntry]) -> Vec<Marker> {
    entries.iter().map(Marker::from_entry).collect()
}

/// What a click did.
#[derive(Debug, Clone, PartialEq)]
pub enum ClickOutcome {
    /// A cluster was clicked; the map zoomed in on it.
    ZoomedTo { zoom: u8, center: LatLng },
    /// A single feature was clicked and handed to the selection callback.
    Selected(Arc<PointFeature>),
}

/// Handle a click on `marker`.
///
/// Clusters zoom the host to their expansion zoom and center on the
/// cluster. Points are passed to `on_select`.
///
/// # Errors
///
/// [`EcomapError::UnknownCluster`](crate::EcomapError::UnknownCluster) when
/// the marker belongs to an earlier index build.
pub fn click<F>(
    marker: &Marker,
    index: &ClusterIndex,
    host: &dyn MapHost,
    on_select: F,
) -> Result<ClickOutcome>
where
    F: FnOnce(&Arc<PointFeature>),
{
    match &marker.kind {
        MarkerKind::Cluster { id, .. } => {
            let zoom = index.expansion_zoom(*id)?;
            host.set_zoom(f64::from(zoom));
            host.pan_to(marker.position);
            log::debug!("Cluster {} expands at zoom {}", id, zoom);
            Ok(ClickOutcome::ZoomedTo {
                zoom,
                center: marker.position,
            })
        }
        MarkerKind::Point { feature, .. } => {
            on_select(feature);
            Ok(ClickOutcome::Selected(Arc::clone(feature)))
        }
    }
}
