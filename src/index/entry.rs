//! Public views returned by cluster index queries.

use ecomap_types::feature::PointFeature;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Number of low bits of a cluster id reserved for the origin zoom.
const ZOOM_BITS: u32 = 5;
const ZOOM_MASK: u64 = (1 << ZOOM_BITS) - 1;

/// Opaque identifier of a cluster.
///
/// Ids are only meaningful for the index build that produced them: after a
/// rebuild, look clusters up again through a fresh query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(u64);

impl ClusterId {
    /// Rebuild an id from its raw value, e.g. after it went through a
    /// GeoJSON round trip in the host UI.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Encode the seed node index and the level holding the children.
    /// Offsetting by the point count keeps cluster ids disjoint from point
    /// indices.
    pub(crate) fn encode(seed_index: usize, child_level: u8, point_total: usize) -> Self {
        debug_assert!(u64::from(child_level) <= ZOOM_MASK);
        Self(((seed_index as u64) << ZOOM_BITS) + u64::from(child_level) + point_total as u64)
    }

    /// Inverse of [`ClusterId::encode`]: `(seed_index, child_level)`.
    pub(crate) fn decode(self, point_total: usize) -> Option<(usize, u8)> {
        let raw = self.0.checked_sub(point_total as u64)?;
        let seed_index = usize::try_from(raw >> ZOOM_BITS).ok()?;
        Some((seed_index, (raw & ZOOM_MASK) as u8))
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A cluster as seen by callers.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterView {
    pub id: ClusterId,
    /// Representative position, `[lng, lat]` (weighted centroid).
    pub coordinates: [f64; 2],
    /// Number of features under the cluster; always at least 2.
    pub point_count: usize,
}

/// One item to draw: a cluster or a single feature.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryEntry {
    Cluster(ClusterView),
    Feature(Arc<PointFeature>),
}

impl QueryEntry {
    pub fn is_cluster(&self) -> bool {
        matches!(self, QueryEntry::Cluster(_))
    }

    /// `[lng, lat]` of the entry.
    pub fn coordinates(&self) -> [f64; 2] {
        match self {
            QueryEntry::Cluster(cluster) => cluster.coordinates,
            QueryEntry::Feature(feature) => [feature.longitude, feature.latitude],
        }
    }

    /// Number of features this entry stands for (1 for a feature).
    pub fn point_count(&self) -> usize {
        match self {
            QueryEntry::Cluster(cluster) => cluster.point_count,
            QueryEntry::Feature(_) => 1,
        }
    }

    pub fn cluster_id(&self) -> Option<ClusterId> {
        match self {
            QueryEntry::Cluster(cluster) => Some(cluster.id),
            QueryEntry::Feature(_) => None,
        }
    }

    pub fn as_feature(&self) -> Option<&Arc<PointFeature>> {
        match self {
            QueryEntry::Cluster(_) => None,
            QueryEntry::Feature(feature) => Some(feature),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_id_encoding() {
        let id = ClusterId::encode(17, 5, 1000);
        assert_eq!(id.get(), (17 << 5) + 5 + 1000);
        assert_eq!(id.decode(1000), Some((17, 5)));
    }

    #[test]
    fn test_cluster_id_decode_rejects_small_values() {
        assert_eq!(ClusterId::from_raw(3).decode(10), None);
    }

    #[test]
    fn test_entry_accessors() {
        let feature = Arc::new(PointFeature::new(1.into(), 2.0, 3.0));
        let entry = QueryEntry::Feature(feature.clone());
        assert!(!entry.is_cluster());
        assert_eq!(entry.point_count(), 1);
        assert_eq!(entry.coordinates(), [2.0, 3.0]);
        assert_eq!(entry.as_feature(), Some(&feature));

        let cluster = QueryEntry::Cluster(ClusterView {
            id: ClusterId::from_raw(99),
            coordinates: [1.0, 1.0],
            point_count: 4,
        });
        assert!(cluster.is_cluster());
        assert_eq!(cluster.point_count(), 4);
        assert_eq!(cluster.cluster_id(), Some(ClusterId::from_raw(99)));
    }
}
