//! Geometry diff between two feed snapshots.

use ecomap_types::feature::{FeatureCollection, FeatureId};
use rustc_hash::FxHashSet;

/// What changed between two snapshots, by feature id.
///
/// Only coordinates are compared: a feature whose properties changed but
/// whose position did not counts as unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotDiff {
    /// Ids present only in the newer snapshot, in its order.
    pub added: Vec<FeatureId>,
    /// Ids present only in the older snapshot, in its order.
    pub removed: Vec<FeatureId>,
    /// Ids present in both with different coordinates.
    pub moved: Vec<FeatureId>,
    /// Ids present in both at the same position.
    pub unchanged: Vec<FeatureId>,
}

impl SnapshotDiff {
    /// `true` when no feature was added, removed or moved.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.moved.is_empty()
    }

    /// Number of ids whose geometry changed in any way.
    pub fn changed(&self) -> usize {
        self.added.len() + self.removed.len() + self.moved.len()
    }
}

/// Compare two snapshots by id.
///
/// Duplicate ids are reported once; the id lookup of each collection
/// decides which occurrence is compared.
///
/// ```
/// use ecomap::feed::diff_snapshots;
/// use ecomap_types::feature::{FeatureCollection, PointFeature};
///
/// let prev: FeatureCollection = vec![
///     PointFeature::new(1.into(), 0.0, 0.0),
///     PointFeature::new(2.into(), 1.0, 1.0),
/// ]
/// .into_iter()
/// .collect();
/// let next: FeatureCollection = vec![
///     PointFeature::new(2.into(), 1.5, 1.0),
///     PointFeature::new(3.into(), 2.0, 2.0),
/// ]
/// .into_iter()
/// .collect();
///
/// let diff = diff_snapshots(&prev, &next);
/// assert_eq!(diff.added, vec![3.into()]);
/// assert_eq!(diff.removed, vec![1.into()]);
/// assert_eq!(diff.moved, vec![2.into()]);
/// ```
pub fn diff_snapshots(prev: &FeatureCollection, next: &FeatureCollection) -> SnapshotDiff {
    let mut diff = SnapshotDiff::default();
    let mut seen: FxHashSet<&FeatureId> = FxHashSet::default();

    for feature in next {
        if !seen.insert(&feature.id) {
            continue;
        }
        let Some(current) = next.get(&feature.id) else {
            continue;
        };
        match prev.get(&feature.id) {
            None => diff.added.push(feature.id.clone()),
            Some(old) if old.same_geometry(current) => diff.unchanged.push(feature.id.clone()),
            Some(_) => diff.moved.push(feature.id.clone()),
        }
    }

    seen.clear();
    for feature in prev {
        if seen.insert(&feature.id) && !next.contains(&feature.id) {
            diff.removed.push(feature.id.clone());
        }
    }

    diff
}
