//! Hierarchical point clustering for map viewports.
//!
//! [`ClusterIndex::load`] projects features onto the Web-Mercator unit
//! square and builds one level per zoom, from `max_zoom + 1` (raw points)
//! down to `min_zoom`. Each level is produced from the one above it by
//! walking nodes in table order: an unvisited node gathers every unvisited
//! neighbor within `radius` pixels and becomes a cluster at the weighted
//! centroid when the merge reaches `min_points`. Pixel distances are
//! measured on a world `2 * extent` pixels wide at zoom 0, so the merge
//! distance for level `z` is `radius / (extent * 2^(z + 1))` in projected
//! units. Every level keeps an R*-tree over its node positions.
//!
//! ```rust
//! use ecomap::{BoundingBox, ClusterIndex, ClusterOptions};
//! use ecomap_types::feature::PointFeature;
//!
//! let features = vec![
//!     PointFeature::new(1.into(), 0.0, 0.0),
//!     PointFeature::new(2.into(), 0.0001, 0.0001),
//!     PointFeature::new(3.into(), 50.0, 50.0),
//! ];
//! let index = ClusterIndex::load(features, &ClusterOptions::default())?;
//!
//! let entries = index.query(&BoundingBox::world(), 0.0);
//! assert_eq!(entries.len(), 2);
//! # Ok::<(), ecomap::EcomapError>(())
//! ```

mod entry;
mod level;

pub use entry::{ClusterId, ClusterView, QueryEntry};

use crate::compute::projection::{lat_to_y, lng_to_x, radius_at_zoom, x_to_lng, y_to_lat};
use crate::compute::validation::validate_bbox;
use crate::config::ClusterOptions;
use crate::error::{EcomapError, Result};
use ecomap_types::bbox::BoundingBox;
use ecomap_types::feature::PointFeature;
use level::{Node, NodeSource, ZoomLevel};
use std::fmt;
use std::sync::Arc;

/// An immutable cluster hierarchy over one set of features.
pub struct ClusterIndex {
    options: ClusterOptions,
    features: Vec<Arc<PointFeature>>,
    /// `levels[z - min_zoom]` for `z` in `min_zoom..=max_zoom + 1`.
    levels: Vec<ZoomLevel>,
}

impl ClusterIndex {
    /// An index with no points; every query on it is empty.
    pub fn empty(options: ClusterOptions) -> Self {
        Self {
            options,
            features: Vec::new(),
            levels: Vec::new(),
        }
    }

    /// Build the hierarchy.
    ///
    /// The result depends only on the input order and `options`. Features
    /// with non-finite coordinates are skipped with a warning; callers are
    /// expected to filter them beforehand (see
    /// [`retain_valid_features`](crate::compute::validation::retain_valid_features)).
    ///
    /// # Errors
    ///
    /// Returns [`EcomapError::IndexBuild`] when `options` are invalid.
    pub fn load<I>(features: I, options: &ClusterOptions) -> Result<Self>
    where
        I: IntoIterator<Item = PointFeature>,
    {
        options.validate().map_err(EcomapError::IndexBuild)?;

        let mut kept = Vec::new();
        let mut nodes = Vec::new();
        for feature in features {
            if !feature.has_finite_coordinates() {
                log::warn!(
                    "Skipping feature {} with non-finite coordinates while building index",
                    feature.id
                );
                continue;
            }
            nodes.push(Node::point(
                lng_to_x(feature.longitude),
                lat_to_y(feature.latitude),
                kept.len(),
            ));
            kept.push(Arc::new(feature));
        }

        if kept.is_empty() {
            return Ok(Self::empty(options.clone()));
        }

        let point_total = kept.len();
        let mut levels = Vec::with_capacity(usize::from(options.max_zoom - options.min_zoom) + 2);
        let mut current = ZoomLevel::new(nodes);
        for zoom in (options.min_zoom..=options.max_zoom).rev() {
            let coarser = cluster_level(&mut current, zoom, options, point_total);
            levels.push(current);
            current = ZoomLevel::new(coarser);
        }
        levels.push(current);
        levels.reverse();

        log::debug!(
            "Built cluster index over {} features ({} levels, {} nodes at zoom {})",
            point_total,
            levels.len(),
            levels[0].len(),
            options.min_zoom
        );

        Ok(Self {
            options: options.clone(),
            features: kept,
            levels,
        })
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Number of indexed features.
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Indexed features in load order.
    pub fn features(&self) -> &[Arc<PointFeature>] {
        &self.features
    }

    /// Inclusive range of zoom levels with distinct content. Queries above
    /// the upper bound behave like the upper bound.
    pub fn zoom_range(&self) -> (u8, u8) {
        (self.options.min_zoom, self.options.max_zoom + 1)
    }

    /// Round `zoom` to the nearest level and clamp it to [`zoom_range`].
    ///
    /// [`zoom_range`]: ClusterIndex::zoom_range
    pub fn limit_zoom(&self, zoom: f64) -> u8 {
        let (min, max) = self.zoom_range();
        if zoom.is_nan() {
            return min;
        }
        zoom.round().clamp(f64::from(min), f64::from(max)) as u8
    }

    fn level(&self, zoom: u8) -> Option<&ZoomLevel> {
        let offset = zoom.checked_sub(self.options.min_zoom)?;
        self.levels.get(usize::from(offset))
    }

    /// Clusters and single features to draw for `bbox` at `zoom`.
    ///
    /// Latitudes are clamped to the poles, longitudes wrap, boxes at least
    /// 360° wide cover the world and boxes with `west > east` are answered
    /// as two queries on either side of the antimeridian (eastern part
    /// first).
    pub fn query(&self, bbox: &BoundingBox, zoom: f64) -> Vec<QueryEntry> {
        if self.is_empty() {
            return Vec::new();
        }
        if let Err(e) = validate_bbox(bbox) {
            log::warn!("Rejecting bounding box query: {}", e);
            return Vec::new();
        }

        let zoom = self.limit_zoom(zoom);
        let (mut south, mut north) = (bbox.south, bbox.north);
        if south > north {
            std::mem::swap(&mut south, &mut north);
        }
        let min_lat = south.clamp(-90.0, 90.0);
        let max_lat = north.clamp(-90.0, 90.0);

        let (min_lng, max_lng) = if bbox.east - bbox.west >= 360.0 {
            (-180.0, 180.0)
        } else {
            // 180 is kept as is on either edge.
            let west = if bbox.west == 180.0 {
                180.0
            } else {
                wrap_longitude(bbox.west)
            };
            let east = if bbox.east == 180.0 {
                180.0
            } else {
                wrap_longitude(bbox.east)
            };
            (west, east)
        };

        if min_lng > max_lng {
            let mut entries = self.query_range(min_lng, min_lat, 180.0, max_lat, zoom);
            entries.extend(self.query_range(-180.0, min_lat, max_lng, max_lat, zoom));
            return entries;
        }
        self.query_range(min_lng, min_lat, max_lng, max_lat, zoom)
    }

    fn query_range(
        &self,
        min_lng: f64,
        min_lat: f64,
        max_lng: f64,
        max_lat: f64,
        zoom: u8,
    ) -> Vec<QueryEntry> {
        let Some(level) = self.level(zoom) else {
            return Vec::new();
        };
        level
            .range(
                lng_to_x(min_lng),
                lat_to_y(max_lat),
                lng_to_x(max_lng),
                lat_to_y(min_lat),
            )
            .into_iter()
            .map(|idx| self.entry(&level.nodes[idx]))
            .collect()
    }

    fn entry(&self, node: &Node) -> QueryEntry {
        match node.source {
            NodeSource::Point(idx) => QueryEntry::Feature(Arc::clone(&self.features[idx])),
            NodeSource::Cluster(id) => QueryEntry::Cluster(ClusterView {
                id,
                coordinates: [x_to_lng(node.x), y_to_lat(node.y)],
                point_count: node.num_points,
            }),
        }
    }

    /// Direct children of a cluster, one zoom level down.
    ///
    /// # Errors
    ///
    /// [`EcomapError::UnknownCluster`] when the id does not resolve in this
    /// build. A stale id from an earlier build may also resolve to an
    /// unrelated cluster.
    pub fn children(&self, cluster_id: ClusterId) -> Result<Vec<QueryEntry>> {
        let unknown = || EcomapError::UnknownCluster(cluster_id.get());

        let (seed_index, child_level) = cluster_id.decode(self.len()).ok_or_else(unknown)?;
        if child_level <= self.options.min_zoom {
            return Err(unknown());
        }
        let level = self.level(child_level).ok_or_else(unknown)?;
        let seed = level.nodes.get(seed_index).ok_or_else(unknown)?;

        let radius = merge_radius(&self.options, child_level - 1);
        let children: Vec<QueryEntry> = level
            .within(seed.x, seed.y, radius)
            .into_iter()
            .filter(|&idx| level.nodes[idx].parent == Some(cluster_id))
            .map(|idx| self.entry(&level.nodes[idx]))
            .collect();

        if children.is_empty() {
            return Err(unknown());
        }
        Ok(children)
    }

    /// Lowest zoom at which the cluster breaks into more than one entry.
    pub fn expansion_zoom(&self, cluster_id: ClusterId) -> Result<u8> {
        let (_, child_level) = cluster_id
            .decode(self.len())
            .ok_or(EcomapError::UnknownCluster(cluster_id.get()))?;
        let mut children = self.children(cluster_id)?;

        let mut expansion = child_level - 1;
        loop {
            expansion += 1;
            match children.as_slice() {
                [QueryEntry::Cluster(only)] if expansion <= self.options.max_zoom => {
                    children = self.children(only.id)?;
                }
                _ => break,
            }
        }
        Ok(expansion)
    }

    /// Features under a cluster, depth first in child order.
    ///
    /// `limit: None` returns every member; pass a limit and offset to page
    /// through large clusters.
    pub fn leaves(
        &self,
        cluster_id: ClusterId,
        limit: Option<usize>,
        offset: usize,
    ) -> Result<Vec<Arc<PointFeature>>> {
        let mut leaves = Vec::new();
        if limit == Some(0) {
            // Still surface unknown ids.
            self.children(cluster_id)?;
            return Ok(leaves);
        }
        self.append_leaves(&mut leaves, cluster_id, limit, offset, 0)?;
        Ok(leaves)
    }

    fn append_leaves(
        &self,
        leaves: &mut Vec<Arc<PointFeature>>,
        cluster_id: ClusterId,
        limit: Option<usize>,
        offset: usize,
        mut skipped: usize,
    ) -> Result<usize> {
        for child in self.children(cluster_id)? {
            match child {
                QueryEntry::Cluster(cluster) => {
                    if skipped + cluster.point_count <= offset {
                        skipped += cluster.point_count;
                    } else {
                        skipped = self.append_leaves(leaves, cluster.id, limit, offset, skipped)?;
                    }
                }
                QueryEntry::Feature(feature) => {
                    if skipped < offset {
                        skipped += 1;
                    } else {
                        leaves.push(feature);
                    }
                }
            }
            if limit.is_some_and(|limit| leaves.len() >= limit) {
                break;
            }
        }
        Ok(skipped)
    }
}

impl fmt::Debug for ClusterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterIndex")
            .field("options", &self.options)
            .field("features", &self.features.len())
            .field("levels", &self.levels.len())
            .finish()
    }
}

/// Build the level for `zoom` from the finer level above it.
fn cluster_level(
    finer: &mut ZoomLevel,
    zoom: u8,
    options: &ClusterOptions,
    point_total: usize,
) -> Vec<Node> {
    let radius = merge_radius(options, zoom);
    let mut coarser = Vec::new();

    for i in 0..finer.nodes.len() {
        if finer.nodes[i].visited {
            continue;
        }
        finer.nodes[i].visited = true;

        let (x, y) = (finer.nodes[i].x, finer.nodes[i].y);
        let own_points = finer.nodes[i].num_points;
        let neighbors = finer.within(x, y, radius);

        let num_points = own_points
            + neighbors
                .iter()
                .filter(|&&n| !finer.nodes[n].visited)
                .map(|&n| finer.nodes[n].num_points)
                .sum::<usize>();

        if num_points > own_points && num_points >= options.min_points {
            let id = ClusterId::encode(i, zoom + 1, point_total);
            let mut wx = x * own_points as f64;
            let mut wy = y * own_points as f64;

            for &n in &neighbors {
                let neighbor = &mut finer.nodes[n];
                if neighbor.visited {
                    continue;
                }
                neighbor.visited = true;
                wx += neighbor.x * neighbor.num_points as f64;
                wy += neighbor.y * neighbor.num_points as f64;
                neighbor.parent = Some(id);
            }

            finer.nodes[i].parent = Some(id);
            coarser.push(Node::cluster(
                wx / num_points as f64,
                wy / num_points as f64,
                id,
                num_points,
            ));
        } else {
            coarser.push(finer.nodes[i].carried());
            if num_points > 1 {
                for &n in &neighbors {
                    if finer.nodes[n].visited {
                        continue;
                    }
                    finer.nodes[n].visited = true;
                    coarser.push(finer.nodes[n].carried());
                }
            }
        }
    }

    coarser
}

/// Merge distance in projected units for the level at `zoom`.
fn merge_radius(options: &ClusterOptions, zoom: u8) -> f64 {
    radius_at_zoom(options.radius, options.extent, i32::from(zoom) + 1)
}

fn wrap_longitude(lng: f64) -> f64 {
    (lng + 180.0).rem_euclid(360.0) - 180.0
}
