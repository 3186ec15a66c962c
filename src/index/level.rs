//! One zoom level of the cluster hierarchy: a flat node table plus an
//! R*-tree over node positions in projected space.

use super::entry::ClusterId;
use rstar::primitives::GeomWithData;
use rstar::{AABB, RTree};
use smallvec::SmallVec;

/// Position in the unit square tagged with the node's index in the table.
type IndexedNode = GeomWithData<[f64; 2], usize>;

/// Neighbor lists are usually short; keep them on the stack.
pub(crate) type NodeIds = SmallVec<[usize; 16]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeSource {
    /// Index into the loaded feature table.
    Point(usize),
    Cluster(ClusterId),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub x: f64,
    pub y: f64,
    pub source: NodeSource,
    pub num_points: usize,
    /// Cluster that absorbed this node one level up.
    pub parent: Option<ClusterId>,
    /// Set once the node has been handled while building the next level.
    pub visited: bool,
}

impl Node {
    pub fn point(x: f64, y: f64, feature_index: usize) -> Self {
        Self {
            x,
            y,
            source: NodeSource::Point(feature_index),
            num_points: 1,
            parent: None,
            visited: false,
        }
    }

    pub fn cluster(x: f64, y: f64, id: ClusterId, num_points: usize) -> Self {
        Self {
            x,
            y,
            source: NodeSource::Cluster(id),
            num_points,
            parent: None,
            visited: false,
        }
    }

    /// Copy of this node for the next coarser level.
    pub fn carried(&self) -> Self {
        Self {
            parent: None,
            visited: false,
            ..self.clone()
        }
    }
}

pub(crate) struct ZoomLevel {
    pub nodes: Vec<Node>,
    tree: RTree<IndexedNode>,
}

impl ZoomLevel {
    pub fn new(nodes: Vec<Node>) -> Self {
        let tree = RTree::bulk_load(
            nodes
                .iter()
                .enumerate()
                .map(|(idx, node)| IndexedNode::new([node.x, node.y], idx))
                .collect(),
        );
        Self { nodes, tree }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Nodes within `radius` of `(x, y)` (inclusive), in table order.
    pub fn within(&self, x: f64, y: f64, radius: f64) -> NodeIds {
        let mut ids: NodeIds = self
            .tree
            .locate_within_distance([x, y], radius * radius)
            .map(|node| node.data)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Nodes inside the projected rectangle (inclusive), in table order.
    pub fn range(&self, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Vec<usize> {
        let envelope = AABB::from_corners([min_x, min_y], [max_x, max_y]);
        let mut ids: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|node| node.data)
            .collect();
        ids.sort_unstable();
        ids
    }
}
