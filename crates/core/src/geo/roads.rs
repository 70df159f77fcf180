//! Road graph for hazard-aware routing.
//!
//! Undirected weighted graph loaded once at startup; nodes carry coordinates
//! and edges carry base driving distance. An R-tree over the nodes backs the
//! snap operation that anchors arbitrary coordinates onto the graph.

use rstar::primitives::GeomWithData;
use rstar::RTree;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core_types::geo::Coordinate;
use crate::error::RiskError;

type IndexedNode = GeomWithData<[f64; 2], u32>;

/// Maximum distance a coordinate may be from its snapped node.
pub const MAX_SNAP_KM: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadNode {
    pub id: u32,
    pub coordinate: Coordinate,
}

/// An undirected road link; traversable in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoadEdge {
    pub from: u32,
    pub to: u32,
    pub distance_km: f64,
}

pub struct RoadGraph {
    nodes: Vec<RoadNode>,
    edges: Vec<RoadEdge>,
    /// node id -> (neighbor id, edge index) pairs, sorted by neighbor id.
    adjacency: FxHashMap<u32, Vec<(u32, usize)>>,
    node_index: RTree<IndexedNode>,
}

impl RoadGraph {
    /// Build the graph. Node ids must be dense indices into `nodes`.
    ///
    /// # Panics
    /// Panics on an edge referencing a missing node; the graph comes from the
    /// startup loader, not request input.
    pub fn new(nodes: Vec<RoadNode>, edges: Vec<RoadEdge>) -> Self {
        let mut adjacency: FxHashMap<u32, Vec<(u32, usize)>> = FxHashMap::default();
        for (idx, edge) in edges.iter().enumerate() {
            assert!(
                (edge.from as usize) < nodes.len() && (edge.to as usize) < nodes.len(),
                "road edge references unknown node"
            );
            adjacency.entry(edge.from).or_default().push((edge.to, idx));
            adjacency.entry(edge.to).or_default().push((edge.from, idx));
        }
        for neighbors in adjacency.values_mut() {
            neighbors.sort_by(|a, b| a.0.cmp(&b.0));
        }

        let node_index = RTree::bulk_load(
            nodes
                .iter()
                .map(|n| IndexedNode::new([n.coordinate.lng, n.coordinate.lat], n.id))
                .collect(),
        );

        RoadGraph {
            nodes,
            edges,
            adjacency,
            node_index,
        }
    }

    pub fn node(&self, id: u32) -> &RoadNode {
        &self.nodes[id as usize]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edges(&self) -> &[RoadEdge] {
        &self.edges
    }

    pub fn edge(&self, index: usize) -> &RoadEdge {
        &self.edges[index]
    }

    /// Neighbors of `id` as (neighbor id, edge index), in ascending id order.
    pub fn neighbors(&self, id: u32) -> &[(u32, usize)] {
        self.adjacency.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Midpoint of an edge, where its hazard is evaluated.
    pub fn edge_midpoint(&self, edge: &RoadEdge) -> Coordinate {
        self.node(edge.from)
            .coordinate
            .midpoint(&self.node(edge.to).coordinate)
    }

    /// Snap `point` to the nearest graph node.
    ///
    /// # Errors
    /// [`RiskError::SnapFailed`] when the nearest node is farther than
    /// `max_km`, or the graph is empty.
    pub fn snap(&self, point: &Coordinate, max_km: f64) -> Result<u32, RiskError> {
        let hit = self
            .node_index
            .nearest_neighbor(&[point.lng, point.lat])
            .ok_or(RiskError::SnapFailed {
                point: *point,
                nearest_km: f64::INFINITY,
                max_km,
            })?;
        let node = self.node(hit.data);
        let nearest_km = point.haversine_km(&node.coordinate);
        if nearest_km > max_km {
            return Err(RiskError::SnapFailed {
                point: *point,
                nearest_km,
                max_km,
            });
        }
        Ok(hit.data)
    }
}
