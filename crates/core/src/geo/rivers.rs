//! River and drainage network: directed channel graph plus overlay geometry.
//!
//! Edges point downstream (with flow); the upstream propagation model walks
//! the reversed adjacency. Built once at startup and read-only afterwards.

use rstar::primitives::GeomWithData;
use rstar::RTree;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::core_types::geo::Coordinate;
use crate::geo::terrain::ElevationModel;

type IndexedVertex = GeomWithData<[f64; 2], u32>;

/// A node of the drainage graph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiverNode {
    pub id: u32,
    pub coordinate: Coordinate,
}

/// A directed channel segment from `from` down to `to`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiverEdge {
    pub from: u32,
    pub to: u32,
    pub length_m: f64,
}

/// Modeled river polyline, kept for proximity queries and map overlays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverSegment {
    pub id: u32,
    pub points: Vec<Coordinate>,
}

impl RiverSegment {
    /// Vertex closest to the middle of the polyline, or `None` when the
    /// loader handed over an empty one.
    pub fn midpoint(&self) -> Option<Coordinate> {
        self.points.get(self.points.len() / 2).copied()
    }
}

pub struct RiverNetwork {
    nodes: Vec<RiverNode>,
    /// node id -> upstream neighbors as (neighbor id, channel length in metres).
    upstream: FxHashMap<u32, Vec<(u32, f64)>>,
    segments: Vec<RiverSegment>,
    /// All nodes, for snapping a query point onto the drainage graph.
    node_index: RTree<IndexedVertex>,
    /// All polyline vertices, for river-proximity distance queries.
    vertex_index: RTree<IndexedVertex>,
}

impl RiverNetwork {
    /// Assemble the network from pre-oriented nodes, downstream edges, and
    /// overlay segments.
    pub fn new(nodes: Vec<RiverNode>, edges: &[RiverEdge], segments: Vec<RiverSegment>) -> Self {
        let mut upstream: FxHashMap<u32, Vec<(u32, f64)>> = FxHashMap::default();
        for edge in edges {
            upstream
                .entry(edge.to)
                .or_default()
                .push((edge.from, edge.length_m));
        }
        // Deterministic traversal order regardless of input edge order.
        for neighbors in upstream.values_mut() {
            neighbors.sort_by(|a, b| a.0.cmp(&b.0));
        }

        let node_index = RTree::bulk_load(
            nodes
                .iter()
                .map(|n| IndexedVertex::new([n.coordinate.lng, n.coordinate.lat], n.id))
                .collect(),
        );
        let vertex_index = RTree::bulk_load(
            segments
                .iter()
                .flat_map(|s| s.points.iter().map(move |p| (s.id, p)))
                .map(|(id, p)| IndexedVertex::new([p.lng, p.lat], id))
                .collect(),
        );

        RiverNetwork {
            nodes,
            upstream,
            segments,
            node_index,
            vertex_index,
        }
    }

    /// Build the directed graph from raw polylines, orienting each edge from
    /// the higher-elevation endpoint to the lower one. Equal elevations fall
    /// back to vertex insertion order so the result is deterministic.
    pub fn from_segments(segments: Vec<RiverSegment>, elevation: &ElevationModel) -> Self {
        let mut ids: FxHashMap<String, u32> = FxHashMap::default();
        let mut nodes: Vec<RiverNode> = Vec::new();
        let mut edges: Vec<RiverEdge> = Vec::new();

        let mut intern = |coord: Coordinate, nodes: &mut Vec<RiverNode>| -> u32 {
            let key = coord.node_key();
            if let Some(&id) = ids.get(&key) {
                return id;
            }
            let id = nodes.len() as u32;
            ids.insert(key, id);
            nodes.push(RiverNode {
                id,
                coordinate: coord,
            });
            id
        };

        for segment in &segments {
            for pair in segment.points.windows(2) {
                let a = intern(pair[0], &mut nodes);
                let b = intern(pair[1], &mut nodes);
                if a == b {
                    continue;
                }
                let elev_a = elevation.elevation_at(&pair[0]);
                let elev_b = elevation.elevation_at(&pair[1]);
                let (from, to) = if elev_a > elev_b {
                    (a, b)
                } else if elev_b > elev_a {
                    (b, a)
                } else if a < b {
                    (a, b)
                } else {
                    (b, a)
                };
                let length_m = pair[0].haversine_km(&pair[1]) * 1000.0;
                edges.push(RiverEdge { from, to, length_m });
            }
        }

        Self::new(nodes, &edges, segments)
    }

    pub fn node(&self, id: u32) -> Option<&RiverNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn segments(&self) -> &[RiverSegment] {
        &self.segments
    }

    /// Upstream neighbors of `id` with channel lengths in metres.
    pub fn upstream_neighbors(&self, id: u32) -> &[(u32, f64)] {
        self.upstream.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Nearest drainage node to `point` with its distance in kilometres.
    pub fn nearest_node(&self, point: &Coordinate) -> Option<(u32, f64)> {
        let hit = self.node_index.nearest_neighbor(&[point.lng, point.lat])?;
        let node = &self.nodes[hit.data as usize];
        Some((hit.data, point.haversine_km(&node.coordinate)))
    }

    /// Distance from `point` to the nearest modeled river vertex, in km.
    /// Returns a large sentinel when no rivers are loaded.
    pub fn distance_to_nearest_km(&self, point: &Coordinate) -> f64 {
        self.vertex_index
            .nearest_neighbor(&[point.lng, point.lat])
            .map_or(999.0, |hit| {
                point.haversine_km(&Coordinate::new(hit.geom()[1], hit.geom()[0]))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::geo::BoundingBox;

    fn straight_segment() -> RiverSegment {
        RiverSegment {
            id: 0,
            points: vec![
                Coordinate::new(10.4, 123.0),
                Coordinate::new(10.3, 123.0),
                Coordinate::new(10.2, 123.0),
            ],
        }
    }

    #[test]
    fn from_segments_orients_downhill() {
        let bounds = BoundingBox::new(10.0, 10.5, 122.5, 123.5);
        // Ramp: north edge high, south edge low.
        let elevation = ElevationModel::from_grid(bounds, 2, 2, vec![0.0, 0.0, 100.0, 100.0]);
        let network = RiverNetwork::from_segments(vec![straight_segment()], &elevation);

        assert_eq!(network.node_count(), 3);
        // Flow runs north (high) to south (low): node 2 (10.2) receives from
        // node 1 (10.3), which receives from node 0 (10.4).
        assert_eq!(network.upstream_neighbors(2).len(), 1);
        assert_eq!(network.upstream_neighbors(2)[0].0, 1);
        assert_eq!(network.upstream_neighbors(1)[0].0, 0);
        assert!(network.upstream_neighbors(0).is_empty());
    }

    #[test]
    fn segment_midpoint_handles_empty_polylines() {
        assert_eq!(
            straight_segment().midpoint(),
            Some(Coordinate::new(10.3, 123.0))
        );
        let empty = RiverSegment {
            id: 1,
            points: Vec::new(),
        };
        assert_eq!(empty.midpoint(), None);
    }

    #[test]
    fn nearest_node_and_proximity() {
        let bounds = BoundingBox::new(10.0, 10.5, 122.5, 123.5);
        let elevation = ElevationModel::flat(bounds, 10.0);
        let network = RiverNetwork::from_segments(vec![straight_segment()], &elevation);

        let query = Coordinate::new(10.21, 123.0);
        let (id, dist_km) = network.nearest_node(&query).unwrap();
        assert_eq!(id, 2);
        assert!(dist_km < 2.0);
        assert!(network.distance_to_nearest_km(&query) < 2.0);
        // Far from the channel the proximity distance grows accordingly.
        assert!(network.distance_to_nearest_km(&Coordinate::new(10.2, 123.4)) > 30.0);
    }
}
