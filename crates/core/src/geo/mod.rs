//! Geospatial reference data: elevation, rivers, roads, evacuation centers.
//!
//! [`GeoIndex`] is constructed once at process start from data the external
//! loader parsed out of static files, then shared read-only by every
//! component. It is explicitly dependency-injected (no process-level
//! singletons) so tests run against fixture geometry.

pub mod rivers;
pub mod roads;
pub mod terrain;

use serde::{Deserialize, Serialize};

use crate::core_types::geo::{BoundingBox, Coordinate};
use rivers::RiverNetwork;
use roads::RoadGraph;
use terrain::ElevationModel;

/// Evacuation center search: ring step and outer limit in kilometres.
const EVAC_RADIUS_STEP_KM: f64 = 10.0;
const EVAC_MAX_RADIUS_KM: f64 = 200.0;

/// A designated evacuation site. Static reference data, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvacCenter {
    pub id: u32,
    pub name: String,
    pub coordinate: Coordinate,
    pub capacity: u32,
}

/// An evacuation center annotated with distance from a query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvacCenterDistance {
    pub center: EvacCenter,
    pub distance_km: f64,
}

/// Immutable owner of all static reference geometry for the process lifetime.
pub struct GeoIndex {
    coverage: BoundingBox,
    elevation: ElevationModel,
    rivers: RiverNetwork,
    roads: RoadGraph,
    evac_centers: Vec<EvacCenter>,
}

impl GeoIndex {
    pub fn new(
        coverage: BoundingBox,
        elevation: ElevationModel,
        rivers: RiverNetwork,
        roads: RoadGraph,
        evac_centers: Vec<EvacCenter>,
    ) -> Self {
        GeoIndex {
            coverage,
            elevation,
            rivers,
            roads,
            evac_centers,
        }
    }

    /// Operational bounding box; coordinates outside it are rejected (never
    /// clamped) by route and area operations.
    pub fn coverage(&self) -> &BoundingBox {
        &self.coverage
    }

    pub fn elevation(&self) -> &ElevationModel {
        &self.elevation
    }

    pub fn rivers(&self) -> &RiverNetwork {
        &self.rivers
    }

    pub fn roads(&self) -> &RoadGraph {
        &self.roads
    }

    /// Nearest evacuation centers to `point`, ordered by distance.
    ///
    /// Searches expanding 10 km rings out to 200 km and returns the first
    /// non-empty ring's contents, capped at `limit`. An empty result means no
    /// center lies within the outer radius.
    pub fn nearest_evac_centers(&self, point: &Coordinate, limit: usize) -> Vec<EvacCenterDistance> {
        let mut candidates: Vec<EvacCenterDistance> = self
            .evac_centers
            .iter()
            .map(|center| EvacCenterDistance {
                center: center.clone(),
                distance_km: point.haversine_km(&center.coordinate),
            })
            .collect();
        candidates.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));

        let mut radius = EVAC_RADIUS_STEP_KM;
        while radius <= EVAC_MAX_RADIUS_KM {
            let within: Vec<EvacCenterDistance> = candidates
                .iter()
                .filter(|c| c.distance_km <= radius)
                .take(limit)
                .cloned()
                .collect();
            if !within.is_empty() {
                return within;
            }
            radius += EVAC_RADIUS_STEP_KM;
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::rivers::RiverSegment;
    use crate::geo::roads::RoadNode;

    fn index_with_centers(centers: Vec<EvacCenter>) -> GeoIndex {
        let coverage = BoundingBox::new(9.0, 11.0, 122.0, 124.0);
        let elevation = ElevationModel::flat(coverage, 20.0);
        let rivers = RiverNetwork::from_segments(
            vec![RiverSegment {
                id: 0,
                points: vec![Coordinate::new(10.0, 123.0), Coordinate::new(10.1, 123.0)],
            }],
            &elevation,
        );
        let roads = RoadGraph::new(
            vec![RoadNode {
                id: 0,
                coordinate: Coordinate::new(10.0, 123.0),
            }],
            vec![],
        );
        GeoIndex::new(coverage, elevation, rivers, roads, centers)
    }

    fn center(id: u32, lat: f64, lng: f64) -> EvacCenter {
        EvacCenter {
            id,
            name: format!("Center {id}"),
            coordinate: Coordinate::new(lat, lng),
            capacity: 500,
        }
    }

    #[test]
    fn nearest_centers_sorted_and_limited() {
        let index = index_with_centers(vec![
            center(1, 10.5, 123.0),
            center(2, 10.05, 123.0),
            center(3, 10.02, 123.0),
        ]);
        let found = index.nearest_evac_centers(&Coordinate::new(10.0, 123.0), 2);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].center.id, 3);
        assert_eq!(found[1].center.id, 2);
        assert!(found[0].distance_km < found[1].distance_km);
    }

    #[test]
    fn empty_when_nothing_within_max_radius() {
        // Roughly 550 km away, past the 200 km outer ring.
        let index = index_with_centers(vec![center(1, 15.0, 123.0)]);
        let found = index.nearest_evac_centers(&Coordinate::new(10.0, 123.0), 3);
        assert!(found.is_empty());
    }
}
