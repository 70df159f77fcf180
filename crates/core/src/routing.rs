//! Hazard-aware routing over the road graph.
//!
//! Edge costs are derived per query from the risk engine (weather varies per
//! call, so nothing is cached across queries); the search itself is plain
//! Dijkstra with integer-metre costs. Edges are scored lazily as the search
//! reaches them, so a query pays only for the part of the graph it explores,
//! not for every edge in the loaded graph.

use std::cell::RefCell;

use pathfinding::prelude::dijkstra;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core_types::geo::Coordinate;
use crate::core_types::rainfall::{RainfallSeries, MAX_FORECAST_HOURS};
use crate::error::RiskError;
use crate::geo::roads::{RoadGraph, MAX_SNAP_KM};
use crate::risk::engine::{RiskEngine, RiskQuery};

/// Trade-off mode between travel distance and hazard avoidance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RouteMode {
    /// Minimum distance; risk ignored.
    Fast,
    /// Distance inflated by `1 + alpha * risk/100`; crosses moderate-risk
    /// edges when the detour would cost more than the penalty.
    Safe,
    /// Edges at or above the hard risk threshold are removed before the
    /// search; falls back to SAFE weighting if that disconnects the graph.
    Safest,
}

/// A computed evacuation route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Ordered coordinates from the snapped origin to the snapped destination.
    pub points: Vec<Coordinate>,
    pub total_distance_km: f64,
    /// Accumulated risk-attributable cost beyond pure distance, in km.
    pub hazard_exposure: f64,
    pub mode: RouteMode,
    /// True when SAFEST could not avoid all blocked edges and the route was
    /// computed with SAFE weighting instead.
    pub fallback: bool,
}

/// One routing request. Weather context is carried so edge risks reflect the
/// caller's forecast horizon and any demo override.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub mode: RouteMode,
    pub hours: usize,
    pub weather_override: Option<RainfallSeries>,
}

/// Per-request memo of edge risk scores, filled lazily as the search touches
/// edges. Lives for one `find_route` call only; the weather context varies
/// per query, so nothing survives across requests.
struct EdgeRiskMemo<'a> {
    engine: &'a RiskEngine,
    roads: &'a RoadGraph,
    request: &'a RouteRequest,
    scores: RefCell<FxHashMap<usize, u8>>,
}

impl<'a> EdgeRiskMemo<'a> {
    fn new(engine: &'a RiskEngine, roads: &'a RoadGraph, request: &'a RouteRequest) -> Self {
        EdgeRiskMemo {
            engine,
            roads,
            request,
            scores: RefCell::new(FxHashMap::default()),
        }
    }

    /// Risk at the edge midpoint, evaluated at most once per request.
    fn score(&self, edge_idx: usize) -> Result<u8, RiskError> {
        if let Some(&score) = self.scores.borrow().get(&edge_idx) {
            return Ok(score);
        }
        let edge = self.roads.edge(edge_idx);
        let mut query = RiskQuery::at(self.roads.edge_midpoint(edge), self.request.hours);
        query.weather_override = self.request.weather_override.clone();
        let score = self.engine.compute_risk(&query)?.score;
        self.scores.borrow_mut().insert(edge_idx, score);
        Ok(score)
    }
}

pub struct HazardRouter {
    engine: RiskEngine,
}

impl HazardRouter {
    pub fn new(engine: RiskEngine) -> Self {
        HazardRouter { engine }
    }

    /// Compute a least-cost route between two coordinates.
    ///
    /// # Errors
    /// [`RiskError::InvalidInput`] for a malformed coordinate or horizon,
    /// [`RiskError::OutOfBounds`] when either endpoint lies outside coverage,
    /// [`RiskError::SnapFailed`] when an endpoint has no nearby road node,
    /// [`RiskError::NoPathFound`] when the endpoints are disconnected.
    pub fn find_route(&self, request: &RouteRequest) -> Result<Route, RiskError> {
        request.origin.validate()?;
        request.destination.validate()?;
        if request.hours == 0 || request.hours > MAX_FORECAST_HOURS {
            return Err(RiskError::InvalidInput(format!(
                "forecast horizon must be 1..={MAX_FORECAST_HOURS} hours, got {}",
                request.hours
            )));
        }
        let coverage = self.engine.geo().coverage();
        for point in [&request.origin, &request.destination] {
            if !coverage.contains(point) {
                return Err(RiskError::OutOfBounds(*point));
            }
        }

        let roads = self.engine.geo().roads();
        let origin = roads.snap(&request.origin, MAX_SNAP_KM)?;
        let destination = roads.snap(&request.destination, MAX_SNAP_KM)?;

        let memo = EdgeRiskMemo::new(&self.engine, roads, request);
        let blocked = self.engine.config().safest_block_score;
        let (path, fallback) = match request.mode {
            RouteMode::Fast => (self.search(roads, origin, destination, None, None)?, false),
            RouteMode::Safe => (
                self.search(roads, origin, destination, Some(&memo), None)?,
                false,
            ),
            RouteMode::Safest => {
                match self.search(roads, origin, destination, Some(&memo), Some(blocked))? {
                    Some(path) => (Some(path), false),
                    None => {
                        warn!(
                            "SAFEST routing disconnected origin from destination, falling back to SAFE weighting"
                        );
                        (
                            self.search(roads, origin, destination, Some(&memo), None)?,
                            true,
                        )
                    }
                }
            }
        };
        let path = path.ok_or(RiskError::NoPathFound)?;

        self.build_route(roads, &path, &memo, request.mode, fallback)
    }

    /// Weighted cost of an edge in kilometres under the current mode.
    fn edge_cost_km(&self, distance_km: f64, risk: u8) -> f64 {
        distance_km * (1.0 + self.engine.config().safety_alpha * f64::from(risk) / 100.0)
    }

    /// Dijkstra over the road graph. A memo enables SAFE weighting;
    /// `blocked_at` additionally removes edges at or above that score.
    fn search(
        &self,
        roads: &RoadGraph,
        origin: u32,
        destination: u32,
        memo: Option<&EdgeRiskMemo<'_>>,
        blocked_at: Option<u8>,
    ) -> Result<Option<Vec<u32>>, RiskError> {
        let failure: RefCell<Option<RiskError>> = RefCell::new(None);
        let result = dijkstra(
            &origin,
            |&node| {
                if failure.borrow().is_some() {
                    return Vec::new();
                }
                roads
                    .neighbors(node)
                    .iter()
                    .filter_map(|&(next, edge_idx)| {
                        let edge = roads.edge(edge_idx);
                        let risk = match memo {
                            Some(memo) => match memo.score(edge_idx) {
                                Ok(score) => score,
                                Err(err) => {
                                    let mut slot = failure.borrow_mut();
                                    if slot.is_none() {
                                        *slot = Some(err);
                                    }
                                    return None;
                                }
                            },
                            None => 0,
                        };
                        if blocked_at.is_some_and(|limit| risk >= limit) {
                            return None;
                        }
                        let cost_km = if memo.is_some() && blocked_at.is_none() {
                            self.edge_cost_km(edge.distance_km, risk)
                        } else {
                            edge.distance_km
                        };
                        // Integer metres give Dijkstra a total order.
                        Some((next, (cost_km * 1000.0).round() as u64))
                    })
                    .collect::<Vec<_>>()
            },
            |&node| node == destination,
        );
        if let Some(err) = failure.into_inner() {
            return Err(err);
        }
        Ok(result.map(|(path, _cost)| path))
    }

    fn build_route(
        &self,
        roads: &RoadGraph,
        path: &[u32],
        memo: &EdgeRiskMemo<'_>,
        mode: RouteMode,
        fallback: bool,
    ) -> Result<Route, RiskError> {
        let points = path
            .iter()
            .map(|&id| roads.node(id).coordinate)
            .collect::<Vec<_>>();

        let mut total_distance_km = 0.0;
        let mut hazard_exposure = 0.0;
        let weighted = mode != RouteMode::Fast && (mode != RouteMode::Safest || fallback);
        for pair in path.windows(2) {
            // Parallel edges: pick the cheapest one under this mode's cost.
            let mut best: Option<(usize, u64)> = None;
            for &(next, edge_idx) in roads.neighbors(pair[0]) {
                if next != pair[1] {
                    continue;
                }
                let edge = roads.edge(edge_idx);
                let cost_km = if weighted {
                    self.edge_cost_km(edge.distance_km, memo.score(edge_idx)?)
                } else {
                    edge.distance_km
                };
                let cost = (cost_km * 1000.0).round() as u64;
                if best.is_none_or(|(_, c)| cost < c) {
                    best = Some((edge_idx, cost));
                }
            }
            if let Some((edge_idx, _)) = best {
                let edge = roads.edge(edge_idx);
                total_distance_km += edge.distance_km;
                if weighted {
                    hazard_exposure +=
                        self.edge_cost_km(edge.distance_km, memo.score(edge_idx)?)
                            - edge.distance_km;
                }
            }
        }

        Ok(Route {
            points,
            total_distance_km,
            hazard_exposure,
            mode,
            fallback,
        })
    }
}
