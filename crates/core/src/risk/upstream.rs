//! Upstream rainfall propagation over the drainage graph.
//!
//! Walks the river network against the flow direction from the node nearest
//! a query point, weights each reachable node by exponential distance decay,
//! and blends the nodes' rainfall series into a single influence signal.

use pathfinding::prelude::dijkstra_all;
use rustc_hash::FxHashMap;

use crate::core_types::geo::Coordinate;
use crate::core_types::rainfall::RainfallSeries;
use crate::core_types::risk::UpstreamNode;
use crate::geo::rivers::RiverNetwork;
use crate::risk::config::RiskConfig;
use crate::weather::{SyntheticWeather, WeatherProvider};

/// Result of blending upstream rainfall: the per-hour aggregate series, the
/// normalized 0..100 influence index, and whether any node fell back to
/// synthetic data because the live source failed.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamAggregate {
    pub series: RainfallSeries,
    pub index: f64,
    pub degraded: bool,
}

impl UpstreamAggregate {
    /// Zero influence, used when a point has no drainage connectivity.
    pub fn none(hours: usize) -> Self {
        UpstreamAggregate {
            series: RainfallSeries::zeros(hours),
            index: 0.0,
            degraded: false,
        }
    }
}

/// Request-scoped view over the drainage graph.
pub struct UpstreamModel<'a> {
    rivers: &'a RiverNetwork,
    config: &'a RiskConfig,
}

impl<'a> UpstreamModel<'a> {
    pub fn new(rivers: &'a RiverNetwork, config: &'a RiskConfig) -> Self {
        UpstreamModel { rivers, config }
    }

    /// Dominant upstream contributing nodes for `point`, capped at
    /// `max_nodes`.
    ///
    /// Returns an empty list (not an error) when the point has no river node
    /// within the attach radius or nothing is reachable inside the search
    /// budget; callers treat that as zero influence.
    pub fn find_dominant_upstream(
        &self,
        point: &Coordinate,
        max_nodes: usize,
        hours: usize,
    ) -> Vec<UpstreamNode> {
        let Some((source, attach_km)) = self.rivers.nearest_node(point) else {
            return Vec::new();
        };
        if attach_km > self.config.river_attach_km {
            return Vec::new();
        }

        let budget_m = self.config.upstream_search_distance_m(hours);
        // Integer-metre costs so Dijkstra has a total order.
        let reached = dijkstra_all(&source, |&id| {
            self.rivers
                .upstream_neighbors(id)
                .iter()
                .map(|&(next, length_m)| (next, length_m.round() as u64))
                .collect::<Vec<_>>()
        });

        let mut candidates: Vec<UpstreamNode> = std::iter::once((source, 0u64))
            .chain(reached.iter().map(|(&id, &(_, cost))| (id, cost)))
            .filter(|&(_, cost)| (cost as f64) <= budget_m)
            .filter_map(|(id, cost)| {
                let node = self.rivers.node(id)?;
                let distance_m = cost as f64;
                Some(UpstreamNode {
                    node_id: id,
                    coordinate: node.coordinate,
                    distance_m,
                    contribution_weight: (-distance_m / self.config.upstream_decay_m).exp(),
                })
            })
            .collect();

        // Highest contribution first; ties broken by hydrological distance,
        // then node id, for deterministic output.
        candidates.sort_by(|a, b| {
            b.contribution_weight
                .total_cmp(&a.contribution_weight)
                .then(a.distance_m.total_cmp(&b.distance_m))
                .then(a.node_id.cmp(&b.node_id))
        });
        candidates.truncate(max_nodes);
        candidates
    }

    /// Blend the nodes' rainfall into one per-hour series plus a normalized
    /// influence index.
    ///
    /// Override entries are matched to nodes by coordinate key (5 decimals);
    /// unmatched nodes fall back to the provider, and a node whose provider
    /// fetch fails uses the deterministic synthetic source and marks the
    /// aggregate degraded.
    pub fn aggregate_rainfall(
        &self,
        nodes: &[UpstreamNode],
        hours: usize,
        overrides: &[(Coordinate, RainfallSeries)],
        provider: &dyn WeatherProvider,
    ) -> UpstreamAggregate {
        if nodes.is_empty() {
            return UpstreamAggregate::none(hours);
        }

        let override_map: FxHashMap<String, RainfallSeries> = overrides
            .iter()
            .map(|(coord, series)| (coord.node_key(), series.fit_to_hours(hours)))
            .collect();

        let mut blended = vec![0.0; hours];
        let mut degraded = false;

        for node in nodes {
            let series = match override_map.get(&node.coordinate.node_key()) {
                Some(series) => series.clone(),
                None => provider
                    .rainfall(&node.coordinate, hours)
                    .unwrap_or_else(|err| {
                        tracing::warn!(
                            node_id = node.node_id,
                            error = %err,
                            "upstream rainfall fetch failed, using synthetic fallback"
                        );
                        degraded = true;
                        SyntheticWeather
                            .rainfall(&node.coordinate, hours)
                            .unwrap_or_else(|_| RainfallSeries::zeros(hours))
                    })
                    .fit_to_hours(hours),
            };
            for (slot, value) in blended.iter_mut().zip(series.values()) {
                *slot = (*slot + node.contribution_weight * value).max(0.0);
            }
        }

        let weighted_total: f64 = blended.iter().sum();
        let index =
            (weighted_total / self.config.upstream_norm_divisor * 100.0).clamp(0.0, 100.0);
        let series = RainfallSeries::new(blended).unwrap_or_else(|_| RainfallSeries::zeros(hours));

        UpstreamAggregate {
            series,
            index,
            degraded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::geo::BoundingBox;
    use crate::geo::rivers::RiverSegment;
    use crate::geo::terrain::ElevationModel;
    use approx::assert_relative_eq;

    /// A north-to-south channel with vertices every ~0.01 deg (~1.1 km).
    fn channel() -> RiverNetwork {
        let bounds = BoundingBox::new(9.8, 10.6, 122.5, 123.5);
        // North edge high, so flow runs toward the south end.
        let elevation = ElevationModel::from_grid(bounds, 2, 2, vec![0.0, 0.0, 100.0, 100.0]);
        let points = (0..=20)
            .map(|i| Coordinate::new(10.5 - 0.01 * f64::from(i), 123.0))
            .collect();
        RiverNetwork::from_segments(vec![RiverSegment { id: 0, points }], &elevation)
    }

    #[test]
    fn walk_only_goes_upstream() {
        let rivers = channel();
        let config = RiskConfig::default();
        let model = UpstreamModel::new(&rivers, &config);

        // Query near the downstream (south) end: everything upstream within
        // the 3-hour budget (10.8 km) should be reachable.
        let nodes = model.find_dominant_upstream(&Coordinate::new(10.3, 123.0), 10, 3);
        assert!(!nodes.is_empty());
        // All reported nodes lie at or north of the query latitude.
        assert!(nodes.iter().all(|n| n.coordinate.lat >= 10.29));

        // Query near the upstream (north) end: nothing is above it.
        let top = model.find_dominant_upstream(&Coordinate::new(10.5, 123.0), 10, 3);
        assert_eq!(top.len(), 1);
        assert_relative_eq!(top[0].distance_m, 0.0);
        assert_relative_eq!(top[0].contribution_weight, 1.0);
    }

    #[test]
    fn disconnected_point_returns_empty() {
        let rivers = channel();
        let config = RiskConfig::default();
        let model = UpstreamModel::new(&rivers, &config);
        // ~44 km east of the channel, past the attach radius.
        let nodes = model.find_dominant_upstream(&Coordinate::new(10.3, 123.4), 3, 3);
        assert!(nodes.is_empty());
        let agg = model.aggregate_rainfall(&nodes, 3, &[], &SyntheticWeather);
        assert_relative_eq!(agg.index, 0.0);
        assert_eq!(agg.series, RainfallSeries::zeros(3));
    }

    #[test]
    fn dominant_ranking_is_deterministic() {
        let rivers = channel();
        let config = RiskConfig::default();
        let model = UpstreamModel::new(&rivers, &config);
        let a = model.find_dominant_upstream(&Coordinate::new(10.3, 123.0), 3, 3);
        let b = model.find_dominant_upstream(&Coordinate::new(10.3, 123.0), 3, 3);
        assert_eq!(a, b);
        assert_eq!(a.len(), 3);
        // Nearest node dominates; weights decrease with distance.
        assert!(a[0].contribution_weight >= a[1].contribution_weight);
        assert!(a[1].contribution_weight >= a[2].contribution_weight);
    }

    #[test]
    fn aggregate_weights_override_series() {
        let rivers = channel();
        let config = RiskConfig::default();
        let model = UpstreamModel::new(&rivers, &config);
        let nodes = model.find_dominant_upstream(&Coordinate::new(10.5, 123.0), 1, 3);
        assert_eq!(nodes.len(), 1);

        let override_series = RainfallSeries::new(vec![10.0, 20.0, 30.0]).unwrap();
        let agg = model.aggregate_rainfall(
            &nodes,
            3,
            &[(nodes[0].coordinate, override_series)],
            &SyntheticWeather,
        );
        // Single node at distance 0 has weight 1.0, so the blend equals the
        // override and the index is sum/200*100.
        assert_eq!(agg.series.values(), &[10.0, 20.0, 30.0]);
        assert_relative_eq!(agg.index, 30.0, epsilon = 1e-9);
        assert!(!agg.degraded);
    }

    #[test]
    fn provider_failure_marks_degraded() {
        use crate::weather::UnavailableWeather;
        let rivers = channel();
        let config = RiskConfig::default();
        let model = UpstreamModel::new(&rivers, &config);
        let nodes = model.find_dominant_upstream(&Coordinate::new(10.5, 123.0), 1, 3);
        let agg = model.aggregate_rainfall(&nodes, 3, &[], &UnavailableWeather);
        assert!(agg.degraded);
        // Synthetic fallback still yields non-negative rainfall.
        assert!(agg.series.values().iter().all(|&v| v >= 0.0));
    }
}
