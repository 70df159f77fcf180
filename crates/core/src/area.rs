//! Grid sampling of flood risk over a bounded region.
//!
//! The most compute-heavy operation in the core: up to `max_points` full risk
//! evaluations. Samples share no mutable state, so they are evaluated in
//! parallel; a cancelled scan stops scheduling new samples but lets in-flight
//! ones finish.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core_types::geo::{BoundingBox, Coordinate};
use crate::core_types::rainfall::{RainfallSeries, MAX_FORECAST_HOURS};
use crate::core_types::risk::{RiskLevel, RiskResult};
use crate::error::RiskError;
use crate::risk::engine::{RiskEngine, RiskQuery};

/// Hard cap on risk evaluations per scan, keeping worst-case latency bounded.
pub const MAX_SCAN_POINTS: usize = 150;
/// Minimum grid size; below this the scan is too sparse to be useful.
pub const MIN_SCAN_POINTS: usize = 20;

/// Cooperative cancellation handle for an in-progress scan.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Which severity band of samples and features to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityFilter {
    All,
    HighOnly,
}

impl SeverityFilter {
    fn keeps(self, level: RiskLevel) -> bool {
        match self {
            SeverityFilter::All => true,
            SeverityFilter::HighOnly => level == RiskLevel::High,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AreaScanRequest {
    pub bounds: BoundingBox,
    pub hours: usize,
    pub max_points: usize,
    pub include_rivers: bool,
    pub include_roads: bool,
    pub severity: SeverityFilter,
    /// Demo rainfall applied to every sample point.
    pub weather_override: Option<RainfallSeries>,
    pub cancel: Option<CancelFlag>,
}

/// A single evaluated grid point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaSample {
    pub coordinate: Coordinate,
    pub risk: RiskResult,
}

/// A river polyline tagged with the risk of its nearest sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiverFeature {
    pub id: u32,
    pub points: Vec<Coordinate>,
    pub score: u8,
    pub level: RiskLevel,
}

/// A road edge tagged with the risk of its nearest sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoadFeature {
    pub from: Coordinate,
    pub to: Coordinate,
    pub distance_km: f64,
    pub score: u8,
    pub level: RiskLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanMeta {
    pub hours: usize,
    /// Total grid points evaluated, regardless of the severity filter.
    pub sampled_points: usize,
    /// Samples actually returned after filtering.
    pub returned_points: usize,
    pub runtime_ms: u64,
    /// "live" or "override", depending on the weather source used.
    pub source: String,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaScanResult {
    pub samples: Vec<AreaSample>,
    pub river_features: Vec<RiverFeature>,
    pub road_features: Vec<RoadFeature>,
    pub meta: ScanMeta,
}

pub struct AreaSampler {
    engine: RiskEngine,
}

impl AreaSampler {
    pub fn new(engine: RiskEngine) -> Self {
        AreaSampler { engine }
    }

    /// Sample the region on an even grid and classify nearby features.
    ///
    /// # Errors
    /// [`RiskError::InvalidBounds`] for a degenerate region or one entirely
    /// outside operational coverage; [`RiskError::InvalidInput`] for a bad
    /// horizon.
    pub fn scan_area(&self, request: &AreaScanRequest) -> Result<AreaScanResult, RiskError> {
        let start = Instant::now();

        if !request.bounds.is_valid() {
            return Err(RiskError::InvalidBounds(
                "region must have positive area with finite corners".into(),
            ));
        }
        let coverage = self.engine.geo().coverage();
        if !request.bounds.intersects(coverage) {
            return Err(RiskError::InvalidBounds(
                "region lies outside supported coverage".into(),
            ));
        }
        if request.hours == 0 || request.hours > MAX_FORECAST_HOURS {
            return Err(RiskError::InvalidInput(format!(
                "forecast horizon must be 1..={MAX_FORECAST_HOURS} hours, got {}",
                request.hours
            )));
        }

        let mut warnings = Vec::new();
        let max_points = request.max_points.clamp(MIN_SCAN_POINTS, MAX_SCAN_POINTS);
        if max_points != request.max_points {
            warnings.push(format!(
                "max_points {} adjusted to {max_points}",
                request.max_points
            ));
        }

        let mut grid = Self::grid_points(&request.bounds, max_points, coverage);
        if grid.len() > max_points {
            let stride = grid.len().div_ceil(max_points);
            grid = grid.into_iter().step_by(stride).collect();
            warnings.push("grid capped to max_points".to_string());
            warn!(stride, "area scan grid exceeded max_points, down-sampling");
        }

        let samples: Vec<AreaSample> = grid
            .par_iter()
            .filter_map(|&coordinate| {
                if request.cancel.as_ref().is_some_and(CancelFlag::is_cancelled) {
                    return None;
                }
                let mut query = RiskQuery::at(coordinate, request.hours);
                query.weather_override = request.weather_override.clone();
                self.engine
                    .compute_risk(&query)
                    .ok()
                    .map(|risk| AreaSample { coordinate, risk })
            })
            .collect();
        let sampled_points = samples.len();
        if request
            .cancel
            .as_ref()
            .is_some_and(CancelFlag::is_cancelled)
        {
            warnings.push("scan cancelled before completion".to_string());
        }

        let river_features = if request.include_rivers {
            self.classify_rivers(request, &samples)
        } else {
            Vec::new()
        };
        let road_features = if request.include_roads {
            self.classify_roads(request, &samples)
        } else {
            Vec::new()
        };

        let returned: Vec<AreaSample> = samples
            .into_iter()
            .filter(|s| request.severity.keeps(s.risk.level))
            .collect();

        let meta = ScanMeta {
            hours: request.hours,
            sampled_points,
            returned_points: returned.len(),
            runtime_ms: start.elapsed().as_millis() as u64,
            source: if request.weather_override.is_some() {
                "override".to_string()
            } else {
                "live".to_string()
            },
            warnings,
        };

        Ok(AreaScanResult {
            samples: returned,
            river_features,
            road_features,
            meta,
        })
    }

    /// Evenly spaced grid over the region, kept roughly square-celled, with
    /// out-of-coverage points dropped.
    fn grid_points(
        bounds: &BoundingBox,
        max_points: usize,
        coverage: &BoundingBox,
    ) -> Vec<Coordinate> {
        let aspect = bounds.lng_span() / bounds.lat_span().max(1e-4);
        let cols = ((max_points as f64 * aspect).sqrt() as usize).max(8);
        let rows = max_points.div_ceil(cols).max(6);

        let lat_step = bounds.lat_span() / (rows - 1).max(1) as f64;
        let lng_step = bounds.lng_span() / (cols - 1).max(1) as f64;

        let mut points = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            let lat = bounds.south + lat_step * i as f64;
            for j in 0..cols {
                let lng = bounds.west + lng_step * j as f64;
                let point = Coordinate::new(lat, lng);
                if coverage.contains(&point) {
                    points.push(point);
                }
            }
        }
        points
    }

    /// Risk of the sample nearest to `point`, if any samples exist.
    fn nearest_sample_risk(samples: &[AreaSample], point: &Coordinate) -> Option<(u8, RiskLevel)> {
        samples
            .iter()
            .min_by(|a, b| {
                point
                    .haversine_km(&a.coordinate)
                    .total_cmp(&point.haversine_km(&b.coordinate))
            })
            .map(|s| (s.risk.score, s.risk.level))
    }

    fn classify_rivers(&self, request: &AreaScanRequest, samples: &[AreaSample]) -> Vec<RiverFeature> {
        self.engine
            .geo()
            .rivers()
            .segments()
            .iter()
            .filter_map(|segment| {
                let midpoint = segment.midpoint()?;
                if !request.bounds.contains(&midpoint) {
                    return None;
                }
                let (score, level) = Self::nearest_sample_risk(samples, &midpoint)?;
                request.severity.keeps(level).then(|| RiverFeature {
                    id: segment.id,
                    points: segment.points.clone(),
                    score,
                    level,
                })
            })
            .collect()
    }

    fn classify_roads(&self, request: &AreaScanRequest, samples: &[AreaSample]) -> Vec<RoadFeature> {
        let roads = self.engine.geo().roads();
        roads
            .edges()
            .iter()
            .filter(|edge| request.bounds.contains(&roads.edge_midpoint(edge)))
            .filter_map(|edge| {
                let midpoint = roads.edge_midpoint(edge);
                let (score, level) = Self::nearest_sample_risk(samples, &midpoint)?;
                request.severity.keeps(level).then(|| RoadFeature {
                    from: roads.node(edge.from).coordinate,
                    to: roads.node(edge.to).coordinate,
                    distance_km: edge.distance_km,
                    score,
                    level,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::geo::BoundingBox;
    use crate::geo::rivers::{RiverNetwork, RiverSegment};
    use crate::geo::roads::{RoadEdge, RoadGraph, RoadNode};
    use crate::geo::terrain::ElevationModel;
    use crate::geo::GeoIndex;
    use crate::risk::config::RiskConfig;
    use crate::weather::SyntheticWeather;

    fn sampler() -> AreaSampler {
        let coverage = BoundingBox::new(9.0, 11.0, 122.0, 124.0);
        let elevation = ElevationModel::flat(coverage, 5.0);
        let river = RiverSegment {
            id: 0,
            points: (0..=10)
                .map(|i| Coordinate::new(9.5 + 0.1 * f64::from(i), 123.0))
                .collect(),
        };
        let rivers = RiverNetwork::from_segments(vec![river], &elevation);
        let roads = RoadGraph::new(
            vec![
                RoadNode {
                    id: 0,
                    coordinate: Coordinate::new(10.0, 122.9),
                },
                RoadNode {
                    id: 1,
                    coordinate: Coordinate::new(10.0, 123.1),
                },
            ],
            vec![RoadEdge {
                from: 0,
                to: 1,
                distance_km: 22.0,
            }],
        );
        let geo = Arc::new(GeoIndex::new(coverage, elevation, rivers, roads, Vec::new()));
        let engine = RiskEngine::new(geo, Arc::new(SyntheticWeather), RiskConfig::default());
        AreaSampler::new(engine)
    }

    fn request() -> AreaScanRequest {
        AreaScanRequest {
            bounds: BoundingBox::new(9.4, 10.6, 122.4, 123.6),
            hours: 3,
            max_points: 60,
            include_rivers: true,
            include_roads: true,
            severity: SeverityFilter::All,
            weather_override: None,
            cancel: None,
        }
    }

    #[test]
    fn never_returns_more_than_max_points() {
        let sampler = sampler();
        let result = sampler.scan_area(&request()).unwrap();
        assert!(result.samples.len() <= 60);
        assert!(result.meta.sampled_points >= result.samples.len());
        assert!(result.meta.sampled_points <= 60);
    }

    #[test]
    fn degenerate_bounds_rejected() {
        let sampler = sampler();
        let mut req = request();
        req.bounds = BoundingBox::new(10.0, 10.0, 122.5, 123.5);
        assert!(matches!(
            sampler.scan_area(&req),
            Err(RiskError::InvalidBounds(_))
        ));
    }

    #[test]
    fn bounds_outside_coverage_rejected() {
        let sampler = sampler();
        let mut req = request();
        req.bounds = BoundingBox::new(20.0, 21.0, 122.0, 123.0);
        assert!(matches!(
            sampler.scan_area(&req),
            Err(RiskError::InvalidBounds(_))
        ));
    }

    #[test]
    fn high_only_filter_subsets_all() {
        let sampler = sampler();
        let all = sampler.scan_area(&request()).unwrap();

        let mut req = request();
        req.severity = SeverityFilter::HighOnly;
        // Flood-level rain so at least some samples band HIGH.
        req.weather_override = Some(RainfallSeries::new(vec![60.0, 60.0, 60.0]).unwrap());
        let high = sampler.scan_area(&req).unwrap();

        assert!(high.samples.iter().all(|s| s.risk.level == RiskLevel::High));
        assert_eq!(all.meta.sampled_points, high.meta.sampled_points);
        assert!(!high.samples.is_empty());
    }

    #[test]
    fn features_classified_by_nearest_sample() {
        let sampler = sampler();
        let mut req = request();
        req.weather_override = Some(RainfallSeries::new(vec![60.0, 60.0, 60.0]).unwrap());
        let result = sampler.scan_area(&req).unwrap();
        // Everything is soaked, so the river and the road should be tagged.
        assert_eq!(result.river_features.len(), 1);
        assert_eq!(result.road_features.len(), 1);
        assert_eq!(result.river_features[0].level, RiskLevel::High);
        assert_eq!(result.meta.source, "override");
    }

    #[test]
    fn empty_river_polyline_is_skipped_not_classified() {
        let coverage = BoundingBox::new(9.0, 11.0, 122.0, 124.0);
        let elevation = ElevationModel::flat(coverage, 5.0);
        let segments = vec![
            RiverSegment {
                id: 0,
                points: (0..=10)
                    .map(|i| Coordinate::new(9.5 + 0.1 * f64::from(i), 123.0))
                    .collect(),
            },
            // Loader artifact: a segment with no vertices.
            RiverSegment {
                id: 1,
                points: Vec::new(),
            },
        ];
        let rivers = RiverNetwork::from_segments(segments, &elevation);
        let roads = RoadGraph::new(Vec::new(), Vec::new());
        let geo = Arc::new(GeoIndex::new(coverage, elevation, rivers, roads, Vec::new()));
        let engine = RiskEngine::new(geo, Arc::new(SyntheticWeather), RiskConfig::default());
        let sampler = AreaSampler::new(engine);

        let mut req = request();
        req.weather_override = Some(RainfallSeries::new(vec![60.0, 60.0, 60.0]).unwrap());
        let result = sampler.scan_area(&req).unwrap();
        assert_eq!(result.river_features.len(), 1);
        assert_eq!(result.river_features[0].id, 0);
    }

    #[test]
    fn cancelled_scan_stops_scheduling() {
        let sampler = sampler();
        let mut req = request();
        let cancel = CancelFlag::new();
        cancel.cancel();
        req.cancel = Some(cancel);
        let result = sampler.scan_area(&req).unwrap();
        assert_eq!(result.meta.sampled_points, 0);
        assert!(result
            .meta
            .warnings
            .iter()
            .any(|w| w.contains("cancelled")));
    }

    #[test]
    fn oversized_request_is_clamped_with_warning() {
        let sampler = sampler();
        let mut req = request();
        req.max_points = 10_000;
        let result = sampler.scan_area(&req).unwrap();
        assert!(result.meta.sampled_points <= MAX_SCAN_POINTS);
        assert!(result
            .meta
            .warnings
            .iter()
            .any(|w| w.contains("adjusted to")));
    }
}
