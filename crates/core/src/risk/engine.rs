//! Multi-signal flood risk fusion.
//!
//! Combines elevation, river proximity, local rainfall, and upstream
//! propagated rainfall into a bounded score with a deterministic explanation
//! list. Stateless per request: identical inputs always produce identical
//! results.

use std::sync::Arc;

use tracing::warn;

use crate::core_types::geo::Coordinate;
use crate::core_types::rainfall::{RainfallSeries, MAX_FORECAST_HOURS};
use crate::core_types::risk::{RiskLevel, RiskResult, RiskSignal};
use crate::error::RiskError;
use crate::geo::GeoIndex;
use crate::risk::config::RiskConfig;
use crate::risk::upstream::UpstreamModel;
use crate::weather::{SyntheticWeather, WeatherProvider};

/// One risk evaluation request.
#[derive(Debug, Clone)]
pub struct RiskQuery {
    pub point: Coordinate,
    /// Forecast horizon, 1..=6 hours.
    pub hours: usize,
    /// Demo/testing rainfall substituted for the live source at the query
    /// point. Fitted (padded/truncated) to `hours`.
    pub weather_override: Option<RainfallSeries>,
    /// Per-node upstream rainfall overrides, matched by coordinate key.
    pub upstream_override: Vec<(Coordinate, RainfallSeries)>,
}

impl RiskQuery {
    pub fn at(point: Coordinate, hours: usize) -> Self {
        RiskQuery {
            point,
            hours,
            weather_override: None,
            upstream_override: Vec::new(),
        }
    }
}

/// The risk fusion engine. Cheap to clone; all shared state is immutable.
#[derive(Clone)]
pub struct RiskEngine {
    geo: Arc<GeoIndex>,
    weather: Arc<dyn WeatherProvider>,
    config: RiskConfig,
}

impl RiskEngine {
    pub fn new(geo: Arc<GeoIndex>, weather: Arc<dyn WeatherProvider>, config: RiskConfig) -> Self {
        RiskEngine {
            geo,
            weather,
            config,
        }
    }

    pub fn geo(&self) -> &GeoIndex {
        &self.geo
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Evaluate flood risk at a point.
    ///
    /// # Errors
    /// [`RiskError::InvalidInput`] for a malformed coordinate or horizon.
    /// Weather and upstream failures never error; they degrade the result and
    /// flag it.
    pub fn compute_risk(&self, query: &RiskQuery) -> Result<RiskResult, RiskError> {
        query.point.validate()?;
        if query.hours == 0 || query.hours > MAX_FORECAST_HOURS {
            return Err(RiskError::InvalidInput(format!(
                "forecast horizon must be 1..={MAX_FORECAST_HOURS} hours, got {}",
                query.hours
            )));
        }

        let mut degraded = false;

        // Local rainfall: override wins, then live, then synthetic fallback.
        let local = match &query.weather_override {
            Some(series) => series.fit_to_hours(query.hours),
            None => match self.weather.rainfall(&query.point, query.hours) {
                Ok(series) => series.fit_to_hours(query.hours),
                Err(err) => {
                    warn!(point = %query.point, error = %err, "live weather unavailable, using synthetic fallback");
                    degraded = true;
                    SyntheticWeather
                        .rainfall(&query.point, query.hours)
                        .unwrap_or_else(|_| RainfallSeries::zeros(query.hours))
                }
            },
        };

        let upstream_model = UpstreamModel::new(self.geo.rivers(), &self.config);
        let nodes = upstream_model.find_dominant_upstream(
            &query.point,
            self.config.max_upstream_nodes,
            query.hours,
        );
        let upstream = upstream_model.aggregate_rainfall(
            &nodes,
            query.hours,
            &query.upstream_override,
            self.weather.as_ref(),
        );
        degraded |= upstream.degraded;

        let signal = RiskSignal {
            elevation_m: self.geo.elevation().elevation_at(&query.point),
            river_proximity: self
                .config
                .river_proximity_factor(self.geo.rivers().distance_to_nearest_km(&query.point)),
            local_rainfall_mm: local.sum(),
            upstream_influence: upstream.index,
        };

        let score = self.fuse(&signal);
        let level = RiskLevel::from_score(score);
        let explanation = self.explain(&signal, degraded);
        let expected_peak_in_hours = local.combine(&upstream.series).peak_hour();

        Ok(RiskResult {
            score,
            level,
            explanation,
            expected_peak_in_hours,
            degraded,
        })
    }

    /// Fixed-weight linear fusion, clamped onto 0..=100.
    fn fuse(&self, signal: &RiskSignal) -> u8 {
        let c = &self.config;
        let raw = signal.local_rainfall_mm * c.rainfall_weight
            + c.elevation_factor(signal.elevation_m) * c.elevation_weight
            + signal.river_proximity * c.river_weight
            + signal.upstream_influence * c.upstream_weight;
        raw.clamp(0.0, 100.0).round() as u8
    }

    /// Triggered factor descriptions in fixed order (elevation, river, local
    /// rain, upstream rain), followed by any degradation caveat.
    fn explain(&self, signal: &RiskSignal, degraded: bool) -> Vec<String> {
        let c = &self.config;
        let mut notes = Vec::new();

        if c.elevation_factor(signal.elevation_m) >= c.elevation_note_factor {
            notes.push("Low elevation area".to_string());
        }
        if signal.river_proximity >= c.river_note_factor {
            notes.push("Close to river".to_string());
        }
        if signal.local_rainfall_mm >= c.heavy_rain_mm {
            notes.push("Heavy rainfall forecast".to_string());
        } else if signal.local_rainfall_mm >= c.moderate_rain_mm {
            notes.push("Moderate rainfall forecast".to_string());
        }
        if signal.upstream_influence >= c.upstream_note_index {
            notes.push("Heavy upstream rainfall propagating downstream".to_string());
        }

        if notes.is_empty() {
            notes.push("No major flood risk indicators from current data".to_string());
        }
        if degraded {
            notes.push("Live weather unavailable; estimate uses fallback rainfall".to_string());
        }
        notes
    }
}
