//! Heuristic risk model configuration.
//!
//! All weighting constants, band thresholds, and routing penalties live in
//! one immutable structure handed to the engine constructor, so the heuristic
//! stays auditable and unit-testable in isolation. Values are fixed per
//! deployment, never tunable per request.

use crate::core_types::risk::score_bands;

/// Assumed channel flow speed used to convert the forecast horizon into an
/// upstream search distance.
pub const FLOW_SPEED_MPS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// Weight applied to the local rainfall sum (mm over the horizon).
    pub rainfall_weight: f64,
    /// Weight applied to the 0..1 low-elevation factor.
    pub elevation_weight: f64,
    /// Weight applied to the 0..1 river proximity factor.
    pub river_weight: f64,
    /// Weight applied to the 0..100 upstream rainfall index.
    pub upstream_weight: f64,

    /// Elevation (m) at and above which the elevation factor reaches zero.
    pub elevation_ref_m: f64,
    /// River proximity saturates to 1.0 within this distance (km).
    pub river_saturation_km: f64,
    /// River proximity decays to 0.0 at this distance (km).
    pub river_cutoff_km: f64,

    /// Rainfall sums (mm) that trigger the heavy / moderate explanations.
    pub heavy_rain_mm: f64,
    pub moderate_rain_mm: f64,
    /// Factor levels (0..1) above which elevation / river notes are emitted.
    pub elevation_note_factor: f64,
    pub river_note_factor: f64,
    /// Upstream index (0..100) above which the upstream note is emitted.
    pub upstream_note_index: f64,

    /// Exponential decay length for upstream contribution weights (m).
    pub upstream_decay_m: f64,
    /// Divisor normalizing the weighted upstream rain sum onto 0..100.
    pub upstream_norm_divisor: f64,
    /// Dominant upstream points retained per query.
    pub max_upstream_nodes: usize,
    /// Maximum distance (km) from a query point to its nearest river node
    /// before the point is considered disconnected from the drainage graph.
    pub river_attach_km: f64,

    /// SAFE-mode risk penalty multiplier (alpha).
    pub safety_alpha: f64,
    /// SAFEST mode excludes edges scoring at or above this value.
    pub safest_block_score: u8,
}

impl Default for RiskConfig {
    fn default() -> Self {
        RiskConfig {
            rainfall_weight: 0.5,
            elevation_weight: 20.0,
            river_weight: 20.0,
            upstream_weight: 0.1,

            elevation_ref_m: 100.0,
            river_saturation_km: 0.5,
            river_cutoff_km: 10.0,

            heavy_rain_mm: 25.0,
            moderate_rain_mm: 12.0,
            elevation_note_factor: 0.55,
            river_note_factor: 0.55,
            upstream_note_index: 30.0,

            upstream_decay_m: 20_000.0,
            upstream_norm_divisor: 200.0,
            max_upstream_nodes: 3,
            river_attach_km: 5.0,

            safety_alpha: 2.0,
            safest_block_score: score_bands::HIGH,
        }
    }
}

impl RiskConfig {
    /// Low-elevation contribution in [0, 1]; monotonically decreasing in
    /// elevation and zero at `elevation_ref_m` and above.
    pub fn elevation_factor(&self, elevation_m: f64) -> f64 {
        ((self.elevation_ref_m - elevation_m) / self.elevation_ref_m).clamp(0.0, 1.0)
    }

    /// River proximity contribution in [0, 1]: saturated near the channel,
    /// linear decay out to the cutoff radius, zero beyond.
    pub fn river_proximity_factor(&self, distance_km: f64) -> f64 {
        if distance_km <= self.river_saturation_km {
            return 1.0;
        }
        if distance_km >= self.river_cutoff_km {
            return 0.0;
        }
        ((self.river_cutoff_km - distance_km) / (self.river_cutoff_km - self.river_saturation_km))
            .clamp(0.0, 1.0)
    }

    /// Upstream search distance (m) for a forecast horizon.
    pub fn upstream_search_distance_m(&self, hours: usize) -> f64 {
        hours as f64 * 3600.0 * FLOW_SPEED_MPS
    }
}
