//! Risk scoring result types and severity banding.

use serde::{Deserialize, Serialize};

use crate::core_types::geo::Coordinate;

/// Risk score band thresholds shared by scoring, routing, and area filtering.
///
/// Scores are 0..=100; bands are `[a, b)` style with HIGH unbounded above.
pub mod score_bands {
    /// Minimum score classified as HIGH.
    pub const HIGH: u8 = 65;
    /// Minimum score classified as MEDIUM.
    pub const MEDIUM: u8 = 35;
}

/// Severity band derived deterministically from a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Band a 0..=100 score: HIGH >= 65, MEDIUM >= 35, else LOW.
    pub fn from_score(score: u8) -> Self {
        if score >= score_bands::HIGH {
            RiskLevel::High
        } else if score >= score_bands::MEDIUM {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

/// Intermediate fused signal set, produced per query and never persisted.
#[derive(Debug, Clone, Copy)]
pub struct RiskSignal {
    /// Ground elevation at the query point in metres.
    pub elevation_m: f64,
    /// River proximity factor in [0, 1]; 1 means on or beside a river.
    pub river_proximity: f64,
    /// Total forecast rainfall at the query point over the horizon, in mm.
    pub local_rainfall_mm: f64,
    /// Distance-decayed upstream rainfall index in [0, 100].
    pub upstream_influence: f64,
}

/// Outcome of a flood risk evaluation at a single point.
///
/// Produced fresh per request; inputs (weather, overrides) vary per call so
/// results are never cached inside the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    /// Fused risk score, clamped to 0..=100.
    pub score: u8,
    pub level: RiskLevel,
    /// Human-readable contributing factors in fixed order: elevation, river
    /// proximity, local rainfall, upstream rainfall, then any caveats.
    pub explanation: Vec<String>,
    /// 1-based forecast hour at which combined rainfall peaks, if any rain
    /// is expected at all.
    pub expected_peak_in_hours: Option<u8>,
    /// True when a soft failure (e.g. live weather unavailable) forced the
    /// engine onto reduced or fallback signals.
    pub degraded: bool,
}

/// An upstream river node contributing rainfall influence to a query point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamNode {
    pub node_id: u32,
    pub coordinate: Coordinate,
    /// Hydrological (along-channel) distance from the query point in metres.
    pub distance_m: f64,
    /// Exponential distance-decay weight in (0, 1].
    pub contribution_weight: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banding_matches_thresholds() {
        assert_eq!(RiskLevel::from_score(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(34), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(35), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(64), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_score(65), RiskLevel::High);
        assert_eq!(RiskLevel::from_score(100), RiskLevel::High);
    }
}
