//! Error taxonomy for the risk, routing, and area-scan operations.
//!
//! Validation failures are detected at the earliest component boundary and
//! returned immediately. Degraded conditions (weather timeout, missing
//! upstream data, SAFEST-mode fallback) are never errors; they are flagged in
//! the result payload instead.

use thiserror::Error;

use crate::core_types::geo::Coordinate;

/// Per-call failures surfaced to the API layer. Nothing here is fatal to the
/// process.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RiskError {
    /// Malformed coordinate or rainfall payload. Caller error, no retry.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Coordinate outside the operational coverage area.
    #[error("coordinate {0} is outside supported coverage")]
    OutOfBounds(Coordinate),

    /// Degenerate or unsupported region for an area scan.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),

    /// No road node close enough to anchor routing at this point.
    #[error("no road node within {max_km} km of {point} (nearest is {nearest_km:.2} km away)")]
    SnapFailed {
        point: Coordinate,
        nearest_km: f64,
        max_km: f64,
    },

    /// Origin and destination are not connected in the loaded road graph.
    #[error("no route found between the requested points")]
    NoPathFound,
}

/// Failure fetching rainfall from a live weather source.
///
/// Provider errors never abort a risk computation; the engine degrades onto
/// its deterministic synthetic source and flags the result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeatherError {
    #[error("weather source unavailable: {0}")]
    Unavailable(String),
    #[error("weather source timed out")]
    Timeout,
}
