//! Core data types shared across the risk, routing, and sampling components.

pub mod geo;
pub mod rainfall;
pub mod risk;

pub use geo::{BoundingBox, Coordinate};
pub use rainfall::{RainfallSeries, MAX_FORECAST_HOURS};
pub use risk::{RiskLevel, RiskResult, RiskSignal, UpstreamNode};
