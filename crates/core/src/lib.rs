//! Flood Risk Scoring & Hazard-Aware Routing Core
//!
//! Estimates short-horizon flood risk at geographic points and plans routes
//! to safety that avoid hazardous terrain. Three operations sit on top of a
//! shared, read-only geospatial index:
//!
//! - risk scoring: fuses elevation, river proximity, local rainfall, and
//!   upstream-propagated rainfall into a bounded score with explanations
//! - hazard-aware routing: weighted shortest paths with FAST/SAFE/SAFEST
//!   trade-off modes
//! - area scanning: grid sampling of a region with feature classification
//!
//! This is a library boundary, not a service: the API layer owns transport,
//! persistence, and retry policy, and injects the weather source and the
//! loaded reference geometry.

// Shared primitive types
pub mod core_types;

pub mod area;
pub mod error;
pub mod geo;
pub mod risk;
pub mod routing;
pub mod weather;

// Re-export the request/result surface the API layer consumes
pub use area::{
    AreaSample, AreaSampler, AreaScanRequest, AreaScanResult, CancelFlag, RiverFeature,
    RoadFeature, ScanMeta, SeverityFilter,
};
pub use core_types::{BoundingBox, Coordinate, RainfallSeries, RiskLevel, RiskResult};
pub use error::{RiskError, WeatherError};
pub use geo::{EvacCenter, EvacCenterDistance, GeoIndex};
pub use risk::{RiskConfig, RiskEngine, RiskQuery};
pub use routing::{HazardRouter, Route, RouteMode, RouteRequest};
pub use weather::{SyntheticWeather, WeatherProvider};
