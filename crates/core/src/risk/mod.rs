//! Flood risk scoring: signal fusion engine, upstream propagation model, and
//! the shared heuristic configuration.

pub mod config;
pub mod engine;
pub mod upstream;

pub use config::RiskConfig;
pub use engine::{RiskEngine, RiskQuery};
pub use upstream::{UpstreamAggregate, UpstreamModel};
