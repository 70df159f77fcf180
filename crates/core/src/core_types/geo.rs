//! Geographic primitives: WGS84 coordinates, bounding boxes, great-circle distance.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RiskError;

/// Mean Earth radius in kilometres, used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Coordinate { lat, lng }
    }

    /// Validate that both components are finite and within WGS84 range.
    ///
    /// # Errors
    /// Returns [`RiskError::InvalidInput`] for non-finite or out-of-range values.
    pub fn validate(&self) -> Result<(), RiskError> {
        if !self.lat.is_finite() || !self.lng.is_finite() {
            return Err(RiskError::InvalidInput(format!(
                "coordinate components must be finite, got ({}, {})",
                self.lat, self.lng
            )));
        }
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(RiskError::InvalidInput(format!(
                "latitude {} outside [-90, 90]",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(RiskError::InvalidInput(format!(
                "longitude {} outside [-180, 180]",
                self.lng
            )));
        }
        Ok(())
    }

    /// Great-circle distance to another coordinate in kilometres.
    pub fn haversine_km(&self, other: &Coordinate) -> f64 {
        let lat1 = self.lat.to_radians();
        let lat2 = other.lat.to_radians();
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_KM * c
    }

    /// Midpoint of the straight segment between two coordinates.
    ///
    /// Arithmetic mean is adequate at road-edge scale; edges in the loaded
    /// graphs span well under a degree.
    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        Coordinate::new((self.lat + other.lat) / 2.0, (self.lng + other.lng) / 2.0)
    }

    /// Stable key identifying a coordinate at 5-decimal precision (~1 m),
    /// used to match caller-supplied upstream rainfall to river nodes.
    pub fn node_key(&self) -> String {
        format!("{:.5},{:.5}", self.lat, self.lng)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.lat, self.lng)
    }
}

/// Axis-aligned geographic bounding box.
///
/// `south <= north` and `west <= east`; a box violating that, or with zero
/// area, is degenerate and rejected by area operations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    pub const fn new(south: f64, north: f64, west: f64, east: f64) -> Self {
        BoundingBox {
            south,
            north,
            west,
            east,
        }
    }

    pub fn contains(&self, point: &Coordinate) -> bool {
        point.lat >= self.south
            && point.lat <= self.north
            && point.lng >= self.west
            && point.lng <= self.east
    }

    /// Latitude span in degrees (may be negative for inverted boxes).
    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    /// Longitude span in degrees (may be negative for inverted boxes).
    pub fn lng_span(&self) -> f64 {
        self.east - self.west
    }

    /// True when the box has strictly positive area and finite corners.
    pub fn is_valid(&self) -> bool {
        self.south.is_finite()
            && self.north.is_finite()
            && self.west.is_finite()
            && self.east.is_finite()
            && self.lat_span() > 0.0
            && self.lng_span() > 0.0
    }

    /// True when the two boxes overlap in both axes.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.south <= other.north
            && self.north >= other.south
            && self.west <= other.east
            && self.east >= other.west
    }
}
