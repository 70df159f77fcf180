//! Elevation lookup over a regular geographic grid.

use serde::{Deserialize, Serialize};

use crate::core_types::geo::{BoundingBox, Coordinate};

/// Digital elevation model sampled on a regular lat/lng grid.
///
/// Elevations are stored row-major south-to-north (`[row * nx + col]`);
/// queries use bilinear interpolation between the four surrounding samples.
/// Out-of-grid queries clamp to the nearest edge sample, since callers
/// bounds-check coordinates before risk evaluation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElevationModel {
    bounds: BoundingBox,
    /// Samples per row (west to east).
    nx: usize,
    /// Rows (south to north).
    ny: usize,
    elevations: Vec<f64>,
    min_elevation: f64,
    max_elevation: f64,
}

impl ElevationModel {
    /// Build a model from a row-major elevation grid.
    ///
    /// # Panics
    /// Panics when the grid size does not match `nx * ny` or either dimension
    /// is below 2. Grids come from the startup loader, not request input.
    pub fn from_grid(bounds: BoundingBox, nx: usize, ny: usize, elevations: Vec<f64>) -> Self {
        assert!(nx >= 2 && ny >= 2, "elevation grid needs at least 2x2 samples");
        assert_eq!(elevations.len(), nx * ny, "elevation grid size mismatch");

        let mut min_elevation = f64::MAX;
        let mut max_elevation = f64::MIN;
        for &e in &elevations {
            min_elevation = min_elevation.min(e);
            max_elevation = max_elevation.max(e);
        }

        ElevationModel {
            bounds,
            nx,
            ny,
            elevations,
            min_elevation,
            max_elevation,
        }
    }

    /// Flat terrain at a single elevation, for fixtures.
    pub fn flat(bounds: BoundingBox, elevation: f64) -> Self {
        Self::from_grid(bounds, 2, 2, vec![elevation; 4])
    }

    /// Deterministic synthetic terrain for demos, sampled from a smooth
    /// trigonometric surface and clamped to [2, 120] m.
    pub fn synthetic(bounds: BoundingBox, nx: usize, ny: usize) -> Self {
        let lat_step = bounds.lat_span() / (ny - 1) as f64;
        let lng_step = bounds.lng_span() / (nx - 1) as f64;

        let mut elevations = Vec::with_capacity(nx * ny);
        for iy in 0..ny {
            let lat = bounds.south + lat_step * iy as f64;
            for ix in 0..nx {
                let lng = bounds.west + lng_step * ix as f64;
                let raw = 20.0 + ((lat * 8.0).sin() + 1.0) * 20.0 + ((lng * 8.0).cos() + 1.0) * 25.0;
                elevations.push(raw.clamp(2.0, 120.0));
            }
        }

        Self::from_grid(bounds, nx, ny, elevations)
    }

    /// Elevation in metres at `point`, bilinearly interpolated.
    pub fn elevation_at(&self, point: &Coordinate) -> f64 {
        let gx = ((point.lng - self.bounds.west) / self.bounds.lng_span() * (self.nx - 1) as f64)
            .clamp(0.0, (self.nx - 1) as f64);
        let gy = ((point.lat - self.bounds.south) / self.bounds.lat_span() * (self.ny - 1) as f64)
            .clamp(0.0, (self.ny - 1) as f64);

        let ix0 = (gx.floor() as usize).min(self.nx - 2);
        let iy0 = (gy.floor() as usize).min(self.ny - 2);
        let ix1 = ix0 + 1;
        let iy1 = iy0 + 1;

        let fx = gx - ix0 as f64;
        let fy = gy - iy0 as f64;

        let e00 = self.elevations[iy0 * self.nx + ix0];
        let e10 = self.elevations[iy0 * self.nx + ix1];
        let e01 = self.elevations[iy1 * self.nx + ix0];
        let e11 = self.elevations[iy1 * self.nx + ix1];

        let e0 = e00 * (1.0 - fx) + e10 * fx;
        let e1 = e01 * (1.0 - fx) + e11 * fx;
        e0 * (1.0 - fy) + e1 * fy
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    pub fn min_elevation(&self) -> f64 {
        self.min_elevation
    }

    pub fn max_elevation(&self) -> f64 {
        self.max_elevation
    }
}
