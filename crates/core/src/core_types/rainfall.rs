//! Hourly rainfall series with construction-time validation.

use serde::{Deserialize, Serialize};

use crate::error::RiskError;

/// Maximum forecast horizon in hours.
pub const MAX_FORECAST_HOURS: usize = 6;

/// An ordered series of hourly rainfall values in mm/hr, one per forecast
/// hour. Immutable once constructed; length is always 1..=6 and every value
/// is finite and non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RainfallSeries(Vec<f64>);

impl RainfallSeries {
    /// Build a series from raw hourly values.
    ///
    /// # Errors
    /// Returns [`RiskError::InvalidInput`] when the series is empty, longer
    /// than [`MAX_FORECAST_HOURS`], or contains negative or non-finite values.
    pub fn new(values: Vec<f64>) -> Result<Self, RiskError> {
        if values.is_empty() {
            return Err(RiskError::InvalidInput(
                "rainfall series must contain at least one hourly value".into(),
            ));
        }
        if values.len() > MAX_FORECAST_HOURS {
            return Err(RiskError::InvalidInput(format!(
                "rainfall series has {} values, maximum is {MAX_FORECAST_HOURS}",
                values.len()
            )));
        }
        for &v in &values {
            if !v.is_finite() || v < 0.0 {
                return Err(RiskError::InvalidInput(format!(
                    "rainfall values must be non-negative and finite, got {v}"
                )));
            }
        }
        Ok(RainfallSeries(values))
    }

    /// A series of `hours` zero values. `hours` is clamped to 1..=6.
    pub fn zeros(hours: usize) -> Self {
        RainfallSeries(vec![0.0; hours.clamp(1, MAX_FORECAST_HOURS)])
    }

    /// Return a copy resized to exactly `hours` entries: truncated if longer,
    /// padded with zeros if shorter. Matches the demo-override normalization
    /// of the upstream data feed.
    pub fn fit_to_hours(&self, hours: usize) -> RainfallSeries {
        let hours = hours.clamp(1, MAX_FORECAST_HOURS);
        let mut values = self.0.clone();
        values.truncate(hours);
        values.resize(hours, 0.0);
        RainfallSeries(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total rainfall over the series in mm.
    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    /// 1-based index of the hour with the highest rainfall, or `None` when
    /// every value is zero. Earlier hours win ties.
    pub fn peak_hour(&self) -> Option<u8> {
        let (idx, &max) = self
            .0
            .iter()
            .enumerate()
            .fold(None, |best: Option<(usize, &f64)>, (i, v)| match best {
                Some((_, bv)) if *bv >= *v => best,
                _ => Some((i, v)),
            })?;
        if max <= 0.0 {
            return None;
        }
        Some((idx + 1) as u8)
    }

    /// Element-wise sum of two series. The result has the length of the
    /// longer input; the shorter one is treated as zero-padded.
    pub fn combine(&self, other: &RainfallSeries) -> RainfallSeries {
        let len = self.0.len().max(other.0.len());
        let values = (0..len)
            .map(|i| {
                self.0.get(i).copied().unwrap_or(0.0) + other.0.get(i).copied().unwrap_or(0.0)
            })
            .collect();
        RainfallSeries(values)
    }
}
