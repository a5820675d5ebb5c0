use serde::{Deserialize, Serialize};
use crate::drivers::AcquisitionError;
/// Straight line `a·i + b` over the sample index `i`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearTrend {
    pub a: f64,
    pub b: f64,
}
impl LinearTrend {
    pub fn at(&self, index: usize) -> f64 {
        self.a * index as f64 + self.b
    }
    /// Removes only the slope, leaving the series anchored at its own start.
    pub fn remove_slope(&self, series: &[f64]) -> Vec<f64> {
        series
            .iter()
            .enumerate()
            .map(|(i, v)| v - self.a * i as f64)
            .collect()
    }
    pub fn detrend(&self, series: &[f64]) -> Vec<f64> {
        series
            .iter()
            .enumerate()
            .map(|(i, v)| v - self.at(i))
            .collect()
    }
}
/// Ordinary least squares fit of `series` against `0..N`.
pub fn fit_linear_trend(series: &[f64]) -> Result<LinearTrend, AcquisitionError> {
    let n = series.len();
    if n < 2 {
        return Err(AcquisitionError::InsufficientSamples {
            needed: 2,
            actual: n,
        });
    }
    let x_mean = (n - 1) as f64 / 2.0;
    let y_mean = series.iter().sum::<f64>() / n as f64;
    let (sxy, sxx) = series
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(sxy, sxx), (i, y)| {
            let dx = i as f64 - x_mean;
            (sxy + dx * (y - y_mean), sxx + dx * dx)
        });
    let a = sxy / sxx;
    Ok(LinearTrend {
        a,
        b: y_mean - a * x_mean,
    })
}
