//! Least-squares line of best fit.

use serde::Serialize;

use crate::error::{SimError, SimResult};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Ordinary least squares, degree 1. With a single point (or all x equal) the
/// line is flat through the mean of `ys`.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> SimResult<LinearFit> {
    if xs.len() != ys.len() {
        return Err(SimError::LengthMismatch {
            xs: xs.len(),
            ys: ys.len(),
        });
    }
    if xs.is_empty() {
        return Err(SimError::EmptySeries);
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let (sxy, sxx) = xs
        .iter()
        .zip(ys)
        .fold((0.0, 0.0), |(sxy, sxx), (&x, &y)| {
            let dx = x - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });

    let slope = if sxx > f64::EPSILON { sxy / sxx } else { 0.0 };
    Ok(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}
