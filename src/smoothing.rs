//! Length-preserving smoothing of a signal series.
//!
//! Two methods are provided: a centred moving average and a Savitzky-Golay
//! local polynomial filter. Both keep the output aligned 1:1 with the input
//! and never reorder it.

use crate::error::{AnalysisError, Result};
use clap::ValueEnum;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMethod {
    #[value(name = "mean")]
    MovingAverage,
    #[value(name = "savgol")]
    SavitzkyGolay,
}

impl fmt::Display for SmoothingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SmoothingMethod::MovingAverage => write!(f, "mean"),
            SmoothingMethod::SavitzkyGolay => write!(f, "savgol"),
        }
    }
}

/// Smooths `series` with the given method.
///
/// `order` is ignored by the moving average.
pub fn smooth(series: &[f64], method: SmoothingMethod, window: usize, order: usize) -> Result<Vec<f64>> {
    match method {
        SmoothingMethod::MovingAverage => moving_average(series, window),
        SmoothingMethod::SavitzkyGolay => savitzky_golay(series, window, order),
    }
}

fn check_window(window: usize) -> Result<()> {
    if window == 0 {
        return Err(AnalysisError::InvalidParameter(
            "window must be positive".to_string(),
        ));
    }
    if window % 2 == 0 {
        return Err(AnalysisError::InvalidParameter(format!(
            "window must be odd, got {}",
            window
        )));
    }
    Ok(())
}

/// Centred rolling mean over `window` values.
///
/// Positions without a full window, and windows containing a NaN, keep the
/// original value.
pub fn moving_average(series: &[f64], window: usize) -> Result<Vec<f64>> {
    check_window(window)?;
    let half = window / 2;
    let n = series.len();
    let mut smoothed = series.to_vec();
    if n < window {
        return Ok(smoothed);
    }

    for i in half..n - half {
        let span = &series[i - half..=i + half];
        if span.iter().all(|v| !v.is_nan()) {
            smoothed[i] = span.iter().sum::<f64>() / window as f64;
        }
    }
    Ok(smoothed)
}

/// Centred rolling mean that averages whatever non-NaN values fall inside the
/// window, so edges use a truncated window. Positions with no valid value are NaN.
pub fn rolling_mean_partial(series: &[f64], window: usize) -> Result<Vec<f64>> {
    check_window(window)?;
    let half = window / 2;
    let n = series.len();
    Ok((0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half).min(n.saturating_sub(1));
            let (sum, count) = series[lo..=hi]
                .iter()
                .filter(|v| !v.is_nan())
                .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
            if count == 0 {
                f64::NAN
            } else {
                sum / count as f64
            }
        })
        .collect())
}

/// Hat matrix of a degree-`order` least-squares fit over `window` equally
/// spaced points centred on zero. Row `i` gives the fitted value at window
/// position `i` as a linear combination of the window's samples.
fn savgol_hat_matrix(window: usize, order: usize) -> Result<DMatrix<f64>> {
    let half = (window / 2) as f64;
    let vandermonde = DMatrix::from_fn(window, order + 1, |i, j| (i as f64 - half).powi(j as i32));
    let pinv = vandermonde
        .clone()
        .pseudo_inverse(1e-12)
        .map_err(|e| AnalysisError::InvalidParameter(format!("Savitzky-Golay fit failed: {}", e)))?;
    Ok(vandermonde * pinv)
}

/// Savitzky-Golay filter.
///
/// Interior points take the fitted centre value of their window. The first
/// and last `window / 2` points are evaluated on the polynomial fitted to the
/// first and last full window respectively.
pub fn savitzky_golay(series: &[f64], window: usize, order: usize) -> Result<Vec<f64>> {
    check_window(window)?;
    if order >= window {
        return Err(AnalysisError::InvalidParameter(format!(
            "polynomial order {} must be less than window {}",
            order, window
        )));
    }
    let n = series.len();
    if window > n {
        return Err(AnalysisError::InvalidParameter(format!(
            "window {} exceeds series length {}",
            window, n
        )));
    }

    let hat = savgol_hat_matrix(window, order)?;
    let half = window / 2;
    let fitted = |row: usize, start: usize| -> f64 {
        hat.row(row)
            .iter()
            .zip(&series[start..start + window])
            .map(|(w, y)| w * y)
            .sum()
    };

    let mut smoothed = vec![0.0; n];
    for (i, value) in smoothed.iter_mut().enumerate() {
        *value = if i < half {
            fitted(i, 0)
        } else if i >= n - half {
            fitted(i - (n - window), n - window)
        } else {
            fitted(half, i - half)
        };
    }
    Ok(smoothed)
}
