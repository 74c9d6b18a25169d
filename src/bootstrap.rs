//! Bootstrap confidence of the signal-to-noise ratio.
//!
//! Each trial redraws the noise estimate (see
//! [`SnrEstimator::bootstrap_ratio`]). Trials run in parallel; every trial
//! owns an RNG seeded from the caller's generator, so a seeded caller gets
//! the same summary whatever the thread count.

use crate::error::{AnalysisError, Result};
use crate::observation::{Locus, ObservationTable, SMOOTHED_COLUMN};
use crate::smoothing::moving_average;
use crate::snr::{check_noise_fraction, NoisePool, SnrEstimator, SnrRatio};
use crate::stats::percentile;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Mean and 95% percentile interval of the bootstrapped ratios.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapSummary {
    pub mean: f64,
    pub low: f64,
    pub high: f64,
    pub trials: usize,
    /// Trials whose ratio was undefined; any makes the summary NaN.
    pub undefined_trials: usize,
}

/// Draws `trials` bootstrap ratios.
pub fn bootstrap_samples<R: Rng + ?Sized>(
    estimator: &SnrEstimator,
    noise_fraction: f64,
    trials: usize,
    rng: &mut R,
) -> Result<Vec<SnrRatio>> {
    if trials == 0 {
        return Err(AnalysisError::InvalidParameter(
            "at least one bootstrap trial is required".to_string(),
        ));
    }
    check_noise_fraction(noise_fraction)?;

    let seeds: Vec<u64> = (0..trials).map(|_| rng.random()).collect();
    seeds
        .par_iter()
        .map(|&seed| {
            let mut trial_rng = StdRng::seed_from_u64(seed);
            estimator.bootstrap_ratio(noise_fraction, &mut trial_rng)
        })
        .collect()
}

/// Runs `trials` bootstrap draws and reduces them to a mean and the 2.5th /
/// 97.5th percentiles.
pub fn bootstrap_confidence<R: Rng + ?Sized>(
    estimator: &SnrEstimator,
    noise_fraction: f64,
    trials: usize,
    rng: &mut R,
) -> Result<BootstrapSummary> {
    let ratios: Vec<f64> = bootstrap_samples(estimator, noise_fraction, trials, rng)?
        .into_iter()
        .map(SnrRatio::value)
        .collect();
    Ok(summarize(&ratios))
}

/// Mean and percentile interval of a set of ratios (NaN marks undefined ones).
pub fn summarize(ratios: &[f64]) -> BootstrapSummary {
    let undefined_trials = ratios.iter().filter(|r| r.is_nan()).count();
    if undefined_trials > 0 {
        warn!(
            "{} of {} bootstrap trials had an undefined ratio",
            undefined_trials,
            ratios.len()
        );
    }
    let mean = if ratios.is_empty() {
        f64::NAN
    } else {
        ratios.iter().sum::<f64>() / ratios.len() as f64
    };
    BootstrapSummary {
        mean,
        low: percentile(ratios, 2.5),
        high: percentile(ratios, 97.5),
        trials: ratios.len(),
        undefined_trials,
    }
}

/// Noise fraction drawn per trial when collecting raw distributions.
pub const DISTRIBUTION_NOISE_FRACTION: f64 = 0.05;

/// Raw bootstrap ratios for one moving-average window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowDistribution {
    pub window: usize,
    pub ratios: Vec<f64>,
}

/// Bootstrap ratio samples for every odd moving-average window in `[1, window_max)`.
#[allow(clippy::too_many_arguments)]
pub fn bootstrap_distribution<F, R>(
    table: &ObservationTable,
    column: &str,
    gene_filter: F,
    pool: NoisePool,
    window_max: usize,
    noise_fraction: f64,
    trials: usize,
    rng: &mut R,
) -> Result<Vec<WindowDistribution>>
where
    F: Fn(&Locus) -> bool,
    R: Rng + ?Sized,
{
    let source = table.column(column)?;
    let mut distributions = Vec::new();
    for window in (1..window_max).step_by(2) {
        let smoothed = table
            .clone()
            .with_column(SMOOTHED_COLUMN, moving_average(source, window)?)?;
        let estimator = SnrEstimator::new(&smoothed, &gene_filter, SMOOTHED_COLUMN, pool)?;
        let ratios = bootstrap_samples(&estimator, noise_fraction, trials, rng)?
            .into_iter()
            .map(SnrRatio::value)
            .collect();
        debug!("Collected {} bootstrap ratios for window {}", trials, window);
        distributions.push(WindowDistribution { window, ratios });
    }
    Ok(distributions)
}
