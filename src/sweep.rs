//! Parameter sweep over smoothing method, polynomial order and window size.
//!
//! Every configuration re-smooths the full signal column into
//! [`SMOOTHED_COLUMN`] and bootstraps the gene's SNR on it. Results come
//! back in enumeration order: moving average first, then Savitzky-Golay
//! grouped by order, windows ascending within each group. Renderers rely on
//! this order.

use crate::bootstrap::bootstrap_confidence;
use crate::error::{AnalysisError, Result};
use crate::observation::{Locus, ObservationTable, SMOOTHED_COLUMN};
use crate::smoothing::{smooth, SmoothingMethod};
use crate::snr::{NoisePool, SnrEstimator, SnrRatio};
use log::{debug, info};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One smoothing configuration evaluated by the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SnrConfig {
    pub method: SmoothingMethod,
    pub window: usize,
    /// Polynomial order; 0 for the moving average.
    pub order: usize,
    pub noise_fraction: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BootstrapResult {
    pub config: SnrConfig,
    pub mean_ratio: f64,
    pub confidence_low: f64,
    pub confidence_high: f64,
    pub sample_count: usize,
    pub undefined_trials: usize,
}

/// Grid and bootstrap settings of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepPlan {
    /// Exclusive upper bound on window sizes.
    pub window_max: usize,
    pub savgol_orders: Vec<usize>,
    pub trials: usize,
    pub noise_fraction: f64,
    pub noise_pool: NoisePool,
}

impl Default for SweepPlan {
    fn default() -> Self {
        SweepPlan {
            window_max: 20,
            savgol_orders: vec![1, 2, 4],
            trials: 1000,
            noise_fraction: 0.10,
            noise_pool: NoisePool::AllOther,
        }
    }
}

impl SweepPlan {
    /// Configurations in emission order. Savitzky-Golay windows not larger
    /// than the order are skipped.
    pub fn configurations(&self) -> Vec<SnrConfig> {
        let config = |method, window, order| SnrConfig {
            method,
            window,
            order,
            noise_fraction: self.noise_fraction,
        };
        let moving = (1..self.window_max)
            .step_by(2)
            .map(|window| config(SmoothingMethod::MovingAverage, window, 0));
        let savgol = self.savgol_orders.iter().flat_map(|&order| {
            (3..self.window_max)
                .step_by(2)
                .filter(move |&window| window > order)
                .map(move |window| config(SmoothingMethod::SavitzkyGolay, window, order))
        });
        moving.chain(savgol).collect()
    }
}

/// Runs the bootstrap for every configuration of `plan`.
pub fn run_sweep<F, R>(
    table: &ObservationTable,
    column: &str,
    gene_filter: F,
    plan: &SweepPlan,
    rng: &mut R,
) -> Result<Vec<BootstrapResult>>
where
    F: Fn(&Locus) -> bool,
    R: Rng + ?Sized,
{
    let source = table.column(column)?;
    let configurations = plan.configurations();
    info!(
        "Sweeping {} smoothing configurations on '{}' ({} trials each)",
        configurations.len(),
        column,
        plan.trials
    );

    let mut results = Vec::with_capacity(configurations.len());
    for config in configurations {
        let smoothed = smooth(source, config.method, config.window, config.order)?;
        let smoothed_table = table.clone().with_column(SMOOTHED_COLUMN, smoothed)?;
        let estimator = SnrEstimator::new(&smoothed_table, &gene_filter, SMOOTHED_COLUMN, plan.noise_pool)?;
        let summary = bootstrap_confidence(&estimator, config.noise_fraction, plan.trials, rng)?;
        debug!(
            "{} n={} order={}: mean {:.4} [{:.4}, {:.4}]",
            config.method, config.window, config.order, summary.mean, summary.low, summary.high
        );
        results.push(BootstrapResult {
            config,
            mean_ratio: summary.mean,
            confidence_low: summary.low,
            confidence_high: summary.high,
            sample_count: summary.trials,
            undefined_trials: summary.undefined_trials,
        });
    }
    Ok(results)
}

/// Deterministic SNR of one Savitzky-Golay configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScanPoint {
    pub window: usize,
    pub order: usize,
    pub ratio: f64,
}

/// Deterministic Savitzky-Golay grid: odd windows in `[3, window_max)`,
/// orders `1..min(window, max_order)`.
pub fn savgol_scan<F>(
    table: &ObservationTable,
    column: &str,
    gene_filter: F,
    pool: NoisePool,
    window_max: usize,
    max_order: usize,
) -> Result<Vec<ScanPoint>>
where
    F: Fn(&Locus) -> bool,
{
    if max_order < 2 {
        return Err(AnalysisError::InvalidParameter(format!(
            "max order must be at least 2, got {}",
            max_order
        )));
    }
    let source = table.column(column)?;
    let mut points = Vec::new();
    for window in (3..window_max).step_by(2) {
        for order in 1..window.min(max_order) {
            let smoothed = smooth(source, SmoothingMethod::SavitzkyGolay, window, order)?;
            let smoothed_table = table.clone().with_column(SMOOTHED_COLUMN, smoothed)?;
            let ratio = SnrEstimator::new(&smoothed_table, &gene_filter, SMOOTHED_COLUMN, pool)?.ratio();
            points.push(ScanPoint {
                window,
                order,
                ratio: SnrRatio::value(ratio),
            });
        }
    }
    Ok(points)
}
