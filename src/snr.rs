//! Signal-to-noise ratio of a gene of interest against its background.

use crate::error::{AnalysisError, Result};
use crate::observation::{Locus, ObservationTable};
use crate::smoothing::rolling_mean_partial;
use crate::stats::{finite_values, nan_mean};
use clap::ValueEnum;
use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Column holding the locally averaged signal in [`pangenomic_snr`] output.
pub const SIGNAL_COLUMN: &str = "Signal";
/// Column holding the per-row ratio in [`pangenomic_snr`] output.
pub const RATIO_COLUMN: &str = "Signal_Noise_Ratio";

/// Which rows form the background a gene is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum NoisePool {
    /// Every row outside the gene, including rows without a gene label.
    #[default]
    #[value(name = "all")]
    AllOther,
    /// Rows outside the gene that carry a gene label.
    #[value(name = "labelled")]
    LabelledOther,
}

/// Outcome of a ratio computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SnrRatio {
    Defined(f64),
    /// Noise was zero or NaN, or the signal was undefined.
    Undefined,
}

impl SnrRatio {
    fn from_parts(signal: f64, noise: f64) -> Self {
        let ratio = signal / noise;
        if noise == 0.0 || !ratio.is_finite() {
            SnrRatio::Undefined
        } else {
            SnrRatio::Defined(ratio)
        }
    }

    /// The ratio as a float, NaN when undefined.
    pub fn value(self) -> f64 {
        match self {
            SnrRatio::Defined(v) => v,
            SnrRatio::Undefined => f64::NAN,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, SnrRatio::Defined(_))
    }
}

/// Predicate selecting the rows of a gene by exact name.
pub fn gene_named(gene: &str) -> impl Fn(&Locus) -> bool + '_ {
    move |locus| locus.gene_name.as_deref() == Some(gene)
}

/// Gene versus background partition of one column, computed once and reused
/// across bootstrap draws.
#[derive(Debug, Clone)]
pub struct SnrEstimator {
    signal: f64,
    noise_mean: f64,
    noise_values: Vec<f64>,
}

impl SnrEstimator {
    pub fn new<F>(table: &ObservationTable, gene_filter: F, column: &str, pool: NoisePool) -> Result<Self>
    where
        F: Fn(&Locus) -> bool,
    {
        let values = table.column(column)?;
        let mut signal_values = Vec::new();
        let mut noise_values = Vec::new();
        for (locus, &value) in table.loci().iter().zip(values) {
            if gene_filter(locus) {
                signal_values.push(value);
            } else if pool == NoisePool::AllOther || locus.gene_name.is_some() {
                noise_values.push(value);
            }
        }
        debug!(
            "SNR partition on '{}': {} signal rows, {} noise rows ({:?})",
            column,
            signal_values.len(),
            noise_values.len(),
            pool
        );

        Ok(SnrEstimator {
            signal: nan_mean(&signal_values),
            noise_mean: nan_mean(&noise_values),
            noise_values: finite_values(&noise_values),
        })
    }

    pub fn signal(&self) -> f64 {
        self.signal
    }

    /// Mean of the whole noise pool.
    pub fn noise(&self) -> f64 {
        self.noise_mean
    }

    pub fn noise_pool_size(&self) -> usize {
        self.noise_values.len()
    }

    /// Signal over the mean of the whole noise pool.
    pub fn ratio(&self) -> SnrRatio {
        SnrRatio::from_parts(self.signal, self.noise_mean)
    }

    /// Signal over the mean of `max(1, floor(noise_fraction * pool))` noise
    /// values drawn with replacement.
    pub fn bootstrap_ratio<R: Rng + ?Sized>(&self, noise_fraction: f64, rng: &mut R) -> Result<SnrRatio> {
        check_noise_fraction(noise_fraction)?;
        let pool = self.noise_values.len();
        if pool == 0 {
            return Err(AnalysisError::InvalidParameter(
                "noise pool is empty, nothing to resample".to_string(),
            ));
        }
        let size = ((noise_fraction * pool as f64).floor() as usize).max(1);
        let total: f64 = (0..size)
            .map(|_| self.noise_values[rng.random_range(0..pool)])
            .sum();
        Ok(SnrRatio::from_parts(self.signal, total / size as f64))
    }
}

pub(crate) fn check_noise_fraction(noise_fraction: f64) -> Result<()> {
    if noise_fraction > 0.0 && noise_fraction <= 1.0 {
        Ok(())
    } else {
        Err(AnalysisError::InvalidParameter(format!(
            "noise fraction must be in (0, 1], got {}",
            noise_fraction
        )))
    }
}

/// Per-row signal-to-noise along the genome.
///
/// Rows are put in genome order, `column` is averaged over a centred window
/// (truncated at the edges) into [`SIGNAL_COLUMN`], and divided by the
/// global mean of `column` into [`RATIO_COLUMN`].
pub fn pangenomic_snr(table: &ObservationTable, column: &str, window: usize) -> Result<ObservationTable> {
    let mut sorted = table.sort_by_genomic_order();
    let values = sorted.column(column)?.to_vec();
    let signal = rolling_mean_partial(&values, window)?;
    let global_noise = nan_mean(&values);
    let ratios = signal.iter().map(|s| s / global_noise).collect();
    sorted.push_column(SIGNAL_COLUMN, signal)?;
    sorted.push_column(RATIO_COLUMN, ratios)?;
    Ok(sorted)
}

/// Rows of a [`pangenomic_snr`] table whose ratio exceeds `threshold`.
pub fn filter_by_ratio(table: &ObservationTable, threshold: f64) -> Result<ObservationTable> {
    let ratios = table.column(RATIO_COLUMN)?;
    Ok(table.filter(|_, i| ratios[i] > threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::tests::peak_table;
    use crate::observation::{Locus, SMOOTHED_COLUMN};
    use crate::smoothing::moving_average;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_deterministic_ratio_on_smoothed_peak() {
        let table = peak_table();
        let smoothed = moving_average(table.primary(), 3).unwrap();
        let table = table.with_column(SMOOTHED_COLUMN, smoothed).unwrap();

        let estimator = SnrEstimator::new(&table, gene_named("G"), SMOOTHED_COLUMN, NoisePool::AllOther).unwrap();
        assert_relative_eq!(estimator.signal(), 7.0 / 3.0, epsilon = 1e-12);
        // Background smoothed values: 1, 2, 2, 1
        assert_relative_eq!(estimator.noise(), 1.5, epsilon = 1e-12);
        let first = estimator.ratio();
        assert_relative_eq!(first.value(), (7.0 / 3.0) / 1.5, epsilon = 1e-12);
        assert_eq!(first, estimator.ratio());
    }

    #[test]
    fn test_noise_pool_variants() {
        let loci = vec![
            Locus::new("a", "1", 1, Some("G")),
            Locus::new("b", "1", 2, Some("H")),
            Locus::new("c", "1", 3, None),
        ];
        let table = ObservationTable::new(loci, "p", vec![6.0, 2.0, 4.0]).unwrap();
        let all = SnrEstimator::new(&table, gene_named("G"), "p", NoisePool::AllOther).unwrap();
        let labelled = SnrEstimator::new(&table, gene_named("G"), "p", NoisePool::LabelledOther).unwrap();
        assert_relative_eq!(all.ratio().value(), 2.0);
        assert_relative_eq!(labelled.ratio().value(), 3.0);
        assert_eq!(labelled.noise_pool_size(), 1);
    }

    #[test]
    fn test_zero_noise_is_undefined() {
        let loci = vec![Locus::new("a", "1", 1, Some("G")), Locus::new("b", "1", 2, None)];
        let table = ObservationTable::new(loci, "p", vec![3.0, 0.0]).unwrap();
        let estimator = SnrEstimator::new(&table, gene_named("G"), "p", NoisePool::AllOther).unwrap();
        assert_eq!(estimator.ratio(), SnrRatio::Undefined);
        assert!(estimator.ratio().value().is_nan());

        let missing_gene = SnrEstimator::new(&table, gene_named("absent"), "p", NoisePool::AllOther).unwrap();
        assert!(!missing_gene.ratio().is_defined());
    }

    #[test]
    fn test_bootstrap_ratio_bounds_and_errors() {
        let table = peak_table();
        let estimator = SnrEstimator::new(&table, gene_named("G"), "T_log10_P", NoisePool::AllOther).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            // Single draw from {1, 2, 2, 1}: ratio is 3 or 1.5.
            let ratio = estimator.bootstrap_ratio(0.1, &mut rng).unwrap().value();
            assert!(ratio == 3.0 || ratio == 1.5, "ratio = {}", ratio);
        }
        assert!(matches!(
            estimator.bootstrap_ratio(0.0, &mut rng),
            Err(AnalysisError::InvalidParameter(_))
        ));

        let lonely = ObservationTable::new(vec![Locus::new("a", "1", 1, Some("G"))], "p", vec![1.0]).unwrap();
        let estimator = SnrEstimator::new(&lonely, gene_named("G"), "p", NoisePool::AllOther).unwrap();
        assert!(matches!(
            estimator.bootstrap_ratio(0.5, &mut rng),
            Err(AnalysisError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_bootstrap_is_reproducible_with_seed() {
        let table = peak_table();
        let estimator = SnrEstimator::new(&table, gene_named("G"), "T_log10_P", NoisePool::AllOther).unwrap();
        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..10)
                .map(|_| estimator.bootstrap_ratio(0.5, &mut rng).unwrap().value())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(11), draw(11));
    }

    #[test]
    fn test_pangenomic_snr() {
        let loci = vec![
            Locus::new("b", "2", 10, None),
            Locus::new("a", "1", 20, None),
            Locus::new("c", "1", 10, Some("G")),
        ];
        let table = ObservationTable::new(loci, "p", vec![3.0, 1.0, 2.0]).unwrap();
        let snr = pangenomic_snr(&table, "p", 3).unwrap();
        let order: Vec<&str> = snr.loci().iter().map(|l| l.predictor.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
        // Sorted values 2, 1, 3; rolling means 1.5, 2, 2; global mean 2.
        let ratios = snr.column(RATIO_COLUMN).unwrap();
        assert_relative_eq!(ratios[0], 0.75);
        assert_relative_eq!(ratios[1], 1.0);
        let high = filter_by_ratio(&snr, 0.9).unwrap();
        assert_eq!(high.len(), 2);
    }
}
