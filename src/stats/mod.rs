//! Statistical analysis module.
//!
//! Descriptive helpers shared by the SNR and methylation pipelines, Welch's
//! two-sample test and Benjamini-Hochberg adjustment.

pub mod bayesian;

pub use bayesian::{default_capability, BayesFactorTest};

use statrs::distribution::{ContinuousCDF, StudentsT};
use statrs::statistics::Statistics;

/// Copies the non-NaN values of `values`.
pub fn finite_values(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| !v.is_nan()).collect()
}

/// Arithmetic mean ignoring NaN. NaN when no value remains.
pub fn nan_mean(values: &[f64]) -> f64 {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Percentile `p` (0..=100) with linear interpolation between order statistics.
///
/// Returns NaN for empty input or when any value is NaN.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() || values.iter().any(|v| v.is_nan()) || !(0.0..=100.0).contains(&p) {
        return f64::NAN;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (rank - lo as f64) * (sorted[hi] - sorted[lo])
}

/// Two-sided p-value of Welch's unequal-variance t-test.
///
/// `None` when either sample has fewer than two values. When both samples
/// have zero variance the test degenerates: equal means give 1.0, different
/// means give 0.0.
pub fn welch_t_test(sample1: &[f64], sample2: &[f64]) -> Option<f64> {
    let n1 = sample1.len() as f64;
    let n2 = sample2.len() as f64;
    if sample1.len() < 2 || sample2.len() < 2 {
        return None;
    }
    let mean1 = sample1.mean();
    let mean2 = sample2.mean();
    let var1 = sample1.variance();
    let var2 = sample2.variance();

    let se2 = var1 / n1 + var2 / n2;
    if se2 == 0.0 {
        return Some(if mean1 == mean2 { 1.0 } else { 0.0 });
    }
    let t_stat = (mean1 - mean2) / se2.sqrt();
    let df = se2.powi(2) / ((var1 / n1).powi(2) / (n1 - 1.0) + (var2 / n2).powi(2) / (n2 - 1.0));
    let t_dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * t_dist.sf(t_stat.abs())).min(1.0))
}

/// Student's pooled-variance t statistic, `None` below two values per group
/// or when the pooled variance is zero.
pub fn student_t_statistic(sample1: &[f64], sample2: &[f64]) -> Option<f64> {
    let n1 = sample1.len() as f64;
    let n2 = sample2.len() as f64;
    if sample1.len() < 2 || sample2.len() < 2 {
        return None;
    }
    let pooled = ((n1 - 1.0) * sample1.variance() + (n2 - 1.0) * sample2.variance()) / (n1 + n2 - 2.0);
    let se = (pooled * (1.0 / n1 + 1.0 / n2)).sqrt();
    if se == 0.0 {
        return None;
    }
    Some((sample1.mean() - sample2.mean()) / se)
}

/// Benjamini-Hochberg q-values for a set of tests.
///
/// Undefined p-values take part in the correction as 1.0 and come back as
/// `None`.
pub fn benjamini_hochberg(p_values: &[Option<f64>]) -> Vec<Option<f64>> {
    if p_values.is_empty() {
        return Vec::new();
    }
    let filled: Vec<f64> = p_values.iter().map(|p| p.unwrap_or(1.0)).collect();
    let adjusted = adjustp::adjust(&filled, adjustp::Procedure::BenjaminiHochberg);
    p_values
        .iter()
        .zip(adjusted)
        .map(|(p, q)| p.map(|_| q))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_nan_mean() {
        assert_relative_eq!(nan_mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(nan_mean(&[f64::NAN]).is_nan());
        assert!(nan_mean(&[]).is_nan());
    }

    #[test]
    fn test_percentile_linear_interpolation() {
        let values = [4.0, 1.0, 3.0, 2.0, 5.0];
        assert_relative_eq!(percentile(&values, 0.0), 1.0);
        assert_relative_eq!(percentile(&values, 50.0), 3.0);
        assert_relative_eq!(percentile(&values, 100.0), 5.0);
        // rank = 0.025 * 4 = 0.1
        assert_relative_eq!(percentile(&values, 2.5), 1.1, epsilon = 1e-12);
        assert_relative_eq!(percentile(&values, 97.5), 4.9, epsilon = 1e-12);
        assert!(percentile(&[1.0, f64::NAN], 50.0).is_nan());
        assert!(percentile(&[], 50.0).is_nan());
    }

    #[test]
    fn test_welch_separated_groups() {
        let a = [0.19, 0.20, 0.21, 0.20, 0.22];
        let b = [0.79, 0.80, 0.81, 0.80, 0.78];
        let p = welch_t_test(&a, &b).unwrap();
        assert!(p < 1e-6, "p = {}", p);
    }

    #[test]
    fn test_welch_identical_groups() {
        let a = [0.4, 0.5, 0.6];
        assert_relative_eq!(welch_t_test(&a, &a).unwrap(), 1.0, epsilon = 1e-9);
        assert_eq!(welch_t_test(&[0.3, 0.3], &[0.3, 0.3]), Some(1.0));
        assert_eq!(welch_t_test(&[0.3, 0.3], &[0.7, 0.7]), Some(0.0));
        assert_eq!(welch_t_test(&[0.3], &[0.7, 0.8]), None);
    }

    #[test]
    fn test_welch_matches_reference_value() {
        // t = -1.2247, df = 4
        let a = [1.0, 2.0, 3.0];
        let b = [2.0, 3.0, 4.0];
        let p = welch_t_test(&a, &b).unwrap();
        assert_relative_eq!(p, 0.287864134727, epsilon = 1e-6);
    }

    #[test]
    fn test_benjamini_hochberg_with_missing() {
        let p = [Some(0.01), None, Some(0.04), Some(0.03)];
        let q = benjamini_hochberg(&p);
        assert_eq!(q[1], None);
        // m = 4, sorted p: 0.01, 0.03, 0.04, 1.0
        assert_relative_eq!(q[0].unwrap(), 0.04, epsilon = 1e-12);
        assert_relative_eq!(q[3].unwrap(), 0.04 * 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(q[2].unwrap(), 0.04 * 4.0 / 3.0, epsilon = 1e-12);
        for (p, q) in p.iter().zip(&q) {
            if let (Some(p), Some(q)) = (p, q) {
                assert!(q >= p);
            }
        }
    }
}
