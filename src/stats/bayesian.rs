//! Bayes-factor capability for two-group comparisons.
//!
//! The Bayesian comparison path needs something that turns two samples into
//! a BF10. That capability is injected through [`BayesFactorTest`]; the
//! built-in JZS implementation is compiled in with the `bayes` feature.

/// Evidence for a difference between two groups, as a Bayes factor BF10.
pub trait BayesFactorTest: Send + Sync {
    /// Returns BF10 for NaN-free samples, or `None` when it cannot be computed.
    fn bf10(&self, group_a: &[f64], group_b: &[f64]) -> Option<f64>;
}

/// The capability available in this build, if any.
#[cfg(feature = "bayes")]
pub fn default_capability() -> Option<Box<dyn BayesFactorTest>> {
    Some(Box::new(JzsBayesFactor::default()))
}

#[cfg(not(feature = "bayes"))]
pub fn default_capability() -> Option<Box<dyn BayesFactorTest>> {
    None
}

#[cfg(feature = "bayes")]
pub use jzs::{bayes_factor_from_t, JzsBayesFactor};

#[cfg(feature = "bayes")]
mod jzs {
    use super::BayesFactorTest;
    use crate::stats::student_t_statistic;
    use std::f64::consts::PI;

    // Integration runs over x = ln(g).
    const LOG_G_MIN: f64 = -20.0;
    const LOG_G_MAX: f64 = 30.0;
    const INTERVALS: usize = 2000;

    /// Two-sample JZS Bayes factor (Cauchy prior on effect size with scale `r`).
    #[derive(Debug, Clone, Copy)]
    pub struct JzsBayesFactor {
        pub r: f64,
    }

    impl Default for JzsBayesFactor {
        fn default() -> Self {
            JzsBayesFactor { r: 0.707 }
        }
    }

    impl BayesFactorTest for JzsBayesFactor {
        fn bf10(&self, group_a: &[f64], group_b: &[f64]) -> Option<f64> {
            let t = student_t_statistic(group_a, group_b)?;
            Some(bayes_factor_from_t(t, group_a.len(), group_b.len(), self.r))
        }
    }

    /// BF10 for a two-sample Student t statistic with group sizes `nx`, `ny`.
    pub fn bayes_factor_from_t(t: f64, nx: usize, ny: usize, r: f64) -> f64 {
        let df = (nx + ny) as f64 - 2.0;
        let n = (nx * ny) as f64 / (nx + ny) as f64;
        let r2 = r * r;

        let log_integrand = |x: f64| -> f64 {
            let g = x.exp();
            let shrink = 1.0 + n * g * r2;
            -0.5 * shrink.ln() - (df + 1.0) / 2.0 * (1.0 + t * t / (shrink * df)).ln()
                - 0.5 * (2.0 * PI).ln()
                - 0.5 * x
                - 1.0 / (2.0 * g)
        };

        // Composite Simpson in log space, scaled by the largest term.
        let h = (LOG_G_MAX - LOG_G_MIN) / INTERVALS as f64;
        let logs: Vec<f64> = (0..=INTERVALS)
            .map(|i| log_integrand(LOG_G_MIN + i as f64 * h))
            .collect();
        let peak = logs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let sum: f64 = logs
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let weight = if i == 0 || i == INTERVALS {
                    1.0
                } else if i % 2 == 1 {
                    4.0
                } else {
                    2.0
                };
                weight * (l - peak).exp()
            })
            .sum();
        let log_integral = peak + (sum * h / 3.0).ln();
        let log_null = -(df + 1.0) / 2.0 * (1.0 + t * t / df).ln();
        (log_integral - log_null).exp()
    }
}

#[cfg(all(test, feature = "bayes"))]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_bayes_factor() {
        assert_relative_eq!(bayes_factor_from_t(3.5, 20, 20, 0.707), 26.743, max_relative = 1e-3);
    }

    #[test]
    fn test_null_effect_favours_h0() {
        let bf = bayes_factor_from_t(0.0, 20, 20, 0.707);
        assert!(bf < 1.0 && bf > 0.2, "bf = {}", bf);
    }

    #[test]
    fn test_capability_on_samples() {
        let capability = default_capability().unwrap();
        let a = [0.19, 0.20, 0.21, 0.20, 0.22, 0.18];
        let b = [0.79, 0.80, 0.81, 0.80, 0.78, 0.82];
        assert!(capability.bf10(&a, &b).unwrap() > 100.0);
        assert!(capability.bf10(&a, &a).unwrap() < 1.0);
        assert_eq!(capability.bf10(&a[..1], &b), None);
    }
}
