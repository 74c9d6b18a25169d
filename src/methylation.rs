//! CpG x sample beta-value matrices and per-CpG two-group comparisons.

use crate::error::{AnalysisError, Result};
use crate::progress::ProgressReporter;
use crate::stats::{benjamini_hochberg, nan_mean, welch_t_test, BayesFactorTest};
use log::info;
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Beta values (NaN = missing) with unique CpG ids as rows and samples as columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethylationMatrix {
    values: Array2<f64>,
    cpg_ids: Vec<String>,
    cpg_map: HashMap<String, usize>,
    sample_names: Vec<String>,
}

impl MethylationMatrix {
    pub fn new(cpg_ids: Vec<String>, sample_names: Vec<String>, values: Array2<f64>) -> Result<Self> {
        if values.dim() != (cpg_ids.len(), sample_names.len()) {
            return Err(AnalysisError::InvalidShape(format!(
                "values are {:?}, labels describe {} CpGs x {} samples",
                values.dim(),
                cpg_ids.len(),
                sample_names.len()
            )));
        }
        let mut cpg_map = HashMap::with_capacity(cpg_ids.len());
        for (i, id) in cpg_ids.iter().enumerate() {
            if cpg_map.insert(id.clone(), i).is_some() {
                return Err(AnalysisError::InvalidShape(format!(
                    "CpG id '{}' appears more than once",
                    id
                )));
            }
        }
        Ok(MethylationMatrix {
            values,
            cpg_ids,
            cpg_map,
            sample_names,
        })
    }

    /// Builds a matrix from row vectors.
    pub fn from_rows(cpg_ids: Vec<String>, sample_names: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_samples = sample_names.len();
        if let Some(bad) = rows.iter().position(|r| r.len() != n_samples) {
            return Err(AnalysisError::InvalidShape(format!(
                "row {} has {} values, expected {}",
                bad,
                rows[bad].len(),
                n_samples
            )));
        }
        let flat: Vec<f64> = rows.into_iter().flatten().collect();
        let values = Array2::from_shape_vec((cpg_ids.len(), n_samples), flat)
            .map_err(|e| AnalysisError::InvalidShape(e.to_string()))?;
        Self::new(cpg_ids, sample_names, values)
    }

    pub fn row(&self, cpg_id: &str) -> Option<ArrayView1<'_, f64>> {
        self.cpg_map.get(cpg_id).map(|&idx| self.values.row(idx))
    }

    pub fn cpg_ids(&self) -> &[String] {
        &self.cpg_ids
    }

    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }

    /// (CpGs, samples)
    pub fn dimensions(&self) -> (usize, usize) {
        self.values.dim()
    }

    /// CpG ids present in both matrices, in the order of `self`.
    pub fn shared_ids<'a>(&'a self, other: &MethylationMatrix) -> Vec<&'a str> {
        self.cpg_ids
            .iter()
            .filter(|id| other.cpg_map.contains_key(id.as_str()))
            .map(String::as_str)
            .collect()
    }
}

/// Per-CpG comparison of group A against group B.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub cpg_id: String,
    pub mean_a: f64,
    pub mean_b: f64,
    /// `mean_b - mean_a`
    pub delta: f64,
    pub p_value: Option<f64>,
    pub q_value: Option<f64>,
    pub bf10: Option<f64>,
}

fn shared_rows<'a>(a: &'a MethylationMatrix, b: &MethylationMatrix) -> Result<Vec<&'a str>> {
    let shared = a.shared_ids(b);
    if shared.is_empty() {
        return Err(AnalysisError::EmptyIntersection);
    }
    info!(
        "{} CpGs shared between groups ({} and {} in input)",
        shared.len(),
        a.cpg_ids.len(),
        b.cpg_ids.len()
    );
    Ok(shared)
}

/// Non-missing values of one CpG row in one matrix.
fn observed(matrix: &MethylationMatrix, cpg_id: &str) -> Vec<f64> {
    matrix
        .row(cpg_id)
        .map(|row| row.iter().copied().filter(|v| !v.is_nan()).collect())
        .unwrap_or_default()
}

fn base_result(cpg_id: &str, group_a: &[f64], group_b: &[f64]) -> ComparisonResult {
    let mean_a = nan_mean(group_a);
    let mean_b = nan_mean(group_b);
    ComparisonResult {
        cpg_id: cpg_id.to_string(),
        mean_a,
        mean_b,
        delta: mean_b - mean_a,
        p_value: None,
        q_value: None,
        bf10: None,
    }
}

/// Welch t-test per shared CpG followed by Benjamini-Hochberg correction.
///
/// Rows where either group has fewer than `min_samples` observed values get
/// no p-value and no q-value.
pub fn compare_groups(
    a: &MethylationMatrix,
    b: &MethylationMatrix,
    min_samples: usize,
    progress: &mut dyn ProgressReporter,
) -> Result<Vec<ComparisonResult>> {
    let shared = shared_rows(a, b)?;
    progress.start(shared.len(), "Welch t-test");

    let mut results = Vec::with_capacity(shared.len());
    for cpg_id in shared {
        let group_a = observed(a, cpg_id);
        let group_b = observed(b, cpg_id);
        let mut result = base_result(cpg_id, &group_a, &group_b);
        if group_a.len() >= min_samples && group_b.len() >= min_samples {
            result.p_value = welch_t_test(&group_a, &group_b);
        }
        results.push(result);
        progress.advance();
    }
    progress.finish();

    let p_values: Vec<Option<f64>> = results.iter().map(|r| r.p_value).collect();
    for (result, q) in results.iter_mut().zip(benjamini_hochberg(&p_values)) {
        result.q_value = q;
    }
    Ok(results)
}

/// Bayes factor (BF10) per shared CpG.
///
/// Fails with `MissingDependency` before doing any work when no Bayes-factor
/// capability is supplied.
pub fn compare_groups_bayesian(
    a: &MethylationMatrix,
    b: &MethylationMatrix,
    test: Option<&dyn BayesFactorTest>,
    progress: &mut dyn ProgressReporter,
) -> Result<Vec<ComparisonResult>> {
    let test = test.ok_or_else(|| {
        AnalysisError::MissingDependency(
            "Bayesian comparison needs a Bayes-factor test; build with the `bayes` feature".to_string(),
        )
    })?;
    let shared = shared_rows(a, b)?;
    progress.start(shared.len(), "Compute BF10");

    let mut results = Vec::with_capacity(shared.len());
    for cpg_id in shared {
        let group_a = observed(a, cpg_id);
        let group_b = observed(b, cpg_id);
        let mut result = base_result(cpg_id, &group_a, &group_b);
        result.bf10 = test.bf10(&group_a, &group_b);
        results.push(result);
        progress.advance();
    }
    progress.finish();
    Ok(results)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::progress::SilentProgress;
    use approx::assert_relative_eq;

    fn ids(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    /// c1 separated, c2 identical, c3 mostly missing in group A.
    pub(crate) fn group_matrices() -> (MethylationMatrix, MethylationMatrix) {
        let nan = f64::NAN;
        let a = MethylationMatrix::from_rows(
            ids(&["c1", "c2", "c3", "a_only"]),
            ids(&["A1", "A2", "A3", "A4"]),
            vec![
                vec![0.19, 0.20, 0.21, 0.20],
                vec![0.40, 0.50, 0.60, 0.50],
                vec![0.30, nan, nan, nan],
                vec![0.1, 0.1, 0.1, 0.1],
            ],
        )
        .unwrap();
        let b = MethylationMatrix::from_rows(
            ids(&["c3", "c2", "c1", "b_only"]),
            ids(&["B1", "B2", "B3", "B4"]),
            vec![
                vec![0.5, 0.6, 0.55, 0.52],
                vec![0.40, 0.50, 0.60, 0.50],
                vec![0.79, 0.80, 0.81, 0.80],
                vec![0.9, 0.9, 0.9, 0.9],
            ],
        )
        .unwrap();
        (a, b)
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let err = MethylationMatrix::from_rows(ids(&["c1", "c1"]), ids(&["S1"]), vec![vec![0.1], vec![0.2]])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidShape(_)));
        let err = MethylationMatrix::from_rows(ids(&["c1"]), ids(&["S1", "S2"]), vec![vec![0.1]]).unwrap_err();
        assert!(matches!(err, AnalysisError::InvalidShape(_)));
    }

    #[test]
    fn test_compare_groups_scenario() {
        let (a, b) = group_matrices();
        let results = compare_groups(&a, &b, 2, &mut SilentProgress).unwrap();
        let order: Vec<&str> = results.iter().map(|r| r.cpg_id.as_str()).collect();
        assert_eq!(order, vec!["c1", "c2", "c3"]);

        let c1 = &results[0];
        assert_relative_eq!(c1.delta, 0.6, epsilon = 1e-12);
        assert!(c1.p_value.unwrap() < 0.01);
        assert!(c1.q_value.unwrap() < 0.05);

        let c2 = &results[1];
        assert!(c2.p_value.unwrap() > 0.5);

        let c3 = &results[2];
        assert_eq!(c3.p_value, None);
        assert_eq!(c3.q_value, None);
        assert_relative_eq!(c3.mean_a, 0.30);

        for r in &results {
            if let (Some(p), Some(q)) = (r.p_value, r.q_value) {
                assert!(q >= p);
            }
            assert_eq!(r.bf10, None);
        }
    }

    #[test]
    fn test_min_samples_threshold() {
        let (a, b) = group_matrices();
        let results = compare_groups(&a, &b, 5, &mut SilentProgress).unwrap();
        assert!(results.iter().all(|r| r.p_value.is_none() && r.q_value.is_none()));
    }

    #[test]
    fn test_constant_groups_are_separated() {
        let a = MethylationMatrix::from_rows(ids(&["c1"]), ids(&["A1", "A2", "A3"]), vec![vec![0.2; 3]]).unwrap();
        let b = MethylationMatrix::from_rows(ids(&["c1"]), ids(&["B1", "B2", "B3"]), vec![vec![0.8; 3]]).unwrap();
        let results = compare_groups(&a, &b, 2, &mut SilentProgress).unwrap();
        assert_eq!(results.len(), 1);
        assert_relative_eq!(results[0].delta, 0.6, epsilon = 1e-12);
        assert!(results[0].p_value.unwrap() < 0.01);
        assert!(results[0].q_value.unwrap() < 0.05);
    }

    #[test]
    fn test_empty_intersection() {
        let a = MethylationMatrix::from_rows(ids(&["x"]), ids(&["S1"]), vec![vec![0.1]]).unwrap();
        let b = MethylationMatrix::from_rows(ids(&["y"]), ids(&["S2"]), vec![vec![0.2]]).unwrap();
        assert!(matches!(
            compare_groups(&a, &b, 2, &mut SilentProgress),
            Err(AnalysisError::EmptyIntersection)
        ));
    }

    struct MeanGap;

    impl BayesFactorTest for MeanGap {
        fn bf10(&self, group_a: &[f64], group_b: &[f64]) -> Option<f64> {
            Some(1.0 + (nan_mean(group_b) - nan_mean(group_a)).abs())
        }
    }

    #[test]
    fn test_bayesian_requires_capability() {
        let (a, b) = group_matrices();
        assert!(matches!(
            compare_groups_bayesian(&a, &b, None, &mut SilentProgress),
            Err(AnalysisError::MissingDependency(_))
        ));

        let results = compare_groups_bayesian(&a, &b, Some(&MeanGap), &mut SilentProgress).unwrap();
        assert_eq!(results.len(), 3);
        assert_relative_eq!(results[0].bf10.unwrap(), 1.6, epsilon = 1e-12);
        assert!(results.iter().all(|r| r.p_value.is_none()));
    }

    #[cfg(feature = "bayes")]
    #[test]
    fn test_bayesian_with_default_capability() {
        let (a, b) = group_matrices();
        let capability = crate::stats::default_capability().unwrap();
        let results = compare_groups_bayesian(&a, &b, Some(capability.as_ref()), &mut SilentProgress).unwrap();
        assert!(results[0].bf10.unwrap() > 10.0);
        assert!(results[1].bf10.unwrap() < 1.0);
        // c3 has a single observed value in group A.
        assert_eq!(results[2].bf10, None);
    }
}
