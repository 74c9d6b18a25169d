//! Plot-ready coordinates: Manhattan and volcano layouts.
//!
//! Nothing here draws; the points are written as CSV and rendered elsewhere.

use crate::error::Result;
use crate::methylation::ComparisonResult;
use crate::observation::{chromosome_rank, ObservationTable};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManhattanPoint {
    pub predictor: String,
    pub chromosome: String,
    pub position: u64,
    /// Position shifted by the summed extents of all preceding chromosomes.
    pub cumulative_position: u64,
    pub value: f64,
    pub highlighted: bool,
}

/// Start offset of each chromosome on the concatenated genome axis.
///
/// Chromosomes are laid out by [`chromosome_rank`] (ties broken by label)
/// and each one spans up to its largest observed position.
pub fn chromosome_offsets(table: &ObservationTable) -> IndexMap<String, u64> {
    let mut extents: IndexMap<String, u64> = IndexMap::new();
    for locus in table.loci() {
        let extent = extents.entry(locus.chromosome.clone()).or_insert(0);
        *extent = (*extent).max(locus.position);
    }
    extents.sort_by(|a, _, b, _| {
        chromosome_rank(a)
            .cmp(&chromosome_rank(b))
            .then_with(|| a.cmp(b))
    });

    let mut offset = 0;
    extents
        .into_iter()
        .map(|(chromosome, extent)| {
            let start = offset;
            offset += extent;
            (chromosome, start)
        })
        .collect()
}

/// Manhattan layout of `column`, rows in genome order. Predictors listed in
/// `highlight` are flagged.
pub fn manhattan(
    table: &ObservationTable,
    column: &str,
    highlight: &HashSet<String>,
) -> Result<Vec<ManhattanPoint>> {
    let sorted = table.sort_by_genomic_order();
    let values = sorted.column(column)?;
    let offsets = chromosome_offsets(&sorted);
    Ok(sorted
        .loci()
        .iter()
        .zip(values)
        .map(|(locus, &value)| ManhattanPoint {
            predictor: locus.predictor.clone(),
            chromosome: locus.chromosome.clone(),
            position: locus.position,
            cumulative_position: locus.position + offsets.get(&locus.chromosome).copied().unwrap_or(0),
            value,
            highlighted: highlight.contains(&locus.predictor),
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolcanoScore {
    /// `-log10(p)` of the Welch test.
    NegLog10P,
    /// `log10(BF10)`.
    Log10Bf10,
}

/// Smallest p-value or Bayes factor a score is computed from, keeping scores finite.
const SCORE_FLOOR: f64 = f64::MIN_POSITIVE;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolcanoPoint {
    pub cpg_id: String,
    pub delta: f64,
    pub score: f64,
    pub kind: VolcanoScore,
}

/// One point per comparison row that carries a p-value or a Bayes factor.
///
/// p-values and Bayes factors of zero are floored at [`f64::MIN_POSITIVE`],
/// so scores stay finite (at most about 307.65).
pub fn volcano(results: &[ComparisonResult]) -> Vec<VolcanoPoint> {
    results
        .iter()
        .filter_map(|r| {
            let (score, kind) = match (r.p_value, r.bf10) {
                // `+ 0.0` turns -0.0 (p = 1) into 0.0.
                (Some(p), _) => (-p.max(SCORE_FLOOR).log10() + 0.0, VolcanoScore::NegLog10P),
                (None, Some(bf)) => (bf.max(SCORE_FLOOR).log10(), VolcanoScore::Log10Bf10),
                (None, None) => return None,
            };
            Some(VolcanoPoint {
                cpg_id: r.cpg_id.clone(),
                delta: r.delta,
                score,
                kind,
            })
        })
        .collect()
}
