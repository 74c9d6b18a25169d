//! Association data keyed by genomic locus.
//!
//! An [`ObservationTable`] holds one [`Locus`] per predictor together with an
//! ordered set of named numeric columns (p-value transforms, smoothed
//! signals, ratios). Every column is exactly as long as the locus list.

use crate::error::{AnalysisError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Column written by the sweep when it re-smooths the signal.
pub const SMOOTHED_COLUMN: &str = "smooth_result";

/// Identity and genomic placement of one predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Locus {
    pub predictor: String,
    pub chromosome: String,
    pub position: u64,
    pub gene_name: Option<String>,
}

impl Locus {
    pub fn new(
        predictor: impl Into<String>,
        chromosome: impl Into<String>,
        position: u64,
        gene_name: Option<&str>,
    ) -> Self {
        Locus {
            predictor: predictor.into(),
            chromosome: chromosome.into(),
            position,
            gene_name: gene_name.map(str::to_string),
        }
    }
}

/// Sort key for chromosome labels: autosomes numerically, then X, Y, then the rest.
pub fn chromosome_rank(chromosome: &str) -> u32 {
    match chromosome {
        "X" => 23,
        "Y" => 24,
        c => c.parse::<u32>().unwrap_or(25),
    }
}

/// Compares two loci in genome order (chromosome rank, label, position).
pub fn genomic_order(a: &Locus, b: &Locus) -> Ordering {
    chromosome_rank(&a.chromosome)
        .cmp(&chromosome_rank(&b.chromosome))
        .then_with(|| a.chromosome.cmp(&b.chromosome))
        .then_with(|| a.position.cmp(&b.position))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationTable {
    loci: Vec<Locus>,
    columns: IndexMap<String, Vec<f64>>,
    primary: String,
}

impl ObservationTable {
    /// Creates a table from its loci and primary signal column.
    pub fn new(loci: Vec<Locus>, primary: &str, signal: Vec<f64>) -> Result<Self> {
        let mut table = ObservationTable {
            loci,
            columns: IndexMap::new(),
            primary: primary.to_string(),
        };
        table.push_column(primary, signal)?;
        Ok(table)
    }

    /// Inserts (or replaces) a numeric column.
    pub fn push_column(&mut self, name: &str, values: Vec<f64>) -> Result<()> {
        if values.len() != self.loci.len() {
            return Err(AnalysisError::InvalidShape(format!(
                "column '{}' has {} values, table has {} rows",
                name,
                values.len(),
                self.loci.len()
            )));
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// Builder-style variant of [`push_column`](Self::push_column).
    pub fn with_column(mut self, name: &str, values: Vec<f64>) -> Result<Self> {
        self.push_column(name, values)?;
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Result<&[f64]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    pub fn primary_name(&self) -> &str {
        &self.primary
    }

    pub fn primary(&self) -> &[f64] {
        // The primary column is inserted by the constructor and never removed.
        &self.columns[self.primary.as_str()]
    }

    pub fn loci(&self) -> &[Locus] {
        &self.loci
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.loci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }

    /// Returns a copy of the table with rows in genome order.
    ///
    /// Smoothing is position-order dependent, so callers that care about
    /// genomic neighbourhoods sort before smoothing.
    pub fn sort_by_genomic_order(&self) -> Self {
        let mut order: Vec<usize> = (0..self.loci.len()).collect();
        order.sort_by(|&a, &b| genomic_order(&self.loci[a], &self.loci[b]));
        self.take_rows(&order)
    }

    /// Keeps the rows for which `keep(locus, row_index)` holds.
    pub fn filter<F>(&self, keep: F) -> Self
    where
        F: Fn(&Locus, usize) -> bool,
    {
        let rows: Vec<usize> = self
            .loci
            .iter()
            .enumerate()
            .filter(|(i, locus)| keep(locus, *i))
            .map(|(i, _)| i)
            .collect();
        self.take_rows(&rows)
    }

    fn take_rows(&self, rows: &[usize]) -> Self {
        let loci = rows.iter().map(|&i| self.loci[i].clone()).collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| (name.clone(), rows.iter().map(|&i| values[i]).collect()))
            .collect();
        ObservationTable {
            loci,
            columns,
            primary: self.primary.clone(),
        }
    }
}
