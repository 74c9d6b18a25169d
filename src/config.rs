//! Run configuration, loaded from JSON and overridden by command-line flags.

use crate::error::Result;
use crate::sweep::SweepPlan;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Names of the association and marker table columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub predictor: String,
    pub chromosome: String,
    pub position: String,
    pub gene: String,
    pub signal: String,
    /// Key column of the marker table, renamed to `predictor` when merging.
    pub marker_id: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            predictor: "Predictor".to_string(),
            chromosome: "Chromosome".to_string(),
            position: "Position".to_string(),
            gene: "Gene Name".to_string(),
            signal: "T_log10_P".to_string(),
            marker_id: "Markers".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub columns: ColumnNames,
    /// Field separator of the association and marker tables.
    pub delimiter: char,
    pub sweep: SweepPlan,
    pub seed: Option<u64>,
    /// Worker threads; 0 lets rayon decide.
    pub threads: usize,
    pub min_samples_per_group: usize,
    pub group_names: (String, String),
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            columns: ColumnNames::default(),
            delimiter: ';',
            sweep: SweepPlan::default(),
            seed: None,
            threads: 0,
            min_samples_per_group: 2,
            group_names: ("group1".to_string(), "group2".to_string()),
        }
    }
}

impl AnalysisConfig {
    /// Reads a JSON configuration; absent fields keep their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let config = serde_json::from_reader(BufReader::new(file))?;
        Ok(config)
    }

    /// Delimiter as the single byte the csv reader expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        if self.delimiter.is_ascii() {
            Ok(self.delimiter as u8)
        } else {
            Err(crate::error::AnalysisError::InvalidParameter(format!(
                "delimiter '{}' is not an ASCII character",
                self.delimiter
            )))
        }
    }
}
