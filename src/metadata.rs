//! Sample metadata handling.
//!
//! Reads SDRF sample sheets (ArrayExpress style) and assembles one
//! CpG x sample matrix per experimental group from per-sample tables.

use crate::error::{AnalysisError, Result};
use crate::io::{parse_value, read_table};
use crate::methylation::MethylationMatrix;
use indexmap::IndexMap;
use itertools::Itertools;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// An SDRF sheet with every cell kept as text.
#[derive(Debug, Clone, PartialEq)]
pub struct Sdrf {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Sdrf {
    pub fn column(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }
}

/// Reads an SDRF file, dropping lines that start with `comment_prefix` and
/// trimming header names.
pub fn read_sdrf(path: &Path, comment_prefix: &str, delimiter: u8) -> Result<Sdrf> {
    let content = fs::read_to_string(path)?;
    let kept: String = content
        .lines()
        .filter(|line| !line.starts_with(comment_prefix))
        .map(|line| format!("{}\n", line))
        .collect();

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(kept.as_bytes());
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let mut row: Vec<String> = record.iter().map(str::to_string).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }
    Ok(Sdrf { headers, rows })
}

/// First whitespace-separated token of a source name (`"GSM765899 1"` -> `"GSM765899"`).
pub fn clean_source_name(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or("")
}

/// Where to find groups, samples and values in the SDRF and sample tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MethylomeLayout {
    pub group_col: String,
    pub source_col: String,
    pub value_col: String,
    pub id_col: String,
    pub groups: (String, String),
    pub file_suffix: String,
}

impl Default for MethylomeLayout {
    fn default() -> Self {
        MethylomeLayout {
            group_col: "Comment [Sample_source_name]".to_string(),
            source_col: "Source Name".to_string(),
            value_col: "VALUE".to_string(),
            id_col: "Reporter Identifier".to_string(),
            groups: ("Newborns".to_string(), "Nonagenarians".to_string()),
            file_suffix: "_sample_table.txt".to_string(),
        }
    }
}

/// Cleaned sample ids per requested group, in sheet order.
pub fn group_samples(sdrf: &Sdrf, layout: &MethylomeLayout) -> Result<HashMap<String, Vec<String>>> {
    let source = sdrf.column(&layout.source_col)?;
    let group = sdrf.column(&layout.group_col)?;
    let wanted = [layout.groups.0.as_str(), layout.groups.1.as_str()];
    Ok(sdrf
        .rows
        .iter()
        .filter_map(|row| {
            let label = row[group].trim();
            let sample = clean_source_name(&row[source]);
            (wanted.contains(&label) && !sample.is_empty()).then(|| (label.to_string(), sample.to_string()))
        })
        .into_group_map())
}

/// Outer-joins the per-sample tables of one group; CpG ids end up sorted.
fn build_group_matrix(samples: &[String], sample_dir: &Path, layout: &MethylomeLayout) -> Result<Option<MethylationMatrix>> {
    let mut columns: IndexMap<String, HashMap<String, f64>> = IndexMap::new();
    for sample in samples {
        let path = sample_dir.join(format!("{}{}", sample, layout.file_suffix));
        if !path.exists() {
            warn!("Sample table not found: {}", path.display());
            continue;
        }
        let table = read_table(&path, b'\t')?;
        let id = table
            .column_index(&layout.id_col)
            .ok_or_else(|| AnalysisError::MissingColumn(format!("{} in {}", layout.id_col, path.display())))?;
        let value = table
            .column_index(&layout.value_col)
            .ok_or_else(|| AnalysisError::MissingColumn(format!("{} in {}", layout.value_col, path.display())))?;
        let mut values = HashMap::with_capacity(table.len());
        for row in &table.rows {
            values.insert(row[id].trim().to_string(), parse_value(&row[value])?);
        }
        columns.insert(sample.clone(), values);
    }
    if columns.is_empty() {
        return Ok(None);
    }

    let mut rows: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    let n_samples = columns.len();
    for (j, values) in columns.values().enumerate() {
        for (cpg, &v) in values {
            rows.entry(cpg.as_str()).or_insert_with(|| vec![f64::NAN; n_samples])[j] = v;
        }
    }
    let cpg_ids = rows.keys().map(|id| id.to_string()).collect();
    let sample_names = columns.keys().cloned().collect();
    let matrix = MethylationMatrix::from_rows(cpg_ids, sample_names, rows.into_values().collect())?;
    Ok(Some(matrix))
}

/// One matrix per layout group, `None` for a group without a readable sample.
pub fn build_methylome_matrices(
    sdrf_path: &Path,
    sample_dir: &Path,
    layout: &MethylomeLayout,
) -> Result<(Option<MethylationMatrix>, Option<MethylationMatrix>)> {
    let sdrf = read_sdrf(sdrf_path, "!", b'\t')?;
    let samples = group_samples(&sdrf, layout)?;
    let build = |group: &str| -> Result<Option<MethylationMatrix>> {
        let listed = samples.get(group).map(Vec::as_slice).unwrap_or(&[]);
        let matrix = build_group_matrix(listed, sample_dir, layout)?;
        match &matrix {
            Some(m) => info!(
                "Group '{}': {} CpGs x {} samples",
                group,
                m.dimensions().0,
                m.dimensions().1
            ),
            None => warn!("Group '{}' has no readable sample table", group),
        }
        Ok(matrix)
    };
    Ok((build(&layout.groups.0)?, build(&layout.groups.1)?))
}
