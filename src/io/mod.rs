//! Input/Output operations module.
//!
//! Reads association, marker and methylation tables (optionally gzipped)
//! and writes analysis outputs as CSV (see [`export`]).

pub mod export;

pub use export::{
    write_comparison, write_distribution, write_manhattan, write_observations, write_scan, write_sweep,
    write_volcano,
};

use crate::config::ColumnNames;
use crate::error::{AnalysisError, Result};
use crate::methylation::MethylationMatrix;
use crate::observation::{Locus, ObservationTable};
use flate2::read::GzDecoder;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// Opens `path` for reading, decompressing `.gz` files on the fly.
pub fn open_input(path: &Path) -> Result<Box<dyn Read>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    if path.extension().and_then(|e| e.to_str()) == Some("gz") {
        Ok(Box::new(GzDecoder::new(reader)))
    } else {
        Ok(Box::new(reader))
    }
}

/// A delimited table with every cell kept as text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    fn require(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| AnalysisError::MissingColumn(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Reads a delimited file with a header row. Header names are trimmed.
pub fn read_table(path: &Path, delimiter: u8) -> Result<RawTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::Headers)
        .from_reader(open_input(path)?);
    let headers = rdr.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    let table = RawTable { headers, rows };
    debug!(
        "Read {} rows x {} columns from {}",
        table.len(),
        table.headers.len(),
        path.display()
    );
    Ok(table)
}

/// Left-joins marker annotations onto the association table.
///
/// The marker key column (`columns.marker_id`) plays the role of the
/// predictor. Columns present in both tables keep the association value;
/// unmatched association rows get empty cells.
pub fn merge_markers(assoc: &RawTable, markers: &RawTable, columns: &ColumnNames) -> Result<RawTable> {
    let assoc_key = assoc.require(&columns.predictor)?;
    let marker_key = markers.require(&columns.marker_id)?;

    let extra: Vec<usize> = markers
        .headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != marker_key && *h != &columns.predictor && assoc.column_index(h).is_none())
        .map(|(i, _)| i)
        .collect();

    let mut by_marker: HashMap<&str, &[String]> = HashMap::with_capacity(markers.len());
    for row in &markers.rows {
        let key = row[marker_key].as_str();
        if by_marker.insert(key, row.as_slice()).is_some() {
            warn!("Marker '{}' is listed more than once; keeping its last annotation", key);
        }
    }

    let mut headers = assoc.headers.clone();
    headers.extend(extra.iter().map(|&i| markers.headers[i].clone()));

    let mut matched = 0;
    let rows = assoc
        .rows
        .iter()
        .map(|row| {
            let annotation = by_marker.get(row[assoc_key].as_str());
            if annotation.is_some() {
                matched += 1;
            }
            let mut merged = row.clone();
            merged.extend(
                extra
                    .iter()
                    .map(|&i| annotation.map(|a| a[i].clone()).unwrap_or_default()),
            );
            merged
        })
        .collect();

    info!("Annotated {} of {} predictors from the marker table", matched, assoc.len());
    Ok(RawTable { headers, rows })
}

/// Parses a numeric cell; empty, `NA` and `nan` cells are missing values.
pub(crate) fn parse_value(cell: &str) -> Result<f64> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>()
        .map_err(|_| AnalysisError::Parse(format!("'{}' is not a number", cell)))
}

/// Genomic positions may come through a float column after a join.
fn parse_position(cell: &str) -> Option<u64> {
    let cell = cell.trim();
    cell.parse::<u64>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite() && *v >= 0.0 && v.fract() == 0.0)
            .map(|v| v as u64)
    })
}

fn present(cell: &str) -> Option<&str> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("na") || cell.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(cell)
    }
}

/// Builds an [`ObservationTable`] from a merged raw table.
///
/// The signal column becomes the primary column; every other non-key column
/// whose cells all parse as numbers is carried along. Rows without a
/// chromosome or a usable position are skipped.
pub fn observation_table_from_raw(raw: &RawTable, columns: &ColumnNames) -> Result<ObservationTable> {
    let predictor = raw.require(&columns.predictor)?;
    let chromosome = raw.require(&columns.chromosome)?;
    let position = raw.require(&columns.position)?;
    let signal = raw.require(&columns.signal)?;
    let gene = raw.column_index(&columns.gene);

    let mut loci = Vec::with_capacity(raw.len());
    let mut kept = Vec::with_capacity(raw.len());
    for (i, row) in raw.rows.iter().enumerate() {
        let placed = present(&row[chromosome]).zip(parse_position(&row[position]));
        match placed {
            Some((chrom, pos)) => {
                let gene_name = gene.and_then(|g| present(&row[g]));
                loci.push(Locus::new(row[predictor].trim(), chrom, pos, gene_name));
                kept.push(i);
            }
            None => warn!(
                "Skipping predictor '{}': no chromosome or position",
                row[predictor]
            ),
        }
    }

    let numeric = |col: usize| -> Result<Vec<f64>> {
        kept.iter().map(|&i| parse_value(&raw.rows[i][col])).collect()
    };
    let signal_values = numeric(signal).map_err(|e| {
        AnalysisError::Parse(format!("signal column '{}': {}", columns.signal, e))
    })?;
    let mut table = ObservationTable::new(loci, &columns.signal, signal_values)?;

    let keys = [Some(predictor), Some(chromosome), Some(position), Some(signal), gene];
    for (col, name) in raw.headers.iter().enumerate() {
        if keys.contains(&Some(col)) {
            continue;
        }
        match numeric(col) {
            Ok(values) => table.push_column(name, values)?,
            Err(_) => debug!("Column '{}' is not numeric; not loaded", name),
        }
    }

    info!(
        "Loaded {} predictors ({} skipped), columns: {}",
        table.len(),
        raw.len() - table.len(),
        table.column_names().collect::<Vec<_>>().join(", ")
    );
    Ok(table)
}

/// Reads the association table, merges marker annotations when given, and
/// builds the observation table.
pub fn read_observations(
    input: &Path,
    markers: Option<&Path>,
    delimiter: u8,
    columns: &ColumnNames,
) -> Result<ObservationTable> {
    let mut raw = read_table(input, delimiter)?;
    if let Some(markers) = markers {
        let marker_table = read_table(markers, delimiter)?;
        raw = merge_markers(&raw, &marker_table, columns)?;
    }
    observation_table_from_raw(&raw, columns)
}

/// Reads a CpG x sample matrix: CpG ids in the first column, one column per
/// sample.
pub fn read_methylation_matrix(path: &Path, delimiter: u8) -> Result<MethylationMatrix> {
    let raw = read_table(path, delimiter)?;
    if raw.headers.len() < 2 {
        return Err(AnalysisError::InvalidShape(format!(
            "{} needs an id column and at least one sample column",
            path.display()
        )));
    }
    let sample_names = raw.headers[1..].to_vec();
    let mut cpg_ids = Vec::with_capacity(raw.len());
    let mut rows = Vec::with_capacity(raw.len());
    for row in &raw.rows {
        cpg_ids.push(row[0].trim().to_string());
        rows.push(row[1..].iter().map(|c| parse_value(c)).collect::<Result<Vec<f64>>>()?);
    }
    let matrix = MethylationMatrix::from_rows(cpg_ids, sample_names, rows)?;
    info!(
        "Loaded methylation matrix {} ({} CpGs x {} samples)",
        path.display(),
        matrix.dimensions().0,
        matrix.dimensions().1
    );
    Ok(matrix)
}
