//! CSV writers for every analysis output. Missing values are written as `NA`.

use crate::bootstrap::WindowDistribution;
use crate::error::Result;
use crate::layout::{ManhattanPoint, VolcanoPoint, VolcanoScore};
use crate::methylation::ComparisonResult;
use crate::observation::ObservationTable;
use crate::sweep::{BootstrapResult, ScanPoint};
use csv::Writer;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

fn create_writer(path: &Path) -> Result<Writer<BufWriter<File>>> {
    let file = File::create(path)?;
    Ok(Writer::from_writer(BufWriter::new(file)))
}

fn number(value: f64) -> String {
    if value.is_nan() {
        "NA".to_string()
    } else {
        value.to_string()
    }
}

fn optional(value: Option<f64>) -> String {
    value.map_or("NA".to_string(), number)
}

/// One row per sweep configuration, in sweep order.
pub fn write_sweep(results: &[BootstrapResult], path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;
    writer.write_record([
        "n",
        "order",
        "method",
        "signal_noise_mean",
        "conf_lower",
        "conf_upper",
        "trials",
        "undefined_trials",
    ])?;
    for result in results {
        writer.write_record([
            result.config.window.to_string(),
            result.config.order.to_string(),
            result.config.method.to_string(),
            number(result.mean_ratio),
            number(result.confidence_low),
            number(result.confidence_high),
            result.sample_count.to_string(),
            result.undefined_trials.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/// Long format: one row per (window, trial).
pub fn write_distribution(distributions: &[WindowDistribution], path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(["n", "trial", "signal_noise_ratio"])?;
    for distribution in distributions {
        for (trial, ratio) in distribution.ratios.iter().enumerate() {
            writer.write_record([distribution.window.to_string(), trial.to_string(), number(*ratio)])?;
        }
    }
    writer.flush()?;
    Ok(())
}

pub fn write_scan(points: &[ScanPoint], path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(["n", "order", "signal_noise_ratio"])?;
    for point in points {
        writer.write_record([point.window.to_string(), point.order.to_string(), number(point.ratio)])?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes per-CpG comparison rows. `bayesian` selects the `bf10` column
/// instead of `pvalue`/`qvalue`; group means are headed `<name>_mean`.
pub fn write_comparison(
    results: &[ComparisonResult],
    group_names: (&str, &str),
    bayesian: bool,
    path: &Path,
) -> Result<()> {
    let mut writer = create_writer(path)?;
    let mut header = vec![
        "cpg_id".to_string(),
        format!("{}_mean", group_names.0),
        format!("{}_mean", group_names.1),
        "delta".to_string(),
    ];
    if bayesian {
        header.push("bf10".to_string());
    } else {
        header.push("pvalue".to_string());
        header.push("qvalue".to_string());
    }
    writer.write_record(&header)?;

    for result in results {
        let mut record = vec![
            result.cpg_id.clone(),
            number(result.mean_a),
            number(result.mean_b),
            number(result.delta),
        ];
        if bayesian {
            record.push(optional(result.bf10));
        } else {
            record.push(optional(result.p_value));
            record.push(optional(result.q_value));
        }
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Locus columns followed by every numeric column of the table.
pub fn write_observations(table: &ObservationTable, path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;
    let names: Vec<&str> = table.column_names().collect();
    let mut header = vec!["Predictor", "Chromosome", "Position", "Gene Name"];
    header.extend(&names);
    writer.write_record(&header)?;

    let columns = names
        .iter()
        .map(|name| table.column(name))
        .collect::<Result<Vec<_>>>()?;
    for (row, locus) in table.loci().iter().enumerate() {
        let mut record = vec![
            locus.predictor.clone(),
            locus.chromosome.clone(),
            locus.position.to_string(),
            locus.gene_name.clone().unwrap_or_default(),
        ];
        record.extend(columns.iter().map(|values| number(values[row])));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_manhattan(points: &[ManhattanPoint], path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(["Predictor", "Chromosome", "Position", "Pos_cum", "value", "highlighted"])?;
    for point in points {
        writer.write_record([
            point.predictor.clone(),
            point.chromosome.clone(),
            point.position.to_string(),
            point.cumulative_position.to_string(),
            number(point.value),
            point.highlighted.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_volcano(points: &[VolcanoPoint], path: &Path) -> Result<()> {
    let mut writer = create_writer(path)?;
    writer.write_record(["cpg_id", "delta", "score", "score_kind"])?;
    for point in points {
        let kind = match point.kind {
            VolcanoScore::NegLog10P => "neg_log10_p",
            VolcanoScore::Log10Bf10 => "log10_bf10",
        };
        writer.write_record([
            point.cpg_id.clone(),
            number(point.delta),
            number(point.score),
            kind.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}
