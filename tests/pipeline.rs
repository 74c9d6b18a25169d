use gwas_snr::config::AnalysisConfig;
use gwas_snr::io::{read_methylation_matrix, read_observations, write_comparison, write_sweep};
use gwas_snr::layout::manhattan;
use gwas_snr::methylation::compare_groups;
use gwas_snr::observation::SMOOTHED_COLUMN;
use gwas_snr::progress::SilentProgress;
use gwas_snr::smoothing::moving_average;
use gwas_snr::snr::{filter_by_ratio, gene_named, pangenomic_snr};
use gwas_snr::sweep::{run_sweep, SweepPlan};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// 30 predictors over chromosomes 1 and 2; CD14 covers rows 10..=12.
fn write_gwas_inputs(dir: &Path) {
    let mut assoc = String::from("Predictor;T_log10_P\n");
    let mut markers = String::from("Markers;Chromosome;Position;Gene Name\n");
    for i in 0..30 {
        let signal = if (10..=12).contains(&i) {
            8.0
        } else {
            1.0 + (i % 5) as f64 * 0.1
        };
        assoc.push_str(&format!("rs{};{}\n", i, signal));
        let (chromosome, position) = if i < 20 { ("1", 1000 + i * 100) } else { ("2", 500 + i * 100) };
        let gene = if (10..=12).contains(&i) { "CD14" } else { "" };
        markers.push_str(&format!("rs{};{};{};{}\n", i, chromosome, position, gene));
    }
    fs::write(dir.join("assoc.csv"), assoc).unwrap();
    fs::write(dir.join("markers.csv"), markers).unwrap();
}

#[test]
fn gene_sweep_from_files() {
    let dir = tempdir().unwrap();
    write_gwas_inputs(dir.path());
    let config = AnalysisConfig::default();
    let table = read_observations(
        &dir.path().join("assoc.csv"),
        Some(&dir.path().join("markers.csv")),
        config.delimiter_byte().unwrap(),
        &config.columns,
    )
    .unwrap();
    assert_eq!(table.len(), 30);

    let plan = SweepPlan {
        window_max: 7,
        trials: 100,
        noise_fraction: 0.5,
        ..SweepPlan::default()
    };
    let mut rng = StdRng::seed_from_u64(17);
    let results = run_sweep(&table, "T_log10_P", gene_named("CD14"), &plan, &mut rng).unwrap();
    assert_eq!(results.len(), plan.configurations().len());
    for result in &results {
        assert!(result.mean_ratio > 1.0, "{:?}", result);
        assert!(result.confidence_low <= result.confidence_high);
    }

    let mut rng = StdRng::seed_from_u64(17);
    let again = run_sweep(&table, "T_log10_P", gene_named("CD14"), &plan, &mut rng).unwrap();
    assert_eq!(results, again);

    let out = dir.path().join("sweep.csv");
    write_sweep(&results, &out).unwrap();
    let written = fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), results.len() + 1);
}

#[test]
fn pangenomic_highlights_gene_peak() {
    let dir = tempdir().unwrap();
    write_gwas_inputs(dir.path());
    let config = AnalysisConfig::default();
    let table = read_observations(
        &dir.path().join("assoc.csv"),
        Some(&dir.path().join("markers.csv")),
        b';',
        &config.columns,
    )
    .unwrap()
    .sort_by_genomic_order();
    let smoothed = moving_average(table.primary(), 5).unwrap();
    let table = table.with_column(SMOOTHED_COLUMN, smoothed).unwrap();

    let snr = pangenomic_snr(&table, SMOOTHED_COLUMN, 3).unwrap();
    let high = filter_by_ratio(&snr, 2.0).unwrap();
    let highlighted: HashSet<String> = high.loci().iter().map(|l| l.predictor.clone()).collect();
    assert!(highlighted.contains("rs11"));
    assert!(!highlighted.contains("rs0"));

    let points = manhattan(&snr, SMOOTHED_COLUMN, &highlighted).unwrap();
    assert_eq!(points.len(), 30);
    // Chromosome 2 starts after the largest chromosome 1 position (2900).
    let first_chr2 = points.iter().find(|p| p.chromosome == "2").unwrap();
    assert_eq!(first_chr2.cumulative_position, 2900 + 2500);
}

#[test]
fn methylation_comparison_from_files() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("young.csv");
    let b = dir.path().join("old.csv");
    fs::write(&a, "ID_REF,Y1,Y2,Y3,Y4\ncg1,0.19,0.20,0.21,0.20\ncg2,0.4,0.5,0.6,0.5\ncg9,0.3,,NA,\n").unwrap();
    fs::write(&b, "ID_REF,O1,O2,O3\ncg2,0.4,0.5,0.6\ncg1,0.79,0.80,0.81\ncg9,0.5,0.6,0.55\n").unwrap();

    let a = read_methylation_matrix(&a, b',').unwrap();
    let b = read_methylation_matrix(&b, b',').unwrap();
    let results = compare_groups(&a, &b, 2, &mut SilentProgress).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results[0].p_value.unwrap() < 0.01);
    assert!(results[1].p_value.unwrap() > 0.5);
    assert!(results[2].p_value.is_none());

    let out = dir.path().join("stats.csv");
    write_comparison(&results, ("young", "old"), false, &out).unwrap();
    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with("cpg_id,young_mean,old_mean,delta,pvalue,qvalue\n"));
    assert!(written.contains("cg9,0.3,0.55,"));
}
