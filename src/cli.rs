//! Command-line interface: argument definitions and command dispatch.

use crate::bootstrap::{bootstrap_distribution, DISTRIBUTION_NOISE_FRACTION};
use crate::config::AnalysisConfig;
use crate::io::{
    read_methylation_matrix, read_observations, write_comparison, write_distribution, write_manhattan,
    write_observations, write_scan, write_sweep, write_volcano,
};
use crate::layout::{manhattan, volcano};
use crate::metadata::{build_methylome_matrices, MethylomeLayout};
use crate::methylation::{compare_groups, compare_groups_bayesian, MethylationMatrix};
use crate::observation::{ObservationTable, SMOOTHED_COLUMN};
use crate::progress::{self, ProgressMode};
use crate::smoothing::{smooth, SmoothingMethod};
use crate::snr::{filter_by_ratio, gene_named, pangenomic_snr, NoisePool, RATIO_COLUMN};
use crate::stats::default_capability;
use crate::sweep::{run_sweep, savgol_scan};
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about = "Signal-to-noise analysis of GWAS and methylation data", long_about = None)]
pub struct Cli {
    /// Debug-level logging (RUST_LOG still takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    /// Seed for every random draw; drawn from OS entropy when absent.
    #[arg(long, global = true)]
    pub seed: Option<u64>,

    /// Field separator of the association and marker tables.
    #[arg(long, global = true)]
    pub delimiter: Option<char>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied.
    pub fn resolve_config(&self) -> Result<AnalysisConfig> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::load(path)
                .with_context(|| format!("Failed to load configuration {}", path.display()))?,
            None => AnalysisConfig::default(),
        };
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if let Some(delimiter) = self.delimiter {
            config.delimiter = delimiter;
        }
        Ok(config)
    }
}

/// Association input shared by the gene-centred commands.
#[derive(Args, Debug)]
pub struct GeneInput {
    /// Association table (`.gz` accepted).
    #[arg(short, long)]
    pub input: PathBuf,

    /// Marker annotation table merged onto the association table.
    #[arg(short, long)]
    pub markers: Option<PathBuf>,

    /// Gene whose predictors form the signal.
    #[arg(short, long)]
    pub gene: String,

    /// Numeric column to analyse instead of the configured signal column.
    #[arg(long)]
    pub column: Option<String>,

    /// Background rows the gene is compared against.
    #[arg(long, value_enum)]
    pub noise_pool: Option<NoisePool>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Bootstrap the gene SNR over every smoothing configuration
    Sweep {
        #[command(flatten)]
        target: GeneInput,

        #[arg(short, long)]
        output: PathBuf,

        /// Exclusive upper bound on window sizes
        #[arg(long)]
        window_max: Option<usize>,

        #[arg(long)]
        trials: Option<usize>,

        /// Share of the noise pool drawn per trial
        #[arg(long)]
        noise_fraction: Option<f64>,
    },

    /// Deterministic SNR over a Savitzky-Golay (window, order) grid
    Scan {
        #[command(flatten)]
        target: GeneInput,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long, default_value_t = 20)]
        window_max: usize,

        #[arg(long, default_value_t = 10)]
        max_order: usize,
    },

    /// Raw bootstrap ratios per moving-average window
    Distribution {
        #[command(flatten)]
        target: GeneInput,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        window_max: Option<usize>,

        #[arg(long)]
        trials: Option<usize>,

        /// Share of the noise pool drawn per trial
        #[arg(long, default_value_t = DISTRIBUTION_NOISE_FRACTION)]
        noise_fraction: f64,
    },

    /// Genome-wide SNR with a Manhattan layout of high-ratio predictors
    Pangenomic {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        markers: Option<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,

        #[arg(long)]
        column: Option<String>,

        #[arg(long, value_enum, default_value_t = SmoothingMethod::MovingAverage)]
        method: SmoothingMethod,

        /// Smoothing window applied before the SNR
        #[arg(long, default_value_t = 5)]
        smooth_window: usize,

        /// Savitzky-Golay polynomial order
        #[arg(long, default_value_t = 2)]
        order: usize,

        /// Window of the local signal average
        #[arg(long, default_value_t = 3)]
        window: usize,

        /// Predictors with a ratio above this are highlighted
        #[arg(long, default_value_t = 6.0)]
        threshold: f64,
    },

    /// Per-CpG comparison of two methylation groups
    Compare {
        /// CpG x sample matrix of the first group
        #[arg(long, requires = "group_b", conflicts_with = "sdrf")]
        group_a: Option<PathBuf>,

        #[arg(long, requires = "group_a")]
        group_b: Option<PathBuf>,

        /// SDRF sample sheet; groups are built from per-sample tables
        #[arg(long, requires = "sample_dir")]
        sdrf: Option<PathBuf>,

        #[arg(long, requires = "sdrf")]
        sample_dir: Option<PathBuf>,

        #[arg(short, long)]
        output: PathBuf,

        /// Minimum observed values per group for a Welch test
        #[arg(long)]
        min_samples: Option<usize>,

        /// Report BF10 instead of Welch p-values
        #[arg(long)]
        bayesian: bool,

        #[arg(long, value_enum, default_value_t = ProgressMode::Bar)]
        progress: ProgressMode,
    },
}

/// Main entry point for CLI
pub fn run_cli(command: Commands, config: &AnalysisConfig, rng: &mut StdRng) -> Result<()> {
    let delimiter = config.delimiter_byte()?;
    match command {
        Commands::Sweep {
            target,
            output,
            window_max,
            trials,
            noise_fraction,
        } => {
            let (table, column) = load_target(&target, config, delimiter)?;
            let mut plan = config.sweep.clone();
            plan.window_max = window_max.unwrap_or(plan.window_max);
            plan.trials = trials.unwrap_or(plan.trials);
            plan.noise_fraction = noise_fraction.unwrap_or(plan.noise_fraction);
            plan.noise_pool = target.noise_pool.unwrap_or(plan.noise_pool);

            let results = run_sweep(&table, &column, gene_named(&target.gene), &plan, rng)
                .with_context(|| format!("Sweep failed for gene '{}'", target.gene))?;
            write_sweep(&results, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote {} sweep rows to {}", results.len(), output.display());
        }
        Commands::Scan {
            target,
            output,
            window_max,
            max_order,
        } => {
            let (table, column) = load_target(&target, config, delimiter)?;
            let pool = target.noise_pool.unwrap_or(config.sweep.noise_pool);
            let points = savgol_scan(&table, &column, gene_named(&target.gene), pool, window_max, max_order)?;
            write_scan(&points, &output).with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote {} scan points to {}", points.len(), output.display());
        }
        Commands::Distribution {
            target,
            output,
            window_max,
            trials,
            noise_fraction,
        } => {
            let (table, column) = load_target(&target, config, delimiter)?;
            let plan = &config.sweep;
            let distributions = bootstrap_distribution(
                &table,
                &column,
                gene_named(&target.gene),
                target.noise_pool.unwrap_or(plan.noise_pool),
                window_max.unwrap_or(plan.window_max),
                noise_fraction,
                trials.unwrap_or(plan.trials),
                rng,
            )?;
            write_distribution(&distributions, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            info!("Wrote {} window distributions to {}", distributions.len(), output.display());
        }
        Commands::Pangenomic {
            input,
            markers,
            output,
            column,
            method,
            smooth_window,
            order,
            window,
            threshold,
        } => {
            let table = read_observations(&input, markers.as_deref(), delimiter, &config.columns)
                .with_context(|| format!("Failed to read {}", input.display()))?
                .sort_by_genomic_order();
            let column = column.unwrap_or_else(|| config.columns.signal.clone());
            let smoothed = smooth(table.column(&column)?, method, smooth_window, order)?;
            let table = table.with_column(SMOOTHED_COLUMN, smoothed)?;

            let snr = pangenomic_snr(&table, SMOOTHED_COLUMN, window)?;
            let high = filter_by_ratio(&snr, threshold)?;
            info!(
                "{} of {} predictors have {} > {}",
                high.len(),
                snr.len(),
                RATIO_COLUMN,
                threshold
            );
            write_observations(&snr, &output).with_context(|| format!("Failed to write {}", output.display()))?;

            let highlight: HashSet<String> = high.loci().iter().map(|l| l.predictor.clone()).collect();
            let points = manhattan(&snr, SMOOTHED_COLUMN, &highlight)?;
            let layout_path = output.with_extension("manhattan.csv");
            write_manhattan(&points, &layout_path)
                .with_context(|| format!("Failed to write {}", layout_path.display()))?;
        }
        Commands::Compare {
            group_a,
            group_b,
            sdrf,
            sample_dir,
            output,
            min_samples,
            bayesian,
            progress: mode,
        } => {
            let (names, a, b) = load_groups(group_a, group_b, sdrf, sample_dir, config)?;
            let mut reporter = progress::select(mode);
            let results = if bayesian {
                let capability = default_capability();
                compare_groups_bayesian(&a, &b, capability.as_deref(), reporter.as_mut())?
            } else {
                let min_samples = min_samples.unwrap_or(config.min_samples_per_group);
                compare_groups(&a, &b, min_samples, reporter.as_mut())?
            };
            write_comparison(&results, (names.0.as_str(), names.1.as_str()), bayesian, &output)
                .with_context(|| format!("Failed to write {}", output.display()))?;

            let layout_path = output.with_extension("volcano.csv");
            write_volcano(&volcano(&results), &layout_path)
                .with_context(|| format!("Failed to write {}", layout_path.display()))?;
            info!("Compared {} CpGs; results in {}", results.len(), output.display());
        }
    }
    Ok(())
}

fn load_target(target: &GeneInput, config: &AnalysisConfig, delimiter: u8) -> Result<(ObservationTable, String)> {
    let table = read_observations(&target.input, target.markers.as_deref(), delimiter, &config.columns)
        .with_context(|| format!("Failed to read {}", target.input.display()))?;
    let column = target
        .column
        .clone()
        .unwrap_or_else(|| config.columns.signal.clone());
    Ok((table, column))
}

/// Tab for `.tsv`/`.txt` matrices (compressed or not), comma otherwise.
fn matrix_delimiter(path: &Path) -> u8 {
    let name = path.to_string_lossy();
    let name = name.strip_suffix(".gz").unwrap_or(&name);
    if name.ends_with(".tsv") || name.ends_with(".txt") {
        b'\t'
    } else {
        b','
    }
}

type Groups = ((String, String), MethylationMatrix, MethylationMatrix);

fn load_groups(
    group_a: Option<PathBuf>,
    group_b: Option<PathBuf>,
    sdrf: Option<PathBuf>,
    sample_dir: Option<PathBuf>,
    config: &AnalysisConfig,
) -> Result<Groups> {
    match (group_a, group_b, sdrf, sample_dir) {
        (Some(a), Some(b), _, _) => {
            let read = |path: &Path| {
                read_methylation_matrix(path, matrix_delimiter(path))
                    .with_context(|| format!("Failed to read {}", path.display()))
            };
            Ok((config.group_names.clone(), read(a.as_path())?, read(b.as_path())?))
        }
        (_, _, Some(sdrf), Some(sample_dir)) => {
            let layout = MethylomeLayout::default();
            let (a, b) = build_methylome_matrices(&sdrf, &sample_dir, &layout)
                .with_context(|| format!("Failed to assemble groups from {}", sdrf.display()))?;
            let missing = |group: &str| anyhow!("No sample table could be read for group '{}'", group);
            Ok((
                layout.groups.clone(),
                a.ok_or_else(|| missing(&layout.groups.0))?,
                b.ok_or_else(|| missing(&layout.groups.1))?,
            ))
        }
        _ => bail!("compare needs either --group-a/--group-b or --sdrf/--sample-dir"),
    }
}
