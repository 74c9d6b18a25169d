//! Main entry point for the gwas_snr application.

use anyhow::Result;
use clap::Parser;
use gwas_snr::cli::{run_cli, Cli};
use log::info;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Main function: parses arguments and orchestrates the analysis workflow.
fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    let config = cli.resolve_config()?;
    info!("Configuration: {:?}", config);

    if config.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .build_global()?;
    }
    info!("Using {} threads.", rayon::current_num_threads());

    let seed = config.seed.unwrap_or_else(|| rand::rng().random());
    info!("Random seed: {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    run_cli(cli.command, &config, &mut rng)?;

    info!("Analysis finished successfully.");
    Ok(())
}
