//! # Compare Filters
//!
//! Runs every job of a comparison config in order, evaluating the configured amplitude filters
//! against simulated pile-up, and writes the per-event errors and their summary statistics.
mod job;
mod output;
mod parameters;

use chrono::Utc;
use clap::Parser;
use job::Comparison;
use miette::IntoDiagnostic;
use output::{default_output_folder, write_output_files};
use parameters::CompareConfig;
use pileup_common::{TracerOptions, init_tracer};
use pileup_simulator::setup::read_json;
use rand::{SeedableRng, rngs::StdRng};
use std::path::{Path, PathBuf};
use tracing::info;

/// [clap] derived struct to handle command line parameters.
#[derive(Debug, Parser)]
#[clap(author, version = pileup_common::version!(), about)]
struct Cli {
    /// JSON config describing the pulse shape, filters and jobs
    config: PathBuf,

    /// Folder the results are written to, `out/compare_filters_<case>_<timestamp>` by default
    #[clap(long)]
    output: Option<PathBuf>,

    /// Seed of the random generator, taken from the clock when absent
    #[clap(long)]
    seed: Option<u64>,

    /// Log filter directive, overrides RUST_LOG
    #[clap(long)]
    log_filter: Option<String>,
}

fn main() -> miette::Result<()> {
    let args = Cli::parse();
    init_tracer(&TracerOptions::new(args.log_filter.as_deref())).into_diagnostic()?;

    let config: CompareConfig = read_json(&args.config).into_diagnostic()?;
    let base_dir = args.config.parent().unwrap_or(Path::new("."));
    let comparison = Comparison::new(&config, base_dir).into_diagnostic()?;

    let seed = args
        .seed
        .unwrap_or_else(|| Utc::now().timestamp_subsec_nanos() as u64);
    info!("Random seed: {seed}");
    let mut rng = StdRng::seed_from_u64(seed);

    let n_jobs = config.jobs.len();
    let results = config
        .jobs
        .iter()
        .enumerate()
        .map(|(index, job)| {
            info!("Job {} of {n_jobs}", index + 1);
            comparison.run(index, job, &mut rng)
        })
        .collect::<Result<Vec<_>, _>>()
        .into_diagnostic()?;

    let folder = args
        .output
        .unwrap_or_else(|| default_output_folder(&args.config));
    write_output_files(&folder, &config, &results).into_diagnostic()?;
    Ok(())
}
