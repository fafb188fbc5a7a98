//! # Simulator
//!
//! Generates a windowed pile-up dataset from a JSON setup and writes it to
//! `<output-dir>/dataset.csv`. An existing dataset is left untouched.
use chrono::Utc;
use clap::Parser;
use miette::IntoDiagnostic;
use pileup_common::{TracerOptions, init_tracer};
use pileup_simulator::{
    generate_dataset_task,
    setup::{Setup, read_json},
};
use rand::{SeedableRng, rngs::StdRng};
use std::path::{Path, PathBuf};
use tracing::info;

/// [clap] derived struct to handle command line parameters.
#[derive(Debug, Parser)]
#[clap(author, version = pileup_common::version!(), about)]
struct Cli {
    /// JSON setup describing the pulse shape, pulse generator and dataset
    setup: PathBuf,

    /// Directory the dataset is written to
    output_dir: PathBuf,

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

    let setup: Setup = read_json(&args.setup).into_diagnostic()?;
    let base_dir = args.setup.parent().unwrap_or(Path::new("."));

    let seed = args
        .seed
        .unwrap_or_else(|| Utc::now().timestamp_subsec_nanos() as u64);
    info!("Random seed: {seed}");
    let mut rng = StdRng::seed_from_u64(seed);

    let outcome =
        generate_dataset_task(&setup, base_dir, &args.output_dir, &mut rng).into_diagnostic()?;
    info!("{outcome:?}");
    Ok(())
}
