use crate::{dataset_generator::DatasetError, setup::ConfigError, setup::Setup};
use rand::Rng;
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, instrument};

pub const DATASET_FILE_NAME: &str = "dataset.csv";

#[derive(Debug, Error)]
pub enum DatasetTaskError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir { path: PathBuf, source: io::Error },
}

#[derive(Debug, PartialEq)]
pub enum DatasetTaskOutcome {
    Written(PathBuf),
    /// The output file already existed and was left untouched.
    Skipped(PathBuf),
}

/// Generates the windowed dataset described by `setup` into `output_dir/dataset.csv`.
#[instrument(skip_all, fields(output_dir = %output_dir.display()), err(level = "error"))]
pub fn generate_dataset_task<R: Rng + ?Sized>(
    setup: &Setup,
    base_dir: &Path,
    output_dir: &Path,
    rng: &mut R,
) -> Result<DatasetTaskOutcome, DatasetTaskError> {
    let output_file = output_dir.join(DATASET_FILE_NAME);
    if output_file.exists() {
        info!("Dataset already exists, skipping: {}", output_file.display());
        return Ok(DatasetTaskOutcome::Skipped(output_file));
    }

    let datasets = setup.build_dataset_generator(base_dir)?;
    let params = &setup.dataset_generator;
    info!(
        n_events = params.n_events,
        pileup_luminosity = params.pileup_luminosity,
        pileup_occupancy = params.pileup_occupancy,
        sampling_rate = params.sampling_rate,
        signal_pileup_ratio = params.signal_pileup_ratio,
        window_size = params.window_size,
        "Generating dataset"
    );
    let dataset = datasets.generate_windowed_samples(
        rng,
        params.window_size,
        params.sampling_rate,
        params.n_events,
        params.pileup_occupancy,
    )?;

    fs::create_dir_all(output_dir).map_err(|source| DatasetTaskError::OutputDir {
        path: output_dir.to_owned(),
        source,
    })?;
    dataset.write_samples(&output_file)?;
    debug!("Dataset ready");
    Ok(DatasetTaskOutcome::Written(output_file))
}
