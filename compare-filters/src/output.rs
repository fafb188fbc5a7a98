//! Result files of a comparison run.
use crate::{job::JobResult, parameters::CompareConfig};
use chrono::Local;
use pileup_common::Real;
use serde::Serialize;
use std::{
    fs::{self, File},
    io::{self, BufWriter},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{info, instrument};

pub(crate) const PARAMS_FILE_NAME: &str = "params.json";
pub(crate) const SUMMARY_FILE_NAME: &str = "summary.dat";

#[derive(Debug, Error)]
pub(crate) enum OutputError {
    #[error("Cannot write {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// `out/compare_filters_<case>_<YYYYmmdd_HHMMSS>`, where `case` is the config file's stem.
pub(crate) fn default_output_folder(config_path: &Path) -> PathBuf {
    let case = config_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_owned());
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from("out").join(format!("compare_filters_{case}_{timestamp}"))
}

pub(crate) fn job_file_name(index: usize) -> String {
    format!("job_{index}_output.dat")
}

#[derive(Serialize)]
struct SummaryRow {
    filter: String,
    pileup_luminosity: Real,
    pileup_occupancy: Real,
    signal_pileup_ratio: Real,
    phase_module: Option<Real>,
    mean: Real,
    std: Real,
}

/// Writes the parameters, one error table per job and the summary into `folder`.
#[instrument(skip_all, fields(folder = %folder.display()), err(level = "error"))]
pub(crate) fn write_output_files(
    folder: &Path,
    config: &CompareConfig,
    results: &[JobResult],
) -> Result<(), OutputError> {
    fs::create_dir_all(folder).map_err(|source| OutputError::Io {
        path: folder.to_owned(),
        source,
    })?;

    let params_path = folder.join(PARAMS_FILE_NAME);
    let file = File::create(&params_path).map_err(|source| OutputError::Io {
        path: params_path,
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), config)?;

    for (index, result) in results.iter().enumerate() {
        write_job_output(&folder.join(job_file_name(index)), result)?;
    }
    write_summary(&folder.join(SUMMARY_FILE_NAME), results)?;
    info!("Results written to {}", folder.display());
    Ok(())
}

fn write_job_output(path: &Path, result: &JobResult) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_path(path)?;
    let header = ["index", "amplitude", "phase"]
        .into_iter()
        .map(str::to_owned)
        .chain(result.kinds.iter().map(ToString::to_string));
    writer.write_record(header)?;
    for (index, estimate) in result.estimates.iter().enumerate() {
        let record = [
            index.to_string(),
            estimate.amplitude.to_string(),
            estimate.phase.to_string(),
        ]
        .into_iter()
        .chain(estimate.errors.iter().map(ToString::to_string));
        writer.write_record(record)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn write_summary(path: &Path, results: &[JobResult]) -> Result<(), OutputError> {
    let mut writer = csv::Writer::from_path(path)?;
    for result in results {
        let parameters = &result.parameters;
        for stats in &result.statistics {
            writer.serialize(SummaryRow {
                filter: stats.kind.to_string(),
                pileup_luminosity: parameters.pileup_luminosity,
                pileup_occupancy: parameters.pileup_occupancy,
                signal_pileup_ratio: parameters.signal_pileup_ratio,
                phase_module: result.phase_module,
                mean: stats.mean,
                std: stats.std,
            })?;
        }
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}
