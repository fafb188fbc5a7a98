//! The tabulated reference waveform every simulated pulse is drawn from.
use pileup_common::Real;
use std::{
    fmt::Display,
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, instrument};

#[derive(Debug, Error)]
pub enum PulseShapeError {
    #[error("Pulse shape file {path} not found: {source}")]
    ResourceNotFound { path: PathBuf, source: io::Error },
    #[error("Malformed pulse shape line {line}: {content:?}")]
    Malformed { line: usize, content: String },
    #[error("Pulse shape needs at least two samples, got {0}")]
    TooFewSamples(usize),
    #[error("Pulse shape has no sample at time 0")]
    MissingTimeOrigin,
    #[error("Digital sample time {0} does not lie on the pulse shape grid")]
    DigitalSampleTimeNotOnGrid(Real),
}

/// Reference pulse shape, immutable once loaded.
///
/// The grid spacing is taken from the first two samples only; the rest of the grid is assumed
/// to share it and is not checked.
#[derive(Clone, Debug, PartialEq)]
pub struct PulseShape {
    time: Vec<Real>,
    shape: Vec<Real>,
    resolution: Real,
    origin_index: usize,
    digital_sample_times: Vec<Real>,
    digital_sample_indices: Vec<usize>,
}

impl PulseShape {
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err(level = "error"))]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, PulseShapeError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| PulseShapeError::ResourceNotFound {
            path: path.to_owned(),
            source,
        })?;
        let shape = Self::parse(&text)?;
        debug!("Loaded {} samples", shape.size());
        Ok(shape)
    }

    /// Parses a two column `time amplitude` table. Blank lines and `#` comments are skipped.
    pub fn parse(text: &str) -> Result<Self, PulseShapeError> {
        let (time, shape): (Vec<Real>, Vec<Real>) = text
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
            .map(|(index, line)| parse_line(line).ok_or_else(|| PulseShapeError::Malformed {
                line: index + 1,
                content: line.to_owned(),
            }))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .unzip();

        let [first, second, ..] = time.as_slice() else {
            return Err(PulseShapeError::TooFewSamples(time.len()));
        };
        let resolution = second - first;
        let origin_index = time
            .iter()
            .position(|&t| t == 0.0)
            .ok_or(PulseShapeError::MissingTimeOrigin)?;

        Ok(Self {
            time,
            shape,
            resolution,
            origin_index,
            digital_sample_times: Vec::new(),
            digital_sample_indices: Vec::new(),
        })
    }

    /// Maps each requested digitisation time to the grid index carrying exactly that time.
    pub fn with_digital_sample_times(mut self, times: &[Real]) -> Result<Self, PulseShapeError> {
        self.digital_sample_indices = times
            .iter()
            .map(|&requested| {
                self.time
                    .iter()
                    .position(|&t| t == requested)
                    .ok_or(PulseShapeError::DigitalSampleTimeNotOnGrid(requested))
            })
            .collect::<Result<_, _>>()?;
        self.digital_sample_times = times.to_vec();
        Ok(self)
    }

    pub fn time(&self) -> &[Real] {
        &self.time
    }

    pub fn shape(&self) -> &[Real] {
        &self.shape
    }

    pub fn size(&self) -> usize {
        self.shape.len()
    }

    pub fn resolution(&self) -> Real {
        self.resolution
    }

    pub fn origin_index(&self) -> usize {
        self.origin_index
    }

    pub fn digital_sample_times(&self) -> &[Real] {
        &self.digital_sample_times
    }

    pub fn digital_sample_indices(&self) -> &[usize] {
        &self.digital_sample_indices
    }

    /// Shape values at the configured digital sample indices.
    pub fn reference_samples(&self) -> Vec<Real> {
        self.digital_sample_indices
            .iter()
            .map(|&index| self.shape[index])
            .collect()
    }
}

/// Digitisation times of a window centred on the time origin, one every `sampling_rate`.
pub fn digital_sample_times_for_window(window_size: usize, sampling_rate: Real) -> Vec<Real> {
    let centre = (window_size / 2) as Real;
    (0..window_size)
        .map(|k| (k as Real - centre) * sampling_rate)
        .collect()
}

fn parse_line(line: &str) -> Option<(Real, Real)> {
    let mut columns = line.split_whitespace();
    let time = columns.next()?.parse().ok()?;
    let amplitude = columns.next()?.parse().ok()?;
    columns.next().is_none().then_some((time, amplitude))
}

impl Display for PulseShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PulseShape:")?;
        writeln!(f, "  size = {}", self.size())?;
        writeln!(f, "  resolution = {}", self.resolution)?;
        writeln!(f, "  origin_index = {}", self.origin_index)?;
        write!(f, "  digital_sample_times = {:?}", self.digital_sample_times)
    }
}
