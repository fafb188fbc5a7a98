//! Long synthetic ADC traces with randomly injected pile-up, cut into fixed-size windows.
use crate::{pulse_generator::PulseGenerator, pulse_generator::PulseOverrides};
use ndarray::{Array1, Array2, ArrayView2, ShapeError, s};
use pileup_common::Real;
use rand::Rng;
use std::{
    fs::File,
    io,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Sampling rate {sampling_rate} is too small for shape resolution {resolution}")]
    InvalidSamplingRate {
        sampling_rate: Real,
        resolution: Real,
    },
    #[error("Decimated trace of length {length} cannot be split into {n_events} windows of {window_size}")]
    IndivisibleTrace {
        length: usize,
        n_events: usize,
        window_size: usize,
    },
    #[error("Occupancy {0} is not a probability")]
    InvalidOccupancy(Real),
    #[error("Dataset of {0} rows cannot be split into equal halves")]
    OddRowCount(usize),
    #[error("Dataset file {path} not found: {source}")]
    ResourceNotFound { path: PathBuf, source: io::Error },
    #[error("Malformed dataset file: {0}")]
    Csv(#[from] csv::Error),
    #[error("Malformed value {value:?} in dataset row {row}")]
    Value { row: usize, value: String },
    #[error("Dataset row {row} has {actual} values, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
    #[error("Dataset rows have inconsistent lengths")]
    Shape(#[from] ShapeError),
}

/// Windowed samples together with the amplitude injected at each sample, both `n_events × N`.
#[derive(Clone, Debug, PartialEq)]
pub struct Dataset {
    pub samples: Array2<Real>,
    pub amplitudes: Array2<Real>,
}

impl Dataset {
    pub fn n_events(&self) -> usize {
        self.samples.nrows()
    }

    pub fn window_size(&self) -> usize {
        self.samples.ncols()
    }

    /// The first and second halves of the sample rows, used as train and test sets.
    pub fn split_halves(&self) -> Result<(ArrayView2<'_, Real>, ArrayView2<'_, Real>), DatasetError> {
        let rows = self.n_events();
        if rows % 2 != 0 {
            return Err(DatasetError::OddRowCount(rows));
        }
        Ok(self.samples.view().split_at(ndarray::Axis(0), rows / 2))
    }

    /// Writes the sample matrix as space-delimited rows with five decimals.
    #[instrument(skip_all, fields(path = %path.as_ref().display()), err(level = "error"))]
    pub fn write_samples<P: AsRef<Path>>(&self, path: P) -> Result<(), DatasetError> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b' ')
            .has_headers(false)
            .from_path(path)?;
        for row in self.samples.rows() {
            writer.write_record(row.iter().map(|value| format!("{value:.5}")))?;
        }
        writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

/// Reads a space-delimited sample matrix, such as one written by [Dataset::write_samples].
#[instrument(skip_all, fields(path = %path.as_ref().display()), err(level = "error"))]
pub fn read_noise_matrix<P: AsRef<Path>>(path: P) -> Result<Array2<Real>, DatasetError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DatasetError::ResourceNotFound {
        path: path.to_owned(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_reader(file);

    let mut values = Vec::new();
    let mut n_rows = 0;
    let mut n_cols = None;
    for (row, record) in reader.records().enumerate() {
        let start = values.len();
        for field in record?.iter().filter(|field| !field.is_empty()) {
            values.push(field.parse().map_err(|_| DatasetError::Value {
                row,
                value: field.to_owned(),
            })?);
        }
        let length = values.len() - start;
        let expected = *n_cols.get_or_insert(length);
        if length != expected {
            return Err(DatasetError::RaggedRow {
                row,
                expected,
                actual: length,
            });
        }
        n_rows += 1;
    }
    let n_cols = n_cols.unwrap_or_default();
    debug!("Read {n_rows} rows of {n_cols} samples");
    Ok(Array2::from_shape_vec((n_rows, n_cols), values)?)
}

/// Builds datasets by injecting pulses from a [PulseGenerator] into gaussian baseline noise.
///
/// The generator's noise and pedestal describe the trace baseline; injected pulses carry neither.
#[derive(Clone, Debug)]
pub struct DatasetGenerator {
    pulse_generator: PulseGenerator,
}

impl DatasetGenerator {
    pub fn new(pulse_generator: PulseGenerator) -> Self {
        Self { pulse_generator }
    }

    pub fn pulse_generator(&self) -> &PulseGenerator {
        &self.pulse_generator
    }

    pub fn pulse_generator_mut(&mut self) -> &mut PulseGenerator {
        &mut self.pulse_generator
    }

    /// Number of shape grid steps between two bunch crossings.
    pub fn bunch_interval(&self, sampling_rate: Real) -> Result<usize, DatasetError> {
        let resolution = self.pulse_generator.shape().resolution();
        let interval = (sampling_rate / resolution).round();
        if interval >= 1.0 {
            Ok(interval as usize)
        } else {
            Err(DatasetError::InvalidSamplingRate {
                sampling_rate,
                resolution,
            })
        }
    }

    /// Generates a raw trace of `n_ticks` grid steps and the amplitude injected at each tick.
    #[instrument(skip(self, rng), err(level = "error"))]
    pub fn generate_samples<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n_ticks: usize,
        sampling_rate: Real,
        occupancy: Real,
    ) -> Result<(Array1<Real>, Array1<Real>), DatasetError> {
        if !(0.0..=1.0).contains(&occupancy) {
            return Err(DatasetError::InvalidOccupancy(occupancy));
        }
        let generator = &self.pulse_generator;
        let origin_index = generator.shape().origin_index() as isize;
        let bunch_interval = self.bunch_interval(sampling_rate)?;

        let mut samples = Array1::from(generator.noise().trace(rng, n_ticks)) + generator.pedestal();
        let mut amplitudes = Array1::<Real>::zeros(n_ticks);
        let mut n_pulses = 0usize;

        for tick in (0..n_ticks).step_by(bunch_interval) {
            if rng.random::<Real>() >= occupancy {
                continue;
            }
            let pulse = generator.generate_pulse_with(rng, &PulseOverrides::bare());
            amplitudes[tick] = pulse.amplitude;
            n_pulses += 1;

            for (j, (_, value)) in pulse.samples(rng).into_iter().enumerate() {
                let position = tick as isize + j as isize - origin_index;
                if let Some(sample) = usize::try_from(position)
                    .ok()
                    .and_then(|position| samples.get_mut(position))
                {
                    *sample += value;
                }
            }
        }
        debug!("Injected {n_pulses} pulses");
        Ok((samples, amplitudes))
    }

    /// Generates `n_events` windows of `window_size` samples digitised every `sampling_rate`.
    #[instrument(skip(self, rng), err(level = "error"))]
    pub fn generate_windowed_samples<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        window_size: usize,
        sampling_rate: Real,
        n_events: usize,
        occupancy: Real,
    ) -> Result<Dataset, DatasetError> {
        let resolution = self.pulse_generator.shape().resolution();
        let total_length =
            ((window_size * n_events) as Real * sampling_rate / resolution).trunc() as usize;
        let interval = self.bunch_interval(sampling_rate)?;

        let (raw_samples, raw_amplitudes) =
            self.generate_samples(rng, total_length, sampling_rate, occupancy)?;

        let decimate = |raw: Array1<Real>| -> Result<Array2<Real>, DatasetError> {
            let decimated = raw.slice(s![..;interval]).to_owned();
            let length = decimated.len();
            decimated
                .into_shape_with_order((n_events, window_size))
                .map_err(|_| DatasetError::IndivisibleTrace {
                    length,
                    n_events,
                    window_size,
                })
        };
        let dataset = Dataset {
            samples: decimate(raw_samples)?,
            amplitudes: decimate(raw_amplitudes)?,
        };
        info!(
            "Generated {} windows of {} samples from {total_length} ticks",
            dataset.n_events(),
            dataset.window_size()
        );
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        GaussianNoise, PulseShape, Sampler,
        pulse_shape::{digital_sample_times_for_window, tests::shipped_shape_path},
    };
    use assert_approx_eq::assert_approx_eq;
    use rand::{SeedableRng, rngs::StdRng};
    use std::sync::Arc;

    fn shipped_generator() -> PulseGenerator {
        let shape = PulseShape::from_path(shipped_shape_path())
            .unwrap()
            .with_digital_sample_times(&digital_sample_times_for_window(7, 25.0))
            .unwrap();
        PulseGenerator::new(Arc::new(shape))
    }

    #[test]
    fn zero_occupancy_is_baseline_plus_pedestal() {
        let mut generator = shipped_generator();
        let noise = GaussianNoise::new(0.0, 1.5).unwrap();
        generator.set_noise(noise);
        generator.set_pedestal(50.0);
        let datasets = DatasetGenerator::new(generator);

        let (samples, amplitudes) = datasets
            .generate_samples(&mut StdRng::seed_from_u64(17), 1000, 25.0, 0.0)
            .unwrap();
        let baseline = noise.trace(&mut StdRng::seed_from_u64(17), 1000);

        assert!(amplitudes.iter().all(|&a| a == 0.0));
        for (sample, noise) in samples.iter().zip(baseline) {
            assert_eq!(*sample, noise + 50.0);
        }
    }

    #[test]
    fn full_occupancy_injects_at_every_bunch() {
        let mut generator = shipped_generator();
        generator.set_amplitude_sampler(Sampler::constant(100.0));
        let datasets = DatasetGenerator::new(generator);

        let (samples, amplitudes) = datasets
            .generate_samples(&mut StdRng::seed_from_u64(3), 500, 25.0, 1.0)
            .unwrap();
        for (tick, &amplitude) in amplitudes.iter().enumerate() {
            let expected = if tick % 50 == 0 { 100.0 } else { 0.0 };
            assert_eq!(amplitude, expected);
        }
        // Tick 250 sees its own peak plus the tails of every other bunch.
        let shape = datasets.pulse_generator().shape().shape();
        let expected_peak: Real = (0..500)
            .step_by(50)
            .filter_map(|tick: usize| shape.get(250 + 250 - tick))
            .map(|value| 100.0 * value)
            .sum();
        assert_approx_eq!(samples[250], expected_peak, 1e-9);
        assert!(expected_peak > 100.0 * (1.0 + 0.4524 + 0.5633));
    }

    #[test]
    fn contributions_outside_the_trace_are_dropped() {
        let mut generator = shipped_generator();
        generator.set_amplitude_sampler(Sampler::constant(10.0));
        let datasets = DatasetGenerator::new(generator);
        // A pulse at tick 0 would extend 250 ticks before the trace start.
        let (samples, _) = datasets
            .generate_samples(&mut StdRng::seed_from_u64(0), 40, 1000.0, 1.0)
            .unwrap();
        assert_eq!(samples.len(), 40);
        assert_eq!(samples[0], 10.0);
    }

    #[test]
    fn windowed_dataset_without_pileup() {
        let mut generator = shipped_generator();
        generator.set_noise(GaussianNoise::new(0.0, 1.5).unwrap());
        let datasets = DatasetGenerator::new(generator);
        let dataset = datasets
            .generate_windowed_samples(&mut StdRng::seed_from_u64(1234), 7, 25.0, 100, 0.0)
            .unwrap();
        assert_eq!(dataset.samples.dim(), (100, 7));
        assert_eq!(dataset.amplitudes.dim(), (100, 7));
        assert!(dataset.amplitudes.iter().all(|&a| a == 0.0));

        let (train, test) = dataset.split_halves().unwrap();
        assert_eq!(train.dim(), (50, 7));
        assert_eq!(test.dim(), (50, 7));
    }

    #[test]
    fn windowed_amplitudes_sit_on_decimated_ticks() {
        let mut generator = shipped_generator();
        generator.set_amplitude_sampler(Sampler::constant(1.0));
        let dataset = DatasetGenerator::new(generator)
            .generate_windowed_samples(&mut StdRng::seed_from_u64(2), 7, 25.0, 10, 1.0)
            .unwrap();
        assert!(dataset.amplitudes.iter().all(|&a| a == 1.0));
    }

    #[test]
    fn sampling_rate_below_resolution() {
        let datasets = DatasetGenerator::new(shipped_generator());
        let result = datasets.generate_samples(&mut StdRng::seed_from_u64(0), 10, 0.1, 0.5);
        assert!(matches!(result, Err(DatasetError::InvalidSamplingRate { .. })));
    }

    #[test]
    fn occupancy_must_be_a_probability() {
        let datasets = DatasetGenerator::new(shipped_generator());
        for occupancy in [Real::NAN, -0.1, 1.5] {
            let result = datasets.generate_samples(&mut StdRng::seed_from_u64(0), 100, 25.0, occupancy);
            assert!(matches!(result, Err(DatasetError::InvalidOccupancy(_))), "{occupancy}");
        }
    }

    #[test]
    fn odd_datasets_do_not_split() {
        let dataset = Dataset {
            samples: Array2::zeros((3, 7)),
            amplitudes: Array2::zeros((3, 7)),
        };
        assert!(matches!(dataset.split_halves(), Err(DatasetError::OddRowCount(3))));
    }

    #[test]
    fn noise_matrix_round_trip() {
        let path = std::env::temp_dir().join(format!("pileup-noise-{}.csv", std::process::id()));
        let dataset = Dataset {
            samples: ndarray::array![[1.0, -2.5, 3.25], [0.0, 4.125, -1.0]],
            amplitudes: Array2::zeros((2, 3)),
        };
        dataset.write_samples(&path).unwrap();
        let read = read_noise_matrix(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(read, dataset.samples);
    }

    #[test]
    fn rows_of_different_lengths_are_rejected() {
        let path = std::env::temp_dir().join(format!("pileup-ragged-{}.csv", std::process::id()));
        std::fs::write(&path, "1 2 3 4 5 6\n1 2 3 4 5 6 7 8\n").unwrap();
        let result = read_noise_matrix(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(
            result,
            Err(DatasetError::RaggedRow {
                row: 1,
                expected: 6,
                actual: 8
            })
        ));
    }

    #[test]
    fn missing_noise_matrix() {
        assert!(matches!(
            read_noise_matrix("does/not/exist.csv"),
            Err(DatasetError::ResourceNotFound { .. })
        ));
    }
}
