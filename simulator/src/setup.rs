//! JSON setup shared by the simulator task and the filter comparison.
use crate::{
    dataset_generator::DatasetGenerator,
    distributions::{DistributionError, RandomDistribution, Sampler},
    noise::GaussianNoise,
    pulse_generator::PulseGenerator,
    pulse_shape::{PulseShape, PulseShapeError, digital_sample_times_for_window},
};
use pileup_common::Real;
use rand_distr::NormalError;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tracing::{info, instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file {path} not found: {source}")]
    ResourceNotFound { path: PathBuf, source: io::Error },
    #[error("Invalid config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Pulse shape error: {0}")]
    PulseShape(#[from] PulseShapeError),
    #[error("Distribution error: {0}")]
    Distribution(#[from] DistributionError),
    #[error("Invalid noise: {0}")]
    Noise(#[from] NormalError),
    #[error("Invalid value {value} for {name}")]
    InvalidValue { name: &'static str, value: Real },
}

/// Reads any setup type from a JSON file.
#[instrument(skip_all, fields(path = %path.as_ref().display()), err(level = "error"))]
pub fn read_json<T, P>(path: P) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| ConfigError::ResourceNotFound {
        path: path.to_owned(),
        source,
    })?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PulseShapeSetup {
    pub path: PathBuf,
    /// Defaults to a window centred on the time origin, one sample per sampling period.
    #[serde(default)]
    pub digital_sample_times: Option<Vec<Real>>,
}

impl PulseShapeSetup {
    /// Loads the shape, resolving a relative path against `base_dir`.
    pub fn build(
        &self,
        base_dir: &Path,
        window_size: usize,
        sampling_rate: Real,
    ) -> Result<PulseShape, ConfigError> {
        let times = self
            .digital_sample_times
            .clone()
            .unwrap_or_else(|| digital_sample_times_for_window(window_size, sampling_rate));
        if times.len() != window_size {
            return Err(ConfigError::InvalidValue {
                name: "digital-sample-times",
                value: times.len() as Real,
            });
        }
        let shape = PulseShape::from_path(base_dir.join(&self.path))?
            .with_digital_sample_times(&times)?;
        info!("{shape}");
        Ok(shape)
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PulseGeneratorSetup {
    #[serde(default)]
    pub deformation_level: Real,
    #[serde(default)]
    pub noise: GaussianNoise,
    #[serde(default)]
    pub pedestal: Real,
    #[serde(default)]
    pub amplitude: Option<RandomDistribution>,
    #[serde(default)]
    pub phase: Option<RandomDistribution>,
}

impl PulseGeneratorSetup {
    pub fn build(&self, shape: Arc<PulseShape>) -> Result<PulseGenerator, ConfigError> {
        if self.deformation_level.is_nan() || self.deformation_level < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "deformation-level",
                value: self.deformation_level,
            });
        }
        let mut generator = PulseGenerator::new(shape);
        generator.set_deformation_level(self.deformation_level);
        generator.set_noise(GaussianNoise::new(self.noise.mean, self.noise.sigma)?);
        generator.set_pedestal(self.pedestal);
        if let Some(amplitude) = &self.amplitude {
            generator.set_amplitude_sampler(Sampler::try_from(amplitude.clone())?);
        }
        if let Some(phase) = &self.phase {
            generator.set_phase_sampler(Sampler::try_from(phase.clone())?);
        }
        Ok(generator)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DatasetGeneratorSetup {
    pub n_events: usize,
    pub pileup_luminosity: Real,
    pub pileup_occupancy: Real,
    pub sampling_rate: Real,
    pub signal_pileup_ratio: Real,
    pub window_size: usize,
}

impl DatasetGeneratorSetup {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("n-events", self.n_events as Real, self.n_events > 0),
            (
                "pileup-luminosity",
                self.pileup_luminosity,
                self.pileup_luminosity > 0.0,
            ),
            (
                "pileup-occupancy",
                self.pileup_occupancy,
                (0.0..=1.0).contains(&self.pileup_occupancy),
            ),
            ("sampling-rate", self.sampling_rate, self.sampling_rate > 0.0),
            (
                "signal-pileup-ratio",
                self.signal_pileup_ratio,
                self.signal_pileup_ratio > 0.0,
            ),
            ("window-size", self.window_size as Real, self.window_size > 0),
        ];
        match checks.into_iter().find(|(_, _, valid)| !valid) {
            Some((name, value, _)) => Err(ConfigError::InvalidValue { name, value }),
            None => Ok(()),
        }
    }
}

/// Setup of the dataset generation task.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Setup {
    pub pulse_shape: PulseShapeSetup,
    #[serde(default)]
    pub pulse_generator: PulseGeneratorSetup,
    pub dataset_generator: DatasetGeneratorSetup,
}

impl Setup {
    /// Builds a dataset generator whose pulses follow `exponential(pileup-luminosity)`.
    pub fn build_dataset_generator(&self, base_dir: &Path) -> Result<DatasetGenerator, ConfigError> {
        let dataset = &self.dataset_generator;
        dataset.validate()?;
        let shape = self
            .pulse_shape
            .build(base_dir, dataset.window_size, dataset.sampling_rate)?;
        let mut generator = self.pulse_generator.build(Arc::new(shape))?;
        generator.set_amplitude_sampler(Sampler::exponential(dataset.pileup_luminosity)?);
        info!("{generator}");
        Ok(DatasetGenerator::new(generator))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse_shape::tests::shipped_shape_path;

    const SETUP: &str = r#"{
        "pulse-shape": { "path": "pulse-shape.dat" },
        "pulse-generator": {
            "noise": { "mean": 0.0, "sigma": 1.5 },
            "pedestal": 50.0,
            "phase": { "random-type": "uniform-int", "min": -4, "max": 4 }
        },
        "dataset-generator": {
            "n-events": 100,
            "pileup-luminosity": 100.0,
            "pileup-occupancy": 0.1,
            "sampling-rate": 25.0,
            "signal-pileup-ratio": 10.0,
            "window-size": 7
        }
    }"#;

    fn data_dir() -> PathBuf {
        shipped_shape_path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap()
    }

    #[test]
    fn parse_and_build() {
        let setup: Setup = serde_json::from_str(SETUP).unwrap();
        assert_eq!(setup.dataset_generator.window_size, 7);
        assert_eq!(setup.pulse_generator.deformation_level, 0.0);

        let datasets = setup.build_dataset_generator(&data_dir()).unwrap();
        let generator = datasets.pulse_generator();
        assert_eq!(generator.pedestal(), 50.0);
        assert_eq!(generator.noise().sigma, 1.5);
        assert_eq!(
            generator.amplitude_sampler().distribution(),
            &RandomDistribution::Exponential { scale: 100.0 }
        );
        assert_eq!(generator.phase_sampler().distribution().upper_bound(), Some(4.0));
        assert_eq!(generator.shape().digital_sample_indices().len(), 7);
    }

    #[test]
    fn missing_fields_fail() {
        let result = serde_json::from_str::<Setup>(r#"{ "pulse-shape": { "path": "x" } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn occupancy_out_of_range() {
        let mut setup: Setup = serde_json::from_str(SETUP).unwrap();
        setup.dataset_generator.pileup_occupancy = 1.5;
        assert!(matches!(
            setup.build_dataset_generator(&data_dir()),
            Err(ConfigError::InvalidValue {
                name: "pileup-occupancy",
                ..
            })
        ));
    }

    #[test]
    fn negative_noise_sigma() {
        let setup = PulseGeneratorSetup {
            noise: GaussianNoise {
                mean: 0.0,
                sigma: -1.0,
            },
            ..Default::default()
        };
        let shape = PulseShape::from_path(shipped_shape_path()).unwrap();
        assert!(matches!(
            setup.build(Arc::new(shape)),
            Err(ConfigError::Noise(_))
        ));
    }

    #[test]
    fn digital_times_must_match_window() {
        let setup = PulseShapeSetup {
            path: "pulse-shape.dat".into(),
            digital_sample_times: Some(vec![0.0, 25.0]),
        };
        assert!(matches!(
            setup.build(&data_dir(), 7, 25.0),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn missing_config_file() {
        assert!(matches!(
            read_json::<Setup, _>("does/not/exist.json"),
            Err(ConfigError::ResourceNotFound { .. })
        ));
    }
}
