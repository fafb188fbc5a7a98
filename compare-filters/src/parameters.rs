//! Configuration of a filter comparison run.
use pileup_common::Real;
use pileup_estimators::{FilterError, FilterKind, FilterParameters, ReferencePulse};
use pileup_simulator::setup::{ConfigError, PulseGeneratorSetup, PulseShapeSetup};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Reference samples and derivative the analytical filters are designed against.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct ReferenceSetup {
    pub(crate) g: Vec<Real>,
    pub(crate) dg: Vec<Real>,
}

impl ReferenceSetup {
    pub(crate) fn build(&self) -> Result<ReferencePulse, FilterError> {
        ReferencePulse::new(&self.g, &self.dg)
    }
}

/// One point of the parameter sweep.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct JobParameters {
    /// Mean amplitude of the in-time signal; pile-up is scaled down from it.
    pub(crate) pileup_luminosity: Real,
    pub(crate) pileup_occupancy: Real,
    pub(crate) signal_pileup_ratio: Real,
    /// Number of windows generated, half for design and half for evaluation.
    pub(crate) n_events: usize,
    #[serde(default)]
    pub(crate) pulse_generator: PulseGeneratorSetup,
}

impl JobParameters {
    pub(crate) fn signal_luminosity(&self) -> Real {
        self.pileup_luminosity
    }

    pub(crate) fn effective_pileup_luminosity(&self) -> Real {
        self.signal_luminosity() / self.signal_pileup_ratio
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
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
            (
                "signal-pileup-ratio",
                self.signal_pileup_ratio,
                self.signal_pileup_ratio > 0.0,
            ),
            (
                "n-events",
                self.n_events as Real,
                self.n_events >= 4 && self.n_events % 2 == 0,
            ),
        ];
        match checks.into_iter().find(|(_, _, valid)| !valid) {
            Some((name, value, _)) => Err(ConfigError::InvalidValue { name, value }),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub(crate) struct CompareConfig {
    pub(crate) pulse_shape: PulseShapeSetup,
    pub(crate) sampling_rate: Real,
    pub(crate) window_size: usize,
    /// Defaults to the TileCal reference pulse.
    #[serde(default)]
    pub(crate) reference: Option<ReferenceSetup>,
    pub(crate) filters: Vec<FilterKind>,
    #[serde(default)]
    pub(crate) filter_parameters: FilterParameters,
    /// Noise windows for the BLUE covariance, the training half of each dataset otherwise.
    #[serde(default)]
    pub(crate) noise_file: Option<PathBuf>,
    pub(crate) jobs: Vec<JobParameters>,
}

impl CompareConfig {
    pub(crate) fn reference(&self) -> Result<ReferencePulse, FilterError> {
        self.reference
            .as_ref()
            .map_or_else(|| Ok(ReferencePulse::tilecal()), ReferenceSetup::build)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const CONFIG: &str = r#"{
        "pulse-shape": { "path": "pulse-shape.dat" },
        "sampling-rate": 25.0,
        "window-size": 7,
        "filters": ["BLUE", "OF2", "COF", "MAE", "SPR", "SCF", "WHF"],
        "filter-parameters": { "threshold": 4.5 },
        "jobs": [
            {
                "pileup-luminosity": 100.0,
                "pileup-occupancy": 0.1,
                "signal-pileup-ratio": 10.0,
                "n-events": 40,
                "pulse-generator": {
                    "noise": { "mean": 0.0, "sigma": 1.5 },
                    "phase": { "random-type": "uniform-int", "min": -4, "max": 4 }
                }
            },
            {
                "pileup-luminosity": 300.0,
                "pileup-occupancy": 0.0,
                "signal-pileup-ratio": 100.0,
                "n-events": 20
            }
        ]
    }"#;

    #[test]
    fn parse() {
        let config: CompareConfig = serde_json::from_str(CONFIG).unwrap();
        assert_eq!(config.filters.len(), 7);
        assert_eq!(config.filter_parameters.threshold, 4.5);
        assert_eq!(config.filter_parameters.k, 0.5);
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.jobs[1].pulse_generator.pedestal, 0.0);
        assert_eq!(config.reference().unwrap(), ReferencePulse::tilecal());
    }

    #[test]
    fn luminosities() {
        let config: CompareConfig = serde_json::from_str(CONFIG).unwrap();
        let job = &config.jobs[0];
        assert_eq!(job.signal_luminosity(), 100.0);
        assert_eq!(job.effective_pileup_luminosity(), 10.0);
    }

    #[test]
    fn odd_event_count_is_rejected() {
        let mut config: CompareConfig = serde_json::from_str(CONFIG).unwrap();
        config.jobs[0].n_events = 41;
        assert!(matches!(
            config.jobs[0].validate(),
            Err(ConfigError::InvalidValue {
                name: "n-events",
                ..
            })
        ));
    }

    #[test]
    fn unknown_filter_label() {
        let config = CONFIG.replace(r#""SPR""#, r#""XYZ""#);
        assert!(serde_json::from_str::<CompareConfig>(&config).is_err());
    }
}
