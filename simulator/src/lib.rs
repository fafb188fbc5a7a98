//! Stochastic model of detector pulses corrupted by pile-up and noise.
//!
//! A [PulseShape] is loaded once and shared. A [PulseGenerator] draws [AnalogPulse]s from it, and
//! a [DatasetGenerator] injects those pulses into long noisy traces to build windowed [Dataset]s.
mod analog_pulse;
mod dataset_generator;
mod dataset_task;
mod distributions;
mod noise;
mod pulse_generator;
mod pulse_shape;
pub mod setup;

pub use analog_pulse::AnalogPulse;
pub use dataset_generator::{Dataset, DatasetError, DatasetGenerator, read_noise_matrix};
pub use dataset_task::{
    DATASET_FILE_NAME, DatasetTaskError, DatasetTaskOutcome, generate_dataset_task,
};
pub use distributions::{DistributionError, RandomDistribution, Sampler};
pub use noise::GaussianNoise;
pub use pulse_generator::{PulseGenerator, PulseOverrides};
pub use pulse_shape::{PulseShape, PulseShapeError, digital_sample_times_for_window};
