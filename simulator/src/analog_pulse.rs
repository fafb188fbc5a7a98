//! A single continuous-time pulse drawn from a [PulseShape].
use crate::{
    noise::{GaussianNoise, gaussian},
    pulse_shape::PulseShape,
};
use pileup_common::Real;
use rand::Rng;
use std::fmt::Display;

/// A pulse instance: the reference shape scaled by `amplitude`, shifted by `phase`, lifted by
/// `pedestal` and perturbed by noise and shape deformation.
///
/// Samples are drawn on demand, each call consuming fresh randomness from the supplied generator.
#[derive(Clone, Debug)]
pub struct AnalogPulse<'a> {
    shape: &'a PulseShape,
    pub amplitude: Real,
    pub phase: Real,
    pub pedestal: Real,
    pub noise: GaussianNoise,
    pub deformation_level: Real,
}

impl<'a> AnalogPulse<'a> {
    /// A noiseless, undeformed pulse of unit amplitude, in time.
    pub fn new(shape: &'a PulseShape) -> Self {
        Self {
            shape,
            amplitude: 1.0,
            phase: 0.0,
            pedestal: 0.0,
            noise: GaussianNoise::SILENT,
            deformation_level: 0.0,
        }
    }

    pub fn with_amplitude(self, amplitude: Real) -> Self {
        Self { amplitude, ..self }
    }

    pub fn with_phase(self, phase: Real) -> Self {
        Self { phase, ..self }
    }

    pub fn shape(&self) -> &'a PulseShape {
        self.shape
    }

    /// The value of the pulse at shape index `index`.
    ///
    /// # Panics
    /// If `index` is not below the shape size.
    pub fn sample<R: Rng + ?Sized>(&self, index: usize, rng: &mut R) -> Real {
        let shape_sample = self.shape.shape()[index];
        let deformation = self.random_deformation(shape_sample, rng);
        let noise = self.noise.sample(rng);
        self.amplitude * (shape_sample + deformation) + self.pedestal + noise
    }

    /// Phase expressed in grid steps, truncated toward zero.
    pub fn phase_index_offset(&self) -> isize {
        (self.phase / self.shape.resolution()).trunc() as isize
    }

    /// Shape index read at `time_index` once the phase is applied, if it lies on the shape.
    pub fn shifted_index(&self, time_index: usize) -> Option<usize> {
        let shifted = time_index as isize - self.phase_index_offset();
        usize::try_from(shifted)
            .ok()
            .filter(|&index| index < self.shape.size())
    }

    /// The `(time, value)` pair at `time_index`, or `None` when the phase shifts it off the shape.
    pub fn sample_at<R: Rng + ?Sized>(&self, time_index: usize, rng: &mut R) -> Option<(Real, Real)> {
        let time = *self.shape.time().get(time_index)?;
        let index = self.shifted_index(time_index)?;
        Some((time, self.sample(index, rng)))
    }

    /// Every `(time, value)` pair of the pulse, in time order, skipping those shifted off the shape.
    pub fn samples<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<(Real, Real)> {
        (0..self.shape.size())
            .filter_map(|time_index| self.sample_at(time_index, rng))
            .collect()
    }

    /// The pulse read out at the shape's digital sample indices.
    ///
    /// Where the phase pushes a digital index off the shape, only pedestal and noise remain.
    pub fn digital_samples<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Real> {
        self.shape
            .digital_sample_indices()
            .iter()
            .map(|&time_index| match self.shifted_index(time_index) {
                Some(index) => self.sample(index, rng),
                None => self.pedestal + self.noise.sample(rng),
            })
            .collect()
    }

    fn random_deformation<R: Rng + ?Sized>(&self, shape_sample: Real, rng: &mut R) -> Real {
        if self.deformation_level == 0.0 {
            return Default::default();
        }
        gaussian(rng, 0.0, self.deformation_level * shape_sample.abs())
    }
}

impl Display for AnalogPulse<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "AnalogPulse:")?;
        writeln!(f, "  amplitude = {}", self.amplitude)?;
        writeln!(f, "  deformation_level = {}", self.deformation_level)?;
        writeln!(f, "  noise_mean = {}", self.noise.mean)?;
        writeln!(f, "  noise_sigma = {}", self.noise.sigma)?;
        writeln!(f, "  pedestal = {}", self.pedestal)?;
        writeln!(f, "  phase = {}", self.phase)?;
        writeln!(f, "  resolution = {}", self.shape.resolution())?;
        write!(f, "  size = {}", self.shape.size())
    }
}
