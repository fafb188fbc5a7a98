use crate::{
    analog_pulse::AnalogPulse, distributions::Sampler, noise::GaussianNoise,
    pulse_shape::PulseShape,
};
use pileup_common::Real;
use rand::Rng;
use rand_distr::Distribution;
use std::{fmt::Display, sync::Arc};

/// Explicit values replacing the generator's defaults for a single pulse.
#[derive(Clone, Copy, Debug, Default)]
pub struct PulseOverrides {
    pub amplitude: Option<Real>,
    pub phase: Option<Real>,
    pub pedestal: Option<Real>,
    pub noise: Option<GaussianNoise>,
    pub deformation_level: Option<Real>,
}

impl PulseOverrides {
    /// Zero pedestal and silent noise, used when the surrounding trace already carries both.
    pub fn bare() -> Self {
        Self {
            pedestal: Some(0.0),
            noise: Some(GaussianNoise::SILENT),
            ..Default::default()
        }
    }
}

/// Stochastic factory of [AnalogPulse]s.
///
/// Amplitude and phase come from two independent [Sampler]s which may be swapped between
/// phases of a run. Cloning a generator yields a fully independent copy.
#[derive(Clone, Debug)]
pub struct PulseGenerator {
    shape: Arc<PulseShape>,
    amplitude_sampler: Sampler,
    phase_sampler: Sampler,
    deformation_level: Real,
    noise: GaussianNoise,
    pedestal: Real,
}

impl PulseGenerator {
    pub const DEFAULT_MAX_AMPLITUDE: i64 = 1023;

    /// Uniform integer amplitudes in `0..=1023`, no phase, noise, pedestal or deformation.
    pub fn new(shape: Arc<PulseShape>) -> Self {
        Self {
            shape,
            amplitude_sampler: default_amplitude_sampler(),
            phase_sampler: Sampler::constant(0.0),
            deformation_level: 0.0,
            noise: GaussianNoise::SILENT,
            pedestal: 0.0,
        }
    }

    pub fn shape(&self) -> &PulseShape {
        &self.shape
    }

    pub fn shared_shape(&self) -> Arc<PulseShape> {
        self.shape.clone()
    }

    pub fn amplitude_sampler(&self) -> &Sampler {
        &self.amplitude_sampler
    }

    pub fn phase_sampler(&self) -> &Sampler {
        &self.phase_sampler
    }

    pub fn deformation_level(&self) -> Real {
        self.deformation_level
    }

    pub fn noise(&self) -> GaussianNoise {
        self.noise
    }

    pub fn pedestal(&self) -> Real {
        self.pedestal
    }

    pub fn set_amplitude_sampler(&mut self, sampler: Sampler) {
        self.amplitude_sampler = sampler;
    }

    pub fn set_phase_sampler(&mut self, sampler: Sampler) {
        self.phase_sampler = sampler;
    }

    pub fn set_deformation_level(&mut self, level: Real) {
        self.deformation_level = level;
    }

    pub fn set_noise(&mut self, noise: GaussianNoise) {
        self.noise = noise;
    }

    pub fn set_pedestal(&mut self, pedestal: Real) {
        self.pedestal = pedestal;
    }

    pub fn generate_pulse<R: Rng + ?Sized>(&self, rng: &mut R) -> AnalogPulse<'_> {
        self.generate_pulse_with(rng, &PulseOverrides::default())
    }

    /// Draws an amplitude then a phase, and applies `overrides` on top.
    ///
    /// Both draws happen even when overridden, so the generator's random stream does not depend
    /// on which overrides are given.
    pub fn generate_pulse_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        overrides: &PulseOverrides,
    ) -> AnalogPulse<'_> {
        let amplitude = self.amplitude_sampler.sample(rng);
        let phase = self.phase_sampler.sample(rng);
        let mut pulse = AnalogPulse::new(&self.shape)
            .with_amplitude(overrides.amplitude.unwrap_or(amplitude))
            .with_phase(overrides.phase.unwrap_or(phase));
        pulse.pedestal = overrides.pedestal.unwrap_or(self.pedestal);
        pulse.noise = overrides.noise.unwrap_or(self.noise);
        pulse.deformation_level = overrides
            .deformation_level
            .unwrap_or(self.deformation_level);
        pulse
    }
}

fn default_amplitude_sampler() -> Sampler {
    // Bounds are constant and ordered, so construction cannot fail.
    Sampler::uniform_int(0, PulseGenerator::DEFAULT_MAX_AMPLITUDE)
        .unwrap_or_else(|_| Sampler::constant(0.0))
}

impl Display for PulseGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PulseGenerator:")?;
        writeln!(f, "  amplitude = {}", self.amplitude_sampler)?;
        writeln!(f, "  deformation_level = {}", self.deformation_level)?;
        writeln!(f, "  noise_mean = {}", self.noise.mean)?;
        writeln!(f, "  noise_sigma = {}", self.noise.sigma)?;
        writeln!(f, "  pedestal = {}", self.pedestal)?;
        write!(f, "  phase = {}", self.phase_sampler)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pulse_shape::tests::COARSE_SHAPE;
    use rand::{SeedableRng, rngs::StdRng};

    fn generator() -> PulseGenerator {
        PulseGenerator::new(Arc::new(PulseShape::parse(COARSE_SHAPE).unwrap()))
    }

    #[test]
    fn defaults() {
        let generator = generator();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            let pulse = generator.generate_pulse(&mut rng);
            assert!((0.0..=1023.0).contains(&pulse.amplitude));
            assert_eq!(pulse.amplitude.fract(), 0.0);
            assert_eq!(pulse.phase, 0.0);
            assert_eq!(pulse.pedestal, 0.0);
            assert!(pulse.noise.is_silent());
        }
    }

    #[test]
    fn overrides_take_precedence() {
        let mut generator = generator();
        generator.set_pedestal(40.0);
        generator.set_noise(GaussianNoise::new(0.0, 1.5).unwrap());
        let pulse = generator.generate_pulse_with(
            &mut StdRng::seed_from_u64(2),
            &PulseOverrides {
                pedestal: Some(20.0),
                amplitude: Some(7.0),
                ..Default::default()
            },
        );
        assert_eq!(pulse.pedestal, 20.0);
        assert_eq!(pulse.amplitude, 7.0);
        assert_eq!(pulse.noise.sigma, 1.5);

        let bare = generator.generate_pulse_with(&mut StdRng::seed_from_u64(2), &PulseOverrides::bare());
        assert_eq!(bare.pedestal, 0.0);
        assert!(bare.noise.is_silent());
    }

    #[test]
    fn overrides_do_not_change_the_draw_sequence() {
        let generator = generator();
        let mut plain = StdRng::seed_from_u64(4);
        let mut overridden = StdRng::seed_from_u64(4);
        generator.generate_pulse(&mut plain);
        generator.generate_pulse_with(
            &mut overridden,
            &PulseOverrides {
                amplitude: Some(1.0),
                ..Default::default()
            },
        );
        assert_eq!(
            generator.generate_pulse(&mut plain).amplitude,
            generator.generate_pulse(&mut overridden).amplitude
        );
    }

    #[test]
    fn swapping_samplers_does_not_leak_between_generators() {
        let original = generator();
        let mut design = original.clone();
        design.set_amplitude_sampler(Sampler::constant(5.0));
        design.set_phase_sampler(Sampler::uniform_int(-5, 5).unwrap());

        let mut rng = StdRng::seed_from_u64(8);
        assert_eq!(design.generate_pulse(&mut rng).amplitude, 5.0);
        assert_eq!(
            original.amplitude_sampler().distribution(),
            &crate::RandomDistribution::UniformInt { min: 0, max: 1023 }
        );
        assert_eq!(original.generate_pulse(&mut rng).phase, 0.0);
    }
}
