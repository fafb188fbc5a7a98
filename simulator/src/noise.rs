use pileup_common::Real;
use rand::Rng;
use rand_distr::{Distribution, Normal, NormalError, StandardNormal};
use serde::{Deserialize, Serialize};

/// Additive gaussian noise.
///
/// A noise whose mean and sigma are both zero is silent: it neither perturbs samples nor consumes
/// randomness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct GaussianNoise {
    pub mean: Real,
    pub sigma: Real,
}

impl GaussianNoise {
    pub const SILENT: Self = Self {
        mean: 0.0,
        sigma: 0.0,
    };

    pub fn new(mean: Real, sigma: Real) -> Result<Self, NormalError> {
        Normal::new(mean, sigma)?;
        Ok(Self { mean, sigma })
    }

    pub fn is_silent(&self) -> bool {
        self.mean == 0.0 && self.sigma == 0.0
    }

    pub(crate) fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Real {
        if self.is_silent() {
            Default::default()
        } else {
            gaussian(rng, self.mean, self.sigma)
        }
    }

    /// Draws `length` consecutive noise values, including for a silent noise.
    pub(crate) fn trace<R: Rng + ?Sized>(&self, rng: &mut R, length: usize) -> Vec<Real> {
        (0..length)
            .map(|_| gaussian(rng, self.mean, self.sigma))
            .collect()
    }
}

/// Normal(mean, sigma) for any non-negative sigma, including zero.
pub(crate) fn gaussian<R: Rng + ?Sized>(rng: &mut R, mean: Real, sigma: Real) -> Real {
    let z: Real = StandardNormal.sample(rng);
    mean + sigma * z
}
