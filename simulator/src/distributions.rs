//! Random laws used to draw pulse amplitudes and phases.
//!
//! [RandomDistribution] is the configuration form, read from JSON. It is validated once into a
//! [Sampler], which is the strategy injected into a [PulseGenerator](crate::PulseGenerator).
use pileup_common::Real;
use rand::{
    Rng,
    distr::{Uniform, uniform},
};
use rand_distr::{Distribution, Exp, Normal};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DistributionError {
    #[error("Invalid Uniform Distribution: {0}")]
    Uniform(#[from] uniform::Error),
    #[error("Invalid Normal Distribution: {0}")]
    Normal(#[from] rand_distr::NormalError),
    #[error("Invalid Exponential Distribution: {0}")]
    Exp(#[from] rand_distr::ExpError),
    #[error("Exponential scale must be positive, got {0}")]
    NonPositiveScale(Real),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", tag = "random-type")]
pub enum RandomDistribution {
    Constant {
        value: Real,
    },
    /// Integer-valued draws in `min..=max`.
    UniformInt {
        min: i64,
        max: i64,
    },
    UniformFloat {
        min: Real,
        max: Real,
    },
    Normal {
        mean: Real,
        sd: Real,
    },
    /// Parameterised by the mean of the law, not its rate.
    Exponential {
        scale: Real,
    },
}

impl RandomDistribution {
    /// Upper end of the law's support, for the laws that have one.
    pub fn upper_bound(&self) -> Option<Real> {
        match self {
            Self::Constant { value } => Some(*value),
            Self::UniformInt { max, .. } => Some(*max as Real),
            Self::UniformFloat { max, .. } => Some(*max),
            Self::Normal { .. } | Self::Exponential { .. } => None,
        }
    }
}

impl Display for RandomDistribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constant { value } => write!(f, "constant({value})"),
            Self::UniformInt { min, max } => write!(f, "uniform-int({min}, {max})"),
            Self::UniformFloat { min, max } => write!(f, "uniform-float({min}, {max})"),
            Self::Normal { mean, sd } => write!(f, "normal({mean}, {sd})"),
            Self::Exponential { scale } => write!(f, "exponential({scale})"),
        }
    }
}

/// A validated draw strategy.
///
/// Each call to [Distribution::sample] consumes randomness only from the supplied generator,
/// so two generators seeded alike yield identical draws.
#[derive(Debug, Clone)]
pub struct Sampler {
    source: RandomDistribution,
    law: Law,
}

#[derive(Debug, Clone)]
enum Law {
    Constant(Real),
    UniformInt(Uniform<i64>),
    UniformFloat(Uniform<Real>),
    Normal(Normal<Real>),
    Exponential(Exp<Real>),
}

impl Sampler {
    pub fn constant(value: Real) -> Self {
        Self {
            source: RandomDistribution::Constant { value },
            law: Law::Constant(value),
        }
    }

    pub fn uniform_int(min: i64, max: i64) -> Result<Self, DistributionError> {
        Self::try_from(RandomDistribution::UniformInt { min, max })
    }

    pub fn exponential(scale: Real) -> Result<Self, DistributionError> {
        Self::try_from(RandomDistribution::Exponential { scale })
    }

    /// The configuration this sampler was built from.
    pub fn distribution(&self) -> &RandomDistribution {
        &self.source
    }
}

impl TryFrom<RandomDistribution> for Sampler {
    type Error = DistributionError;

    fn try_from(source: RandomDistribution) -> Result<Self, Self::Error> {
        let law = match source.clone() {
            RandomDistribution::Constant { value } => Law::Constant(value),
            RandomDistribution::UniformInt { min, max } => {
                Law::UniformInt(Uniform::new_inclusive(min, max)?)
            }
            RandomDistribution::UniformFloat { min, max } => Law::UniformFloat(Uniform::new(min, max)?),
            RandomDistribution::Normal { mean, sd } => Law::Normal(Normal::new(mean, sd)?),
            RandomDistribution::Exponential { scale } => {
                if scale <= 0.0 || !scale.is_finite() {
                    return Err(DistributionError::NonPositiveScale(scale));
                }
                Law::Exponential(Exp::new(scale.recip())?)
            }
        };
        Ok(Self { source, law })
    }
}

impl Distribution<Real> for Sampler {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Real {
        match &self.law {
            Law::Constant(value) => *value,
            Law::UniformInt(uniform) => uniform.sample(rng) as Real,
            Law::UniformFloat(uniform) => uniform.sample(rng),
            Law::Normal(normal) => normal.sample(rng),
            Law::Exponential(exp) => exp.sample(rng),
        }
    }
}

impl Display for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.source.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn parse_tagged_json() {
        let amplitude: RandomDistribution =
            serde_json::from_str(r#"{ "random-type": "uniform-int", "min": 0, "max": 1023 }"#)
                .unwrap();
        assert_eq!(amplitude, RandomDistribution::UniformInt { min: 0, max: 1023 });

        let phase: RandomDistribution =
            serde_json::from_str(r#"{ "random-type": "exponential", "scale": 30.0 }"#).unwrap();
        assert_eq!(phase, RandomDistribution::Exponential { scale: 30.0 });
    }

    #[test]
    fn uniform_int_draws_are_integral_and_inclusive() {
        let sampler = Sampler::uniform_int(-2, 2).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let draws = (0..500).map(|_| sampler.sample(&mut rng)).collect::<Vec<_>>();
        assert!(draws.iter().all(|d| d.fract() == 0.0 && (-2.0..=2.0).contains(d)));
        assert!(draws.contains(&-2.0));
        assert!(draws.contains(&2.0));
    }

    #[test]
    fn seeded_draws_are_reproducible() {
        let sampler = Sampler::exponential(100.0).unwrap();
        let first = (&sampler)
            .sample_iter(StdRng::seed_from_u64(42))
            .take(10)
            .collect::<Vec<_>>();
        let second = (&sampler)
            .sample_iter(StdRng::seed_from_u64(42))
            .take(10)
            .collect::<Vec<_>>();
        assert_eq!(first, second);
        assert!(first.iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(Sampler::exponential(0.0).is_err());
        assert!(Sampler::uniform_int(5, 1).is_err());
        assert!(Sampler::try_from(RandomDistribution::Normal { mean: 0.0, sd: -1.0 }).is_err());
    }

    #[test]
    fn constant_ignores_generator() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(Sampler::constant(3.5).sample(&mut rng), 3.5);
    }
}
