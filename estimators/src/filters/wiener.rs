use super::AmplitudeFilter;
use crate::{
    error::FilterError,
    linalg::{solve_vector, to_vector},
};
use nalgebra::{DMatrix, DVector};
use ndarray::{ArrayView1, ArrayView2};
use pileup_common::Real;
use pileup_simulator::{PulseGenerator, PulseOverrides};
use rand::Rng;
use tracing::{debug, instrument};

/// Linear minimum mean square error estimator trained on simulated pulses over recorded noise.
#[derive(Clone, Debug)]
pub struct Wiener {
    weights: DVector<Real>,
    window_size: usize,
    using_bias: bool,
}

impl Wiener {
    /// Trains the weights on one known pulse per row of `noise`.
    ///
    /// Pulses are drawn from `generator` with pedestal and noise disabled, the generator's
    /// amplitude law sets the training amplitudes.
    #[instrument(skip_all, fields(rows = noise.nrows(), using_bias = using_bias), err(level = "error"))]
    pub fn train<R: Rng + ?Sized>(
        noise: ArrayView2<'_, Real>,
        generator: &PulseGenerator,
        using_bias: bool,
        rng: &mut R,
    ) -> Result<Self, FilterError> {
        let (n_samples, window_size) = noise.dim();
        if n_samples == 0 {
            return Err(FilterError::EmptyTrainingSet);
        }
        let n_cols = window_size + usize::from(using_bias);

        let mut x = DMatrix::<Real>::zeros(n_samples, n_cols);
        let mut d = DVector::<Real>::zeros(n_samples);
        for (i, row) in noise.rows().into_iter().enumerate() {
            let pulse = generator.generate_pulse_with(rng, &PulseOverrides::bare());
            let digital_samples = pulse.digital_samples(rng);
            FilterError::check_size(window_size, digital_samples.len())?;
            for (j, (&baseline, signal)) in row.iter().zip(digital_samples).enumerate() {
                x[(i, j)] = baseline + signal;
            }
            if using_bias {
                x[(i, window_size)] = 1.0;
            }
            d[i] = pulse.amplitude;
        }

        let r = x.transpose() * &x / n_samples as Real;
        let p = x.transpose() * &d / n_samples as Real;
        let weights = solve_vector(r, &p)?;
        debug!("Wiener weights {:?}", weights.as_slice());
        Ok(Self {
            weights,
            window_size,
            using_bias,
        })
    }

    /// Wraps already trained weights, `window_size + 1` of them when the last is a bias.
    pub fn from_weights(weights: Vec<Real>, window_size: usize, using_bias: bool) -> Self {
        Self {
            weights: DVector::from_vec(weights),
            window_size,
            using_bias,
        }
    }

    pub fn weights(&self) -> &DVector<Real> {
        &self.weights
    }

    pub fn using_bias(&self) -> bool {
        self.using_bias
    }
}

impl AmplitudeFilter for Wiener {
    fn window_size(&self) -> usize {
        self.window_size
    }

    /// Dot product of the weights and `window`.
    ///
    /// A window of `window_size` samples ignores the bias weight. A window carrying the trailing
    /// bias sample is accepted when the filter was trained with one.
    fn apply(&self, window: ArrayView1<'_, Real>) -> Result<Real, FilterError> {
        let accepted = window.len() == self.window_size
            || (self.using_bias && window.len() == self.window_size + 1);
        if !accepted {
            return Err(FilterError::InvalidInputSize {
                expected: self.window_size,
                actual: window.len(),
            });
        }
        Ok(self.weights.rows(0, window.len()).dot(&to_vector(window)))
    }

    fn describe(&self) -> String {
        let weights = self
            .weights
            .iter()
            .map(|w| format!("{w:.5}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Wiener Filter:\n  size = {}\n  using_bias = {}\n  weights = {weights}",
            self.window_size, self.using_bias
        )
    }
}
