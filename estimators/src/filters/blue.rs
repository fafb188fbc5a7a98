use super::AmplitudeFilter;
use crate::{
    ReferencePulse,
    error::FilterError,
    linalg::{covariance, solve_vector, to_vector},
};
use nalgebra::{DMatrix, DVector};
use ndarray::{ArrayView1, ArrayView2};
use pileup_common::Real;
use tracing::{debug, instrument};

/// Best linear unbiased estimator.
///
/// Minimises the noise variance of `w · window` under unit gain to the reference pulse and zero
/// gain to its derivative. The weights are fixed at construction.
#[derive(Clone, Debug)]
pub struct Blue {
    weights: DVector<Real>,
}

impl Blue {
    /// Designs the weights against the covariance of `noise` (rows are windows), or against white
    /// noise when none is given.
    #[instrument(skip_all, err(level = "error"))]
    pub fn new(reference: &ReferencePulse, noise: Option<ArrayView2<'_, Real>>) -> Result<Self, FilterError> {
        let n = reference.window_size();
        let c = match noise {
            Some(noise) => {
                FilterError::check_size(n, noise.ncols())?;
                covariance(noise)?
            }
            None => DMatrix::identity(n, n),
        };

        let (g, dg) = (reference.g(), reference.dg());
        let mut a = DMatrix::zeros(n + 2, n + 2);
        a.view_mut((0, 0), (n, n)).copy_from(&c);
        for i in 0..n {
            a[(n, i)] = g[i];
            a[(i, n)] = -g[i];
            a[(n + 1, i)] = dg[i];
            a[(i, n + 1)] = -dg[i];
        }
        let mut b = DVector::zeros(n + 2);
        b[n] = 1.0;

        let solution = solve_vector(a, &b)?;
        let weights = solution.rows(0, n).into_owned();
        debug!("Blue weights {:?}", weights.as_slice());
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &DVector<Real> {
        &self.weights
    }
}

impl AmplitudeFilter for Blue {
    fn window_size(&self) -> usize {
        self.weights.len()
    }

    fn apply(&self, window: ArrayView1<'_, Real>) -> Result<Real, FilterError> {
        FilterError::check_size(self.window_size(), window.len())?;
        Ok(self.weights.dot(&to_vector(window)))
    }

    fn describe(&self) -> String {
        let weights = self
            .weights
            .iter()
            .map(|w| format!("{w:.5}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!("Blue Filter:\n  size = {}\n  weights = {weights}", self.window_size())
    }
}
