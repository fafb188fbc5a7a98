use super::{AmplitudeFilter, Sparse};
use crate::{ReferencePulse, error::FilterError, linalg::{solve_vector, to_vector}};
use nalgebra::{DMatrix, DVector};
use ndarray::ArrayView1;
use pileup_common::Real;
use tracing::{debug, trace};

/// Locates the active bunches with [Sparse], then fits their amplitudes by least squares.
#[derive(Clone, Debug)]
pub struct SparseCof {
    sparse: Sparse,
    cof_threshold: Real,
}

impl SparseCof {
    pub const DEFAULT_COF_THRESHOLD: Real = 3.0;

    pub fn new(reference: &ReferencePulse, k: Real, e: Real, cof_threshold: Real) -> Self {
        Self {
            sparse: Sparse::new(reference, k, e),
            cof_threshold,
        }
    }

    pub fn sparse(&self) -> &Sparse {
        &self.sparse
    }

    /// Column of the extended pile-up matrix holding the in-time bunch.
    pub fn in_time_bunch(&self) -> usize {
        self.window_size() - 1
    }

    /// Bunches whose sparse amplitude exceeds the threshold, followed by the in-time bunch.
    pub fn active_bunches(&self, sparse_amplitudes: &DVector<Real>) -> Vec<usize> {
        let in_time = self.in_time_bunch();
        let mut active: Vec<usize> = sparse_amplitudes
            .iter()
            .enumerate()
            .filter(|&(_, &x)| x > self.cof_threshold)
            .map(|(j, _)| j)
            .collect();
        if !active.contains(&in_time) {
            active.push(in_time);
        }
        active
    }

    /// Least squares amplitudes of the `active` bunches.
    pub fn fit(&self, window: &DVector<Real>, active: &[usize]) -> Result<DVector<Real>, FilterError> {
        let h = self.sparse.extended_pileup_matrix();
        let h_s = DMatrix::from_fn(h.nrows(), active.len(), |r, j| h[(r, active[j])]);
        let normal = h_s.transpose() * &h_s;
        Ok(solve_vector(normal, &(h_s.transpose() * window))?)
    }
}

impl AmplitudeFilter for SparseCof {
    fn window_size(&self) -> usize {
        self.sparse.window_size()
    }

    /// The largest fitted amplitude, or 0 when the linear program has no optimum.
    fn apply(&self, window: ArrayView1<'_, Real>) -> Result<Real, FilterError> {
        let result = self.sparse.solve(window)?;
        if !result.is_optimal() {
            debug!("Sparse stage failed: {}", result.status);
            return Ok(0.0);
        }
        let positive = result.x.rows(0, self.sparse.n_bunches()).into_owned();
        let active = self.active_bunches(&positive);
        let amplitudes = self.fit(&to_vector(window), &active)?;
        trace!("Active bunches {active:?}, amplitudes {amplitudes:?}");
        Ok(amplitudes.max())
    }

    fn describe(&self) -> String {
        format!(
            "Sparse COF Filter:\n  cof_threshold = {}\n  in_time_bunch = {}\n{}",
            self.cof_threshold,
            self.in_time_bunch(),
            self.sparse.describe()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{filters::tests::scaled_reference, linprog::LinProgOptions};
    use assert_approx_eq::assert_approx_eq;

    fn sparse_cof() -> SparseCof {
        SparseCof::new(
            &ReferencePulse::tilecal(),
            Sparse::DEFAULT_K,
            Sparse::DEFAULT_E,
            SparseCof::DEFAULT_COF_THRESHOLD,
        )
    }

    #[test]
    fn isolated_pulse_is_recovered() {
        let filter = sparse_cof();
        for amplitude in [50.0, 400.0, 1000.0] {
            assert_approx_eq!(filter.apply(scaled_reference(amplitude).view()).unwrap(), amplitude, 1e-6);
        }
    }

    #[test]
    fn in_time_bunch_is_always_active() {
        let filter = sparse_cof();
        let mut amplitudes = DVector::zeros(13);
        amplitudes[2] = 10.0;
        amplitudes[6] = 1.0;
        assert_eq!(filter.active_bunches(&amplitudes), vec![2, 6]);
        assert_eq!(filter.active_bunches(&DVector::zeros(13)), vec![6]);
        amplitudes[6] = 10.0;
        assert_eq!(filter.active_bunches(&amplitudes), vec![2, 6]);
    }

    #[test]
    fn pileup_bunch_is_fitted() {
        let filter = sparse_cof();
        let h = filter.sparse().extended_pileup_matrix().clone();
        // In-time pulse of 100 and a pulse of 600 one bunch later.
        let window: ndarray::Array1<Real> =
            (0..7).map(|r| 100.0 * h[(r, 6)] + 600.0 * h[(r, 5)]).collect();
        let amplitudes = filter.fit(&to_vector(window.view()), &[5, 6]).unwrap();
        assert_approx_eq!(amplitudes[0], 600.0, 1e-6);
        assert_approx_eq!(amplitudes[1], 100.0, 1e-6);
    }

    #[test]
    fn failed_program_yields_zero() {
        let reference = ReferencePulse::tilecal();
        let filter = SparseCof {
            sparse: Sparse::new(&reference, 0.5, 0.12).with_options(LinProgOptions {
                max_iterations: 0,
                ..Default::default()
            }),
            cof_threshold: 3.0,
        };
        assert_eq!(filter.apply(scaled_reference(300.0).view()).unwrap(), 0.0);
    }
}
