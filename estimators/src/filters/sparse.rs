use super::AmplitudeFilter;
use crate::{
    ReferencePulse,
    error::FilterError,
    linalg::to_vector,
    linprog::{LinProgOptions, LinProgResult, linprog},
};
use nalgebra::{DMatrix, DVector};
use ndarray::ArrayView1;
use pileup_common::Real;
use tracing::debug;

/// Sparse representation of a window over every bunch that can reach it.
///
/// Solves the linear program
/// `min Σx⁺ + k Σx⁻` subject to `|HᵀH (x⁺ − x⁻) − Hᵀp| ≤ e`, `x⁺, x⁻ ≥ 0`,
/// where `H` is the extended pile-up matrix and `p` the window.
#[derive(Clone, Debug)]
pub struct Sparse {
    h: DMatrix<Real>,
    a_ub: DMatrix<Real>,
    cost: DVector<Real>,
    k: Real,
    e: Real,
    options: LinProgOptions,
}

impl Sparse {
    pub const DEFAULT_K: Real = 0.5;
    pub const DEFAULT_E: Real = 0.12;

    pub fn new(reference: &ReferencePulse, k: Real, e: Real) -> Self {
        let h = reference.extended_pileup_matrix();
        let n_bunches = h.ncols();
        let hth = h.transpose() * &h;

        let mut a_ub = DMatrix::zeros(2 * n_bunches, 2 * n_bunches);
        a_ub.view_mut((0, 0), (n_bunches, n_bunches)).copy_from(&hth);
        a_ub.view_mut((0, n_bunches), (n_bunches, n_bunches)).copy_from(&(-&hth));
        a_ub.view_mut((n_bunches, 0), (n_bunches, n_bunches)).copy_from(&(-&hth));
        a_ub.view_mut((n_bunches, n_bunches), (n_bunches, n_bunches)).copy_from(&hth);

        let cost = DVector::from_fn(2 * n_bunches, |i, _| if i < n_bunches { 1.0 } else { k });
        Self {
            h,
            a_ub,
            cost,
            k,
            e,
            options: LinProgOptions::default(),
        }
    }

    pub fn with_options(self, options: LinProgOptions) -> Self {
        Self { options, ..self }
    }

    /// Number of bunches represented, the extended pile-up matrix's width.
    pub fn n_bunches(&self) -> usize {
        self.h.ncols()
    }

    pub fn extended_pileup_matrix(&self) -> &DMatrix<Real> {
        &self.h
    }

    /// Raw solution of the linear program for `window`, `x = [x⁺, x⁻]`.
    pub fn solve(&self, window: ArrayView1<'_, Real>) -> Result<LinProgResult, FilterError> {
        FilterError::check_size(self.window_size(), window.len())?;
        let htp = self.h.transpose() * to_vector(window);
        let n_bunches = self.n_bunches();
        let b_ub = DVector::from_fn(2 * n_bunches, |i, _| {
            if i < n_bunches {
                htp[i] + self.e
            } else {
                -htp[i - n_bunches] + self.e
            }
        });
        let result = linprog(&self.cost, &self.a_ub, &b_ub, &self.options);
        debug!(status = %result.status, nit = result.nit, fun = result.fun);
        Ok(result)
    }
}

impl AmplitudeFilter for Sparse {
    fn window_size(&self) -> usize {
        self.h.nrows()
    }

    /// The optimal objective value, which is not tied to any single bunch.
    fn apply(&self, window: ArrayView1<'_, Real>) -> Result<Real, FilterError> {
        let result = self.solve(window)?;
        if result.is_optimal() {
            Ok(result.fun)
        } else {
            Err(FilterError::LinearProgram(result.status))
        }
    }

    fn describe(&self) -> String {
        format!(
            "Sparse Filter:\n  k = {}\n  e = {}\n  bunches = {}\n  size = {}",
            self.k,
            self.e,
            self.n_bunches(),
            self.window_size()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::tests::scaled_reference;
    use ndarray::Array1;

    fn sparse() -> Sparse {
        Sparse::new(&ReferencePulse::tilecal(), Sparse::DEFAULT_K, Sparse::DEFAULT_E)
    }

    #[test]
    fn program_dimensions() {
        let sparse = sparse();
        assert_eq!(sparse.n_bunches(), 13);
        let result = sparse.solve(scaled_reference(10.0).view()).unwrap();
        assert_eq!(result.x.len(), 26);
    }

    #[test]
    fn isolated_pulse_is_sparse() {
        let sparse = sparse();
        let result = sparse.solve(scaled_reference(300.0).view()).unwrap();
        assert!(result.is_optimal());
        // Only the in-time bunch carries a significant positive amplitude.
        let (largest, &value) = result
            .x
            .iter()
            .take(13)
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .unwrap();
        assert_eq!(largest, 6);
        assert!((value - 300.0).abs() < 1.0);
        assert!(sparse.apply(scaled_reference(300.0).view()).unwrap() <= 300.0);
    }

    #[test]
    fn objective_is_non_negative() {
        let sparse = sparse();
        let windows = [
            Array1::zeros(7),
            scaled_reference(1.0),
            scaled_reference(1000.0),
            Array1::from(vec![3.0, -2.0, 5.0, 40.0, 20.0, 2.0, -1.0]),
        ];
        for window in windows {
            let fun = sparse.apply(window.view()).unwrap();
            assert!(fun >= 0.0, "{fun}");
        }
    }
}
