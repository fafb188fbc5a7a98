use crate::{
    ReferencePulse,
    error::FilterError,
    linalg::{inverse, solve_matrix},
};
use nalgebra::{DMatrix, DVector};
use pileup_common::Real;

/// Picks the bunches of a window that carry significant pile-up.
///
/// A window is deconvolved through the inverse pile-up matrix; the in-time bunch is always kept
/// and any other bunch is kept when its deviation exceeds the threshold. Without a threshold only
/// the in-time bunch is kept.
#[derive(Clone, Debug)]
pub struct PileupSelector {
    h: DMatrix<Real>,
    h_inv_t: DMatrix<Real>,
    centre: usize,
    threshold: Option<Real>,
}

impl PileupSelector {
    pub fn new(reference: &ReferencePulse, threshold: Option<Real>) -> Result<Self, FilterError> {
        let h = reference.pileup_matrix();
        let h_inv_t = inverse(h.clone())?.transpose();
        Ok(Self {
            h,
            h_inv_t,
            centre: reference.in_time_index(),
            threshold,
        })
    }

    pub fn window_size(&self) -> usize {
        self.h.nrows()
    }

    pub fn centre(&self) -> usize {
        self.centre
    }

    pub fn threshold(&self) -> Option<Real> {
        self.threshold
    }

    pub fn pileup_matrix(&self) -> &DMatrix<Real> {
        &self.h
    }

    /// Raw per-bunch amplitudes `windowᵀ H⁻¹`.
    pub fn deviations(&self, window: &DVector<Real>) -> DVector<Real> {
        &self.h_inv_t * window
    }

    /// Indices of the selected bunches, in increasing order.
    pub fn select(&self, window: &DVector<Real>) -> Vec<usize> {
        let deviations = self.deviations(window);
        deviations
            .iter()
            .enumerate()
            .filter(|&(i, &dm)| {
                i == self.centre || self.threshold.is_some_and(|threshold| dm > threshold)
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Least squares amplitudes `(D Dᵀ)⁻¹ D window` for the rows of `d`.
    pub fn project(d: &DMatrix<Real>, window: &DVector<Real>) -> Result<DVector<Real>, FilterError> {
        let weights = solve_matrix(d * d.transpose(), d)?;
        Ok(weights * window)
    }
}
