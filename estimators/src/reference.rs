//! Digital reference pulse and the pile-up matrices derived from it.
use crate::error::FilterError;
use nalgebra::{DMatrix, DVector};
use pileup_common::Real;
use std::fmt::Display;

/// Reference samples `g` of a unit pulse peaking at the window centre, and their time derivative
/// `dg`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReferencePulse {
    g: DVector<Real>,
    dg: DVector<Real>,
}

impl ReferencePulse {
    pub const TILECAL_G: [Real; 7] = [0.0000, 0.0172, 0.4524, 1.0000, 0.5633, 0.1493, 0.0424];
    pub const TILECAL_DG: [Real; 7] = [
        0.00004019,
        0.00333578,
        0.03108120,
        0.00000000,
        -0.02434490,
        -0.00800683,
        -0.00243344,
    ];

    pub fn new(g: &[Real], dg: &[Real]) -> Result<Self, FilterError> {
        if g.len() != dg.len() || g.is_empty() {
            return Err(FilterError::ReferenceMismatch {
                g: g.len(),
                dg: dg.len(),
            });
        }
        Ok(Self {
            g: DVector::from_column_slice(g),
            dg: DVector::from_column_slice(dg),
        })
    }

    /// The ATLAS TileCal reference pulse at 25 ns sampling.
    pub fn tilecal() -> Self {
        Self {
            g: DVector::from_column_slice(&Self::TILECAL_G),
            dg: DVector::from_column_slice(&Self::TILECAL_DG),
        }
    }

    pub fn window_size(&self) -> usize {
        self.g.len()
    }

    /// Position of the amplitude read-out sample.
    pub fn in_time_index(&self) -> usize {
        self.window_size() / 2
    }

    pub fn g(&self) -> &DVector<Real> {
        &self.g
    }

    pub fn dg(&self) -> &DVector<Real> {
        &self.dg
    }

    fn g_at(&self, index: isize) -> Real {
        usize::try_from(index)
            .ok()
            .and_then(|index| self.g.get(index))
            .copied()
            .unwrap_or_default()
    }

    /// `N×N` matrix whose row `r` is the reference pulse peaking at sample `r`.
    pub fn pileup_matrix(&self) -> DMatrix<Real> {
        let n = self.window_size();
        let centre = self.in_time_index() as isize;
        DMatrix::from_fn(n, n, |r, c| self.g_at(c as isize - r as isize + centre))
    }

    /// `N×(2N−1)` matrix whose column `c` is the window seen from a pulse in bunch `c`.
    ///
    /// Column `N−1` is the in-time bunch; earlier columns are later bunches.
    pub fn extended_pileup_matrix(&self) -> DMatrix<Real> {
        let n = self.window_size();
        DMatrix::from_fn(n, 2 * n - 1, |r, c| {
            self.g_at(c as isize + r as isize - (n as isize - 1))
        })
    }
}

impl Default for ReferencePulse {
    fn default() -> Self {
        Self::tilecal()
    }
}

impl Display for ReferencePulse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g = {:?}, dg = {:?}", self.g.as_slice(), self.dg.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pileup_matrix_rows_are_shifted_pulses() {
        let reference = ReferencePulse::tilecal();
        let h = reference.pileup_matrix();
        assert_eq!(h.shape(), (7, 7));
        assert_eq!(
            h.row(0).iter().copied().collect::<Vec<_>>(),
            vec![1.0, 0.5633, 0.1493, 0.0424, 0.0, 0.0, 0.0]
        );
        assert_eq!(
            h.row(3).iter().copied().collect::<Vec<_>>(),
            ReferencePulse::TILECAL_G.to_vec()
        );
        assert_eq!(h[(6, 4)], 0.0172);
    }

    #[test]
    fn extended_matrix_in_time_column_is_the_pulse() {
        let h = ReferencePulse::tilecal().extended_pileup_matrix();
        assert_eq!(h.shape(), (7, 13));
        assert_eq!(
            h.column(6).iter().copied().collect::<Vec<_>>(),
            ReferencePulse::TILECAL_G.to_vec()
        );
        assert_eq!(
            h.row(0).iter().copied().collect::<Vec<_>>(),
            vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0172, 0.4524, 1.0, 0.5633, 0.1493, 0.0424]
        );
        assert!(h.column(0).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn mismatched_lengths() {
        assert!(matches!(
            ReferencePulse::new(&[0.0, 1.0, 0.0], &[0.0, 0.0]),
            Err(FilterError::ReferenceMismatch { g: 3, dg: 2 })
        ));
    }
}
