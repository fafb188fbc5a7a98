//! Dense solves over [nalgebra] matrices, failing on singular or non-finite systems.
use crate::error::LinearAlgebraError;
use nalgebra::{DMatrix, DVector};
use ndarray::{ArrayView1, ArrayView2};
use pileup_common::Real;

pub(crate) fn to_vector(window: ArrayView1<'_, Real>) -> DVector<Real> {
    DVector::from_iterator(window.len(), window.iter().copied())
}

fn check_finite<'a>(
    values: impl IntoIterator<Item = &'a Real>,
    n: usize,
) -> Result<(), LinearAlgebraError> {
    if values.into_iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(LinearAlgebraError::NonFinite(n))
    }
}

/// Solves `a x = b` for a square `a`.
pub fn solve_vector(a: DMatrix<Real>, b: &DVector<Real>) -> Result<DVector<Real>, LinearAlgebraError> {
    let n = a.nrows();
    let x = a.lu().solve(b).ok_or(LinearAlgebraError::Singular(n))?;
    check_finite(x.iter(), n)?;
    Ok(x)
}

/// Solves `a X = b` for a square `a` and every column of `b`.
pub fn solve_matrix(a: DMatrix<Real>, b: &DMatrix<Real>) -> Result<DMatrix<Real>, LinearAlgebraError> {
    let n = a.nrows();
    let x = a.lu().solve(b).ok_or(LinearAlgebraError::Singular(n))?;
    check_finite(x.iter(), n)?;
    Ok(x)
}

pub fn inverse(a: DMatrix<Real>) -> Result<DMatrix<Real>, LinearAlgebraError> {
    let n = a.nrows();
    let inverse = a.try_inverse().ok_or(LinearAlgebraError::Singular(n))?;
    check_finite(inverse.iter(), n)?;
    Ok(inverse)
}

/// Sample covariance of the columns of `samples` (rows are observations), `n − 1` denominator.
pub fn covariance(samples: ArrayView2<'_, Real>) -> Result<DMatrix<Real>, LinearAlgebraError> {
    let (rows, cols) = samples.dim();
    if rows < 2 {
        return Err(LinearAlgebraError::TooFewSamples(rows));
    }
    let x = DMatrix::from_fn(rows, cols, |r, c| samples[(r, c)]);
    let means = x.row_mean();
    let centred = DMatrix::from_fn(rows, cols, |r, c| x[(r, c)] - means[c]);
    let covariance = centred.transpose() * &centred / (rows - 1) as Real;
    check_finite(covariance.iter(), cols)?;
    Ok(covariance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::array;

    #[test]
    fn solves_small_system() {
        let a = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 3.0]);
        let x = solve_vector(a, &DVector::from_column_slice(&[3.0, 5.0])).unwrap();
        assert_approx_eq!(x[0], 0.8);
        assert_approx_eq!(x[1], 1.4);
    }

    #[test]
    fn singular_system() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 4.0]);
        assert!(solve_vector(a.clone(), &DVector::from_column_slice(&[1.0, 1.0])).is_err());
        assert_eq!(inverse(a), Err(LinearAlgebraError::Singular(2)));
    }

    #[test]
    fn unbiased_covariance() {
        let samples = array![[1.0, 2.0], [3.0, 6.0], [5.0, 10.0]];
        let c = covariance(samples.view()).unwrap();
        assert_approx_eq!(c[(0, 0)], 4.0);
        assert_approx_eq!(c[(0, 1)], 8.0);
        assert_approx_eq!(c[(1, 0)], 8.0);
        assert_approx_eq!(c[(1, 1)], 16.0);
    }

    #[test]
    fn covariance_needs_two_rows() {
        let samples = array![[1.0, 2.0]];
        assert_eq!(
            covariance(samples.view()),
            Err(LinearAlgebraError::TooFewSamples(1))
        );
    }
}
