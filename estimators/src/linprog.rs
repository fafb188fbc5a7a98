//! Two-phase dense simplex for `min cᵀx` subject to `A x ≤ b`, `x ≥ 0`.
//!
//! Rows with a negative right-hand side are negated and given an artificial variable. Phase one
//! drives the artificials to zero, phase two optimises the real objective. Bland's rule picks both
//! the entering and the leaving variable, so degenerate problems terminate.
#![allow(clippy::needless_range_loop)]

use nalgebra::{DMatrix, DVector};
use pileup_common::Real;
use std::fmt::Display;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct LinProgOptions {
    pub max_iterations: usize,
    pub tolerance: Real,
}

impl Default for LinProgOptions {
    fn default() -> Self {
        Self {
            max_iterations: 5000,
            tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinProgStatus {
    Optimal,
    Infeasible,
    Unbounded,
    IterationLimit,
}

impl Display for LinProgStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = match self {
            Self::Optimal => "optimal solution found",
            Self::Infeasible => "problem is infeasible",
            Self::Unbounded => "problem is unbounded",
            Self::IterationLimit => "iteration limit reached",
        };
        f.write_str(message)
    }
}

#[derive(Debug, Clone)]
pub struct LinProgResult {
    /// Solution, clamped to be non-negative. All zeros unless optimal.
    pub x: DVector<Real>,
    /// Objective at `x`.
    pub fun: Real,
    pub status: LinProgStatus,
    /// Pivots performed over both phases.
    pub nit: usize,
}

impl LinProgResult {
    pub fn is_optimal(&self) -> bool {
        self.status == LinProgStatus::Optimal
    }
}

struct Tableau {
    /// `m` constraint rows of `n_columns` coefficients followed by the right-hand side.
    rows: Vec<Vec<Real>>,
    basis: Vec<usize>,
    n_columns: usize,
    tolerance: Real,
}

impl Tableau {
    fn rhs(&self, row: usize) -> Real {
        self.rows[row][self.n_columns]
    }

    fn pivot(&mut self, pivot_row: usize, pivot_col: usize) {
        let pivot = self.rows[pivot_row][pivot_col];
        for value in self.rows[pivot_row].iter_mut() {
            *value /= pivot;
        }
        let normalised = self.rows[pivot_row].clone();
        for (i, row) in self.rows.iter_mut().enumerate() {
            if i == pivot_row {
                continue;
            }
            let factor = row[pivot_col];
            if factor != 0.0 {
                for (value, &p) in row.iter_mut().zip(&normalised) {
                    *value -= factor * p;
                }
            }
        }
        self.basis[pivot_row] = pivot_col;
    }

    fn reduced_cost(&self, cost: &[Real], col: usize) -> Real {
        let basic: Real = self
            .basis
            .iter()
            .zip(&self.rows)
            .map(|(&b, row)| cost[b] * row[col])
            .sum();
        cost[col] - basic
    }

    /// Runs simplex iterations on the columns below `allowed`, until optimal or a failure status.
    fn optimise(
        &mut self,
        cost: &[Real],
        allowed: usize,
        max_iterations: usize,
        nit: &mut usize,
    ) -> LinProgStatus {
        loop {
            let entering = (0..allowed)
                .filter(|col| !self.basis.contains(col))
                .find(|&col| self.reduced_cost(cost, col) < -self.tolerance);
            let Some(entering) = entering else {
                return LinProgStatus::Optimal;
            };
            if *nit >= max_iterations {
                return LinProgStatus::IterationLimit;
            }

            let mut leaving: Option<(usize, Real)> = None;
            for i in 0..self.rows.len() {
                let coefficient = self.rows[i][entering];
                if coefficient <= self.tolerance {
                    continue;
                }
                let ratio = self.rhs(i) / coefficient;
                leaving = match leaving {
                    Some((best, best_ratio))
                        if ratio > best_ratio + self.tolerance
                            || (ratio >= best_ratio - self.tolerance
                                && self.basis[i] > self.basis[best]) =>
                    {
                        Some((best, best_ratio))
                    }
                    _ => Some((i, ratio)),
                };
            }
            let Some((leaving, _)) = leaving else {
                return LinProgStatus::Unbounded;
            };

            trace!("Pivot row {leaving} column {entering}");
            self.pivot(leaving, entering);
            *nit += 1;
        }
    }
}

/// Minimises `cᵀx` subject to `a_ub x ≤ b_ub` and `x ≥ 0`.
///
/// # Panics
/// If the dimensions of `c`, `a_ub` and `b_ub` disagree.
pub fn linprog(
    c: &DVector<Real>,
    a_ub: &DMatrix<Real>,
    b_ub: &DVector<Real>,
    options: &LinProgOptions,
) -> LinProgResult {
    let (m, n) = a_ub.shape();
    assert_eq!(c.len(), n, "objective length");
    assert_eq!(b_ub.len(), m, "right-hand side length");

    let n_artificial = b_ub.iter().filter(|&&b| b < 0.0).count();
    let n_columns = n + m + n_artificial;
    let mut rows = vec![vec![0.0; n_columns + 1]; m];
    let mut basis = vec![0; m];
    let mut next_artificial = n + m;

    for i in 0..m {
        let sign = if b_ub[i] < 0.0 { -1.0 } else { 1.0 };
        for j in 0..n {
            rows[i][j] = sign * a_ub[(i, j)];
        }
        rows[i][n + i] = sign;
        rows[i][n_columns] = sign * b_ub[i];
        if sign < 0.0 {
            rows[i][next_artificial] = 1.0;
            basis[i] = next_artificial;
            next_artificial += 1;
        } else {
            basis[i] = n + i;
        }
    }

    let mut tableau = Tableau {
        rows,
        basis,
        n_columns,
        tolerance: options.tolerance,
    };
    let mut nit = 0;
    let failed = |status, nit| LinProgResult {
        x: DVector::zeros(n),
        fun: Real::NAN,
        status,
        nit,
    };

    if n_artificial > 0 {
        let mut phase_one_cost = vec![0.0; n_columns];
        phase_one_cost[n + m..].fill(1.0);
        let status = tableau.optimise(&phase_one_cost, n_columns, options.max_iterations, &mut nit);
        if status != LinProgStatus::Optimal {
            return failed(status, nit);
        }
        let infeasibility: Real = (0..m)
            .filter(|&i| tableau.basis[i] >= n + m)
            .map(|i| tableau.rhs(i))
            .sum();
        if infeasibility > options.tolerance.sqrt() {
            return failed(LinProgStatus::Infeasible, nit);
        }
        // Swap zero-valued artificials out of the basis where a real column can replace them.
        for i in 0..m {
            if tableau.basis[i] < n + m {
                continue;
            }
            if let Some(col) =
                (0..n + m).find(|&col| tableau.rows[i][col].abs() > options.tolerance)
            {
                tableau.pivot(i, col);
            }
        }
    }

    let mut phase_two_cost = vec![0.0; n_columns];
    phase_two_cost[..n].copy_from_slice(c.as_slice());
    let status = tableau.optimise(&phase_two_cost, n + m, options.max_iterations, &mut nit);
    if status != LinProgStatus::Optimal {
        return failed(status, nit);
    }

    let mut x = DVector::zeros(n);
    for (i, &b) in tableau.basis.iter().enumerate() {
        if b < n {
            x[b] = tableau.rhs(i).max(0.0);
        }
    }
    LinProgResult {
        fun: c.dot(&x),
        x,
        status,
        nit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn solve(c: &[Real], a: &[Real], b: &[Real]) -> LinProgResult {
        let a = DMatrix::from_row_slice(b.len(), c.len(), a);
        linprog(
            &DVector::from_column_slice(c),
            &a,
            &DVector::from_column_slice(b),
            &LinProgOptions::default(),
        )
    }

    #[test]
    fn simple_maximisation() {
        let result = solve(&[-1.0, -2.0], &[1.0, 1.0, 1.0, 0.0, 0.0, 1.0], &[4.0, 2.0, 3.0]);
        assert!(result.is_optimal());
        assert_approx_eq!(result.fun, -7.0);
        assert_approx_eq!(result.x[0], 1.0);
        assert_approx_eq!(result.x[1], 3.0);
    }

    #[test]
    fn negative_rhs_needs_phase_one() {
        // x + y >= 2, x <= 3, minimise x + 3y.
        let result = solve(&[1.0, 3.0], &[-1.0, -1.0, 1.0, 0.0], &[-2.0, 3.0]);
        assert!(result.is_optimal());
        assert_approx_eq!(result.fun, 2.0);
        assert_approx_eq!(result.x[0], 2.0);
        assert_approx_eq!(result.x[1], 0.0);
    }

    #[test]
    fn infeasible() {
        // x <= 1 and x >= 2.
        let result = solve(&[1.0], &[1.0, -1.0], &[1.0, -2.0]);
        assert_eq!(result.status, LinProgStatus::Infeasible);
        assert!(result.fun.is_nan());
    }

    #[test]
    fn unbounded() {
        let result = solve(&[-1.0, 0.0], &[0.0, 1.0], &[1.0]);
        assert_eq!(result.status, LinProgStatus::Unbounded);
    }

    #[test]
    fn iteration_limit() {
        let a = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 1.0, 0.0, 0.0, 1.0]);
        let result = linprog(
            &DVector::from_column_slice(&[-1.0, -2.0]),
            &a,
            &DVector::from_column_slice(&[4.0, 2.0, 3.0]),
            &LinProgOptions {
                max_iterations: 0,
                ..Default::default()
            },
        );
        assert_eq!(result.status, LinProgStatus::IterationLimit);
    }

    #[test]
    fn degenerate_problem_terminates() {
        // Beale's cycling example for the textbook pivot rule.
        let result = solve(
            &[-0.75, 150.0, -0.02, 6.0],
            &[
                0.25, -60.0, -0.04, 9.0, //
                0.5, -90.0, -0.02, 3.0, //
                0.0, 0.0, 1.0, 0.0,
            ],
            &[0.0, 0.0, 1.0],
        );
        assert!(result.is_optimal());
        assert_approx_eq!(result.fun, -0.05);
    }
}
