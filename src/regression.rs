//! Least-squares fitting for calibration.
//!
//! Solves the ridge-stabilised normal equations on centred data:
//!
//! ```text
//! (Xc'Xc + λI) w = Xc'yc        intercept = ȳ − w·x̄
//! ```
//!
//! The intercept is not penalised. λ > 0 keeps the system solvable when
//! there are fewer examples than features. Cholesky is tried first; LU with
//! partial pivoting covers the semi-definite case.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::model::LearnedWeights;

const PIVOT_EPS: f64 = 1e-10;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FitError {
    #[error("no training examples")]
    Empty,
    #[error("feature rows have inconsistent length (expected {expected}, got {got})")]
    Ragged { expected: usize, got: usize },
    #[error("training data contains non-finite values")]
    NonFinite,
    #[error("normal equations are singular")]
    Singular,
}

/// Fit `y ≈ intercept + Σ wᵢ xᵢ`.
pub fn fit_ridge(rows: &[Vec<f64>], targets: &[f64], lambda: f64) -> Result<LearnedWeights, FitError> {
    if rows.is_empty() || rows.len() != targets.len() {
        return Err(FitError::Empty);
    }
    let p = rows[0].len();
    for r in rows {
        if r.len() != p {
            return Err(FitError::Ragged {
                expected: p,
                got: r.len(),
            });
        }
    }
    if rows.iter().flatten().chain(targets).any(|v| !v.is_finite()) || !lambda.is_finite() {
        return Err(FitError::NonFinite);
    }

    let n = rows.len();
    let mean_x = DVector::from_fn(p, |j, _| rows.iter().map(|r| r[j]).sum::<f64>() / n as f64);
    let mean_y = targets.iter().sum::<f64>() / n as f64;
    let xc = DMatrix::from_fn(n, p, |i, j| rows[i][j] - mean_x[j]);
    let yc = DVector::from_fn(n, |i, _| targets[i] - mean_y);

    let mut a = xc.transpose() * &xc;
    for i in 0..p {
        a[(i, i)] += lambda.max(0.0);
    }
    let b = xc.transpose() * yc;

    let w = solve_normal_equations(a, &b).ok_or(FitError::Singular)?;
    if w.iter().any(|v| !v.is_finite()) {
        return Err(FitError::Singular);
    }

    let intercept = mean_y - w.dot(&mean_x);
    if !intercept.is_finite() {
        return Err(FitError::Singular);
    }

    Ok(LearnedWeights {
        intercept,
        coefficients: w.iter().copied().collect(),
    })
}

/// `None` when the system has no unique solution (pivots below tolerance).
fn solve_normal_equations(a: DMatrix<f64>, b: &DVector<f64>) -> Option<DVector<f64>> {
    let tol = PIVOT_EPS * a.amax().max(1.0);
    if let Some(chol) = a.clone().cholesky() {
        if chol.l_dirty().diagonal().iter().all(|d| d * d > tol) {
            return Some(chol.solve(b));
        }
    }
    let lu = a.lu();
    if lu.u().diagonal().iter().any(|d| d.abs() <= tol) {
        return None;
    }
    lu.solve(b)
}
