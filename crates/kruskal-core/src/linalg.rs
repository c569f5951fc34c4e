//! Symmetric positive-definite solves for the normal equations.
//!
//! CP-ALS repeatedly solves `B <- B * A^{-1}` where `A` is the Hadamard
//! product of Gramian matrices (symmetric positive semi-definite, R x R)
//! and `B` is an MTTKRP result (m x R). The factorization comes from
//! `scirs2_linalg::cholesky`; the two triangular substitutions are applied
//! row by row so `B` is overwritten in place.

use crate::error::{CoreError, CoreResult};
use crate::types::{Real, MACHINE_EPSILON};
use scirs2_core::ndarray_ext::Array2;

/// Overwrite `b` with `b * a^{-1}` for symmetric positive-definite `a`.
///
/// Because `a` is symmetric, each row `b_i` of `b` is replaced by the
/// solution `x` of `a x = b_i`.
///
/// # Errors
///
/// Returns [`CoreError::SingularNormalEquations`] if the Cholesky
/// factorization fails or produces a pivot too small to divide by.
pub fn solve_spd(a: &Array2<Real>, b: &mut Array2<Real>) -> CoreResult<()> {
    let n = a.nrows();
    if a.ncols() != n {
        return Err(CoreError::ShapeMismatch {
            op: "solve_spd",
            what: "coefficient matrix".to_string(),
            expected: vec![n, n],
            actual: vec![a.nrows(), a.ncols()],
        });
    }
    if b.ncols() != n {
        return Err(CoreError::ShapeMismatch {
            op: "solve_spd",
            what: "right-hand side".to_string(),
            expected: vec![b.nrows(), n],
            actual: vec![b.nrows(), b.ncols()],
        });
    }

    let l = scirs2_linalg::cholesky(&a.view(), None).map_err(|e| {
        CoreError::SingularNormalEquations {
            reason: format!("Cholesky factorization failed: {}", e),
        }
    })?;

    // A factorization can succeed numerically yet leave a pivot that is
    // effectively zero; dividing by it would manufacture huge garbage
    // instead of an error.
    let scale = (0..n).map(|k| a[[k, k]].abs()).fold(0.0, Real::max);
    let tiny = scale.max(1.0) * MACHINE_EPSILON * n as Real;
    for k in 0..n {
        let pivot = l[[k, k]];
        if !pivot.is_finite() || pivot.abs() <= tiny {
            return Err(CoreError::SingularNormalEquations {
                reason: format!("pivot {:e} at column {}", pivot, k),
            });
        }
    }

    // Row-wise solve of L L^T x = b_i.
    for mut row in b.rows_mut() {
        for k in 0..n {
            let mut s = row[k];
            for j in 0..k {
                s -= l[[k, j]] * row[j];
            }
            row[k] = s / l[[k, k]];
        }
        for k in (0..n).rev() {
            let mut s = row[k];
            for j in (k + 1)..n {
                s -= l[[j, k]] * row[j];
            }
            row[k] = s / l[[k, k]];
        }
    }

    Ok(())
}
