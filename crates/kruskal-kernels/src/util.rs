//! Shared kernel plumbing: the rank-tile dispatch ladder and precondition
//! checks.

use crate::error::{KernelError, KernelResult};
use kruskal_core::{FactorMatrix, Ktensor, Real};
use kruskal_sparse::SpTensor;
use scirs2_core::ndarray_ext::Array1;

/// Widest compile-time rank tile.
pub(crate) const FAC_BLOCK_MAX: usize = 32;

/// Instantiate a const-generic kernel over the rank-tile ladder
/// {1, 2, 4, 8, 16, 32}, selected once per call from the rank. A rank off
/// the ladder runs the widest tile with a runtime trailing length.
macro_rules! dispatch_rank_tile {
    ($nc:expr, $func:ident ( $($args:expr),* $(,)? )) => {
        match $nc {
            1 => $func::<1>($($args),*),
            2 => $func::<2>($($args),*),
            3..=4 => $func::<4>($($args),*),
            5..=8 => $func::<8>($($args),*),
            9..=16 => $func::<16>($($args),*),
            _ => $func::<{ crate::util::FAC_BLOCK_MAX }>($($args),*),
        }
    };
}
pub(crate) use dispatch_rank_tile;

/// Length-`nj` Hadamard row product for one nonzero:
/// `tmp[jj] = x_val * w[j+jj] * prod_{m != skip} U_m[subs[i,m], j+jj]`.
#[inline]
pub(crate) fn hadamard_row<const FB: usize>(
    tmp: &mut [Real; FB],
    nj: usize,
    x: &SpTensor,
    u: &Ktensor,
    skip: usize,
    i: usize,
    j: usize,
    x_val: Real,
) {
    let w = u.weights();
    for jj in 0..nj {
        tmp[jj] = x_val * w[j + jj];
    }
    for m in 0..x.ndims() {
        if m != skip {
            let row = u.factor(m).row_slice(x.subscript(i, m));
            for jj in 0..nj {
                tmp[jj] *= row[j + jj];
            }
        }
    }
}

/// Shared tensor/K-tensor agreement checks. `skip_mode` exempts one mode
/// from the factor-row check (the MTTKRP target, whose factor is being
/// overwritten).
fn check_tensor_ktensor(
    op: &'static str,
    x: &SpTensor,
    u: &Ktensor,
    skip_mode: Option<usize>,
) -> KernelResult<()> {
    let nd = x.ndims();
    if u.ndims() != nd {
        return Err(KernelError::ShapeMismatch {
            op,
            what: "k-tensor mode count".to_string(),
            expected: vec![nd],
            actual: vec![u.ndims()],
        });
    }

    let nc = u.ncomponents();
    for m in 0..nd {
        if u.factor(m).ncols() != nc {
            return Err(KernelError::RankMismatch {
                op,
                factor: m,
                expected: nc,
                actual: u.factor(m).ncols(),
            });
        }
        if skip_mode != Some(m) && u.factor(m).nrows() != x.size(m) {
            return Err(KernelError::ShapeMismatch {
                op,
                what: format!("factor {} row count", m),
                expected: vec![x.size(m)],
                actual: vec![u.factor(m).nrows()],
            });
        }
    }
    Ok(())
}

pub(crate) fn validate_mttkrp(
    x: &SpTensor,
    u: &Ktensor,
    n: usize,
    v: &FactorMatrix,
) -> KernelResult<()> {
    const OP: &str = "mttkrp";
    if n >= x.ndims() {
        return Err(KernelError::ModeOutOfRange {
            op: OP,
            mode: n,
            ndims: x.ndims(),
        });
    }
    check_tensor_ktensor(OP, x, u, Some(n))?;

    let nc = u.ncomponents();
    if v.nrows() != x.size(n) || v.ncols() != nc {
        return Err(KernelError::ShapeMismatch {
            op: OP,
            what: "output factor matrix".to_string(),
            expected: vec![x.size(n), nc],
            actual: vec![v.nrows(), v.ncols()],
        });
    }
    Ok(())
}

pub(crate) fn validate_innerprod(
    x: &SpTensor,
    u: &Ktensor,
    lambda: &Array1<Real>,
) -> KernelResult<()> {
    const OP: &str = "innerprod";
    check_tensor_ktensor(OP, x, u, None)?;
    if lambda.len() != u.ncomponents() {
        return Err(KernelError::ShapeMismatch {
            op: OP,
            what: "weight vector".to_string(),
            expected: vec![u.ncomponents()],
            actual: vec![lambda.len()],
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod reference {
    //! Scalar reference implementations used as test oracles.

    use kruskal_core::{Ktensor, Real};
    use kruskal_sparse::SpTensor;
    use scirs2_core::ndarray_ext::{Array1, Array2};

    pub fn reference_mttkrp(x: &SpTensor, u: &Ktensor, n: usize) -> Array2<Real> {
        let nc = u.ncomponents();
        let mut v = Array2::<Real>::zeros((x.size(n), nc));
        for i in 0..x.nnz() {
            for j in 0..nc {
                let mut t = x.value(i) * u.weights()[j];
                for m in 0..x.ndims() {
                    if m != n {
                        t *= u.factor(m).array()[[x.subscript(i, m), j]];
                    }
                }
                v[[x.subscript(i, n), j]] += t;
            }
        }
        v
    }

    pub fn reference_innerprod(x: &SpTensor, u: &Ktensor, lambda: &Array1<Real>) -> Real {
        let mut d = 0.0;
        for i in 0..x.nnz() {
            for j in 0..u.ncomponents() {
                let mut t = x.value(i) * lambda[j];
                for m in 0..x.ndims() {
                    t *= u.factor(m).array()[[x.subscript(i, m), j]];
                }
                d += t;
            }
        }
        d
    }
}
