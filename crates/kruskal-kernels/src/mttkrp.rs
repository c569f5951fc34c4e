//! MTTKRP (Matricized Tensor Times Khatri-Rao Product) over sparse input.
//!
//! For sparse X, K-tensor U of rank R, and target mode n, overwrite V by
//!
//! `V[r, j] = sum_k [subs[k,n] = r] * vals[k] * w[j] * prod_{m != n} U_m[subs[k,m], j]`
//!
//! The Khatri-Rao product is never materialized: each nonzero contributes
//! one length-R Hadamard row product, scattered into its target row.
//! The storage variant decides how concurrent scatters are resolved; the
//! variants agree numerically up to floating-point summation order, not
//! bitwise.

use crate::atomic::{zero_buffer, AtomicF64};
use crate::error::KernelResult;
use crate::util::{dispatch_rank_tile, hadamard_row, validate_mttkrp};
use kruskal_core::{FactorMatrix, Ktensor, Real};
use kruskal_sparse::{SpTensor, SpTensorPerm, SpTensorRow, SparseTensor};

#[cfg(feature = "parallel")]
use scirs2_core::parallel_ops::*;

/// Nonzeros per parallel work item in the COO kernel.
const COO_BLOCK_SIZE: usize = 1024;

/// Permuted nonzeros per segmented-accumulation block. Boundary rows of
/// adjacent blocks may collide, so only they are flushed atomically.
const PERM_ROW_BLOCK_SIZE: usize = 128;

/// Compute the MTTKRP of `x` with `u` for mode `n` into `v`.
///
/// `v` must be pre-allocated with shape `(x.size(n), u.ncomponents())`;
/// it is zeroed on entry.
///
/// # Errors
///
/// - `ModeOutOfRange` if `n >= x.ndims()`.
/// - `RankMismatch` if the factor column counts disagree.
/// - `ShapeMismatch` if a factor row count or the output shape is wrong.
///
/// # Examples
///
/// ```
/// use kruskal_core::{FactorMatrix, Ktensor};
/// use kruskal_kernels::mttkrp;
/// use kruskal_sparse::{SparseTensor, SpTensor, TensorLayout};
///
/// let x = SpTensor::from_tuples(
///     vec![2, 2],
///     &[vec![0, 1], vec![1, 0]],
///     vec![3.0, 4.0],
/// )
/// .unwrap();
/// let x = SparseTensor::with_layout(x, TensorLayout::Row);
///
/// let mut u = Ktensor::new(1, &[2, 2]);
/// u.factor_mut(0).fill(1.0);
/// u.factor_mut(1).fill(1.0);
///
/// let mut v = FactorMatrix::zeros(2, 1);
/// mttkrp(&x, &u, 0, &mut v).unwrap();
/// assert_eq!(v.array()[[0, 0]], 3.0);
/// assert_eq!(v.array()[[1, 0]], 4.0);
/// ```
pub fn mttkrp(
    x: &SparseTensor,
    u: &Ktensor,
    n: usize,
    v: &mut FactorMatrix,
) -> KernelResult<()> {
    validate_mttkrp(x.base(), u, n, v)?;
    v.fill(0.0);
    if x.nnz() == 0 {
        return Ok(());
    }

    match x {
        SparseTensor::Coo(t) => mttkrp_coo(t, u, n, v),
        SparseTensor::Perm(t) => mttkrp_perm(t, u, n, v),
        SparseTensor::Row(t) => mttkrp_row(t, u, n, v),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// COO variant: atomic scatter per nonzero
// ---------------------------------------------------------------------------

fn mttkrp_coo(x: &SpTensor, u: &Ktensor, n: usize, v: &mut FactorMatrix) {
    let nc = u.ncomponents();
    let out = zero_buffer(v.nrows() * nc);
    dispatch_rank_tile!(nc, coo_scatter(x, u, n, nc, &out));
    store_buffer(&out, v);
}

fn coo_scatter<const FB: usize>(
    x: &SpTensor,
    u: &Ktensor,
    n: usize,
    nc: usize,
    out: &[AtomicF64],
) {
    let nnz = x.nnz();
    let nblocks = nnz.div_ceil(COO_BLOCK_SIZE);

    let body = |b: usize| {
        let begin = b * COO_BLOCK_SIZE;
        let end = (begin + COO_BLOCK_SIZE).min(nnz);
        for i in begin..end {
            let row = x.subscript(i, n);
            let x_val = x.value(i);

            let mut j = 0;
            while j < nc {
                let nj = FB.min(nc - j);
                let mut tmp = [0.0; FB];
                hadamard_row(&mut tmp, nj, x, u, n, i, j, x_val);
                for jj in 0..nj {
                    out[row * nc + j + jj].fetch_add(tmp[jj]);
                }
                j += FB;
            }
        }
    };

    #[cfg(feature = "parallel")]
    (0..nblocks).into_par_iter().for_each(body);
    #[cfg(not(feature = "parallel"))]
    (0..nblocks).for_each(body);
}

// ---------------------------------------------------------------------------
// Permuted variant: segmented accumulation over sorted row runs
// ---------------------------------------------------------------------------

fn mttkrp_perm(x: &SpTensorPerm, u: &Ktensor, n: usize, v: &mut FactorMatrix) {
    let nc = u.ncomponents();
    let out = zero_buffer(v.nrows() * nc);
    dispatch_rank_tile!(nc, perm_scatter(x, u, n, nc, &out));
    store_buffer(&out, v);
}

fn perm_scatter<const FB: usize>(
    x: &SpTensorPerm,
    u: &Ktensor,
    n: usize,
    nc: usize,
    out: &[AtomicF64],
) {
    let nnz = x.nnz();
    let nblocks = nnz.div_ceil(PERM_ROW_BLOCK_SIZE);

    let body = |b: usize| {
        let begin = b * PERM_ROW_BLOCK_SIZE;
        let end = (begin + PERM_ROW_BLOCK_SIZE).min(nnz);

        let mut j = 0;
        while j < nc {
            let nj = FB.min(nc - j);
            let mut val = [0.0; FB];
            let mut first_row = usize::MAX;
            let mut row_prev = usize::MAX;

            for i in begin..end {
                let p = x.get_perm(i, n);
                let row = x.subscript(p, n);
                if i == begin {
                    first_row = row;
                }

                // A new row ends the current run; the first run may
                // collide with the previous block, so it goes out with
                // atomics, interior runs with plain adds.
                if row != row_prev {
                    if row_prev != usize::MAX {
                        flush_run(out, row_prev, nc, j, nj, &mut val, row_prev == first_row);
                    }
                    row_prev = row;
                }

                let mut tmp = [0.0; FB];
                hadamard_row(&mut tmp, nj, x.base(), u, n, p, j, x.value(p));
                for jj in 0..nj {
                    val[jj] += tmp[jj];
                }
            }

            // The last run may collide with the next block.
            if row_prev != usize::MAX {
                flush_run(out, row_prev, nc, j, nj, &mut val, true);
            }
            j += FB;
        }
    };

    #[cfg(feature = "parallel")]
    (0..nblocks).into_par_iter().for_each(body);
    #[cfg(not(feature = "parallel"))]
    (0..nblocks).for_each(body);
}

#[inline]
fn flush_run<const FB: usize>(
    out: &[AtomicF64],
    row: usize,
    nc: usize,
    j: usize,
    nj: usize,
    val: &mut [Real; FB],
    boundary: bool,
) {
    if boundary {
        for jj in 0..nj {
            out[row * nc + j + jj].fetch_add(val[jj]);
        }
    } else {
        for jj in 0..nj {
            out[row * nc + j + jj].plain_add(val[jj]);
        }
    }
    for v in val.iter_mut().take(nj) {
        *v = 0.0;
    }
}

// ---------------------------------------------------------------------------
// Row-indexed variant: one worker per output row, no atomics
// ---------------------------------------------------------------------------

fn mttkrp_row(x: &SpTensorRow, u: &Ktensor, n: usize, v: &mut FactorMatrix) {
    let nc = u.ncomponents();
    dispatch_rank_tile!(nc, row_gather(x, u, n, nc, v.as_mut_slice()));
}

fn row_gather<const FB: usize>(
    x: &SpTensorRow,
    u: &Ktensor,
    n: usize,
    nc: usize,
    out: &mut [Real],
) {
    let body = |(r, vrow): (usize, &mut [Real])| {
        let begin = x.get_perm_row_begin(r, n);
        let end = x.get_perm_row_begin(r + 1, n);
        if begin == end {
            return;
        }

        let mut j = 0;
        while j < nc {
            let nj = FB.min(nc - j);
            let mut val = [0.0; FB];
            for i in begin..end {
                let p = x.get_perm(i, n);
                let mut tmp = [0.0; FB];
                hadamard_row(&mut tmp, nj, x.base(), u, n, p, j, x.value(p));
                for jj in 0..nj {
                    val[jj] += tmp[jj];
                }
            }
            for jj in 0..nj {
                vrow[j + jj] += val[jj];
            }
            j += FB;
        }
    };

    #[cfg(feature = "parallel")]
    out.par_chunks_mut(nc).enumerate().for_each(body);
    #[cfg(not(feature = "parallel"))]
    out.chunks_mut(nc).enumerate().for_each(body);
}

fn store_buffer(out: &[AtomicF64], v: &mut FactorMatrix) {
    for (dst, cell) in v.as_mut_slice().iter_mut().zip(out) {
        *dst = cell.load();
    }
}
