//! Inner product of a sparse tensor with a K-tensor model.
//!
//! Computes `sum_k vals[k] * sum_j lambda[j] * prod_m U_m[subs[k,m], j]`.
//! The weight vector is passed separately from the K-tensor so CP-ALS can
//! evaluate the model under its working weights while the K-tensor itself
//! stays distributed.
//!
//! The reduction runs at three levels: vector lanes over the rank tile,
//! an accumulator over the nonzeros of a block, and a parallel sum over
//! blocks. Results are deterministic for a fixed parallel shape only.

use crate::error::KernelResult;
use crate::util::{dispatch_rank_tile, validate_innerprod};
use kruskal_core::{Ktensor, Real};
use kruskal_sparse::{SpTensor, SparseTensor};
use scirs2_core::ndarray_ext::Array1;

#[cfg(feature = "parallel")]
use scirs2_core::parallel_ops::*;

/// Nonzeros per reduction block.
const IP_ROW_BLOCK_SIZE: usize = 32;

/// Compute `<x, lambda * [U_0, ..., U_{N-1}]>`.
///
/// # Errors
///
/// - `RankMismatch` if the factor column counts disagree.
/// - `ShapeMismatch` if a factor row count or the weight length is wrong.
///
/// # Examples
///
/// ```
/// use kruskal_core::Ktensor;
/// use kruskal_kernels::innerprod;
/// use kruskal_sparse::{SparseTensor, SpTensor, TensorLayout};
/// use scirs2_core::ndarray_ext::array;
///
/// let x = SpTensor::from_tuples(vec![2, 2], &[vec![0, 0], vec![1, 1]], vec![2.0, 3.0]).unwrap();
/// let x = SparseTensor::with_layout(x, TensorLayout::Coo);
///
/// let mut u = Ktensor::new(1, &[2, 2]);
/// u.factor_mut(0).fill(1.0);
/// u.factor_mut(1).fill(1.0);
///
/// let d = innerprod(&x, &u, &array![1.0]).unwrap();
/// assert_eq!(d, 5.0);
/// ```
pub fn innerprod(x: &SparseTensor, u: &Ktensor, lambda: &Array1<Real>) -> KernelResult<Real> {
    validate_innerprod(x.base(), u, lambda)?;
    if x.nnz() == 0 {
        return Ok(0.0);
    }
    let nc = u.ncomponents();
    Ok(dispatch_rank_tile!(nc, ip_blocks(x.base(), u, lambda, nc)))
}

fn ip_blocks<const FB: usize>(
    x: &SpTensor,
    u: &Ktensor,
    lambda: &Array1<Real>,
    nc: usize,
) -> Real {
    let nnz = x.nnz();
    let nd = x.ndims();
    let nblocks = nnz.div_ceil(IP_ROW_BLOCK_SIZE);

    let block_sum = |b: usize| -> Real {
        let begin = b * IP_ROW_BLOCK_SIZE;
        let end = (begin + IP_ROW_BLOCK_SIZE).min(nnz);
        let mut d = 0.0;

        let mut j = 0;
        while j < nc {
            let nj = FB.min(nc - j);
            let mut val = [0.0; FB];

            for i in begin..end {
                let x_val = x.value(i);
                let mut tmp = [0.0; FB];
                for jj in 0..nj {
                    tmp[jj] = x_val * lambda[j + jj];
                }
                for m in 0..nd {
                    let row = u.factor(m).row_slice(x.subscript(i, m));
                    for jj in 0..nj {
                        tmp[jj] *= row[j + jj];
                    }
                }
                for jj in 0..nj {
                    val[jj] += tmp[jj];
                }
            }

            for jj in 0..nj {
                d += val[jj];
            }
            j += FB;
        }
        d
    };

    let total: Real;
    #[cfg(feature = "parallel")]
    {
        total = (0..nblocks).into_par_iter().map(block_sum).sum();
    }
    #[cfg(not(feature = "parallel"))]
    {
        total = (0..nblocks).map(block_sum).sum();
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::reference::reference_innerprod;
    use kruskal_core::FactorMatrix;
    use kruskal_sparse::TensorLayout;
    use scirs2_core::ndarray_ext::array;

    fn small_tensor() -> SpTensor {
        SpTensor::from_tuples(
            vec![2, 2, 2],
            &[vec![0, 0, 0], vec![1, 0, 1], vec![0, 1, 1]],
            vec![1.0, 2.0, 3.0],
        )
        .unwrap()
    }

    #[test]
    fn test_innerprod_ones_is_value_sum() {
        let mut u = Ktensor::new(1, &[2, 2, 2]);
        for m in 0..3 {
            u.factor_mut(m).fill(1.0);
        }
        let x = SparseTensor::with_layout(small_tensor(), TensorLayout::Coo);
        let d = innerprod(&x, &u, &array![1.0]).unwrap();
        assert_eq!(d, 6.0);
    }

    #[test]
    fn test_innerprod_selects_single_cell() {
        // Rank-1 indicator factors pick out exactly the (0,0,0) nonzero.
        let u0 = FactorMatrix::from_array(array![[1.0], [0.0]]);
        let u1 = FactorMatrix::from_array(array![[1.0], [0.0]]);
        let u2 = FactorMatrix::from_array(array![[1.0], [0.0]]);
        let u = Ktensor::from_parts(array![1.0], vec![u0, u1, u2]).unwrap();

        let x = SparseTensor::with_layout(small_tensor(), TensorLayout::Coo);
        let d = innerprod(&x, &u, &array![1.0]).unwrap();
        assert_eq!(d, 1.0);
    }

    #[test]
    fn test_innerprod_lambda_overrides_weights() {
        let mut u = Ktensor::new(1, &[2, 2, 2]);
        for m in 0..3 {
            u.factor_mut(m).fill(1.0);
        }
        // The k-tensor's own weights must be ignored in favor of lambda.
        u.set_weights(array![100.0]).unwrap();

        let x = SparseTensor::with_layout(small_tensor(), TensorLayout::Coo);
        let d = innerprod(&x, &u, &array![2.0]).unwrap();
        assert_eq!(d, 12.0);
    }

    #[test]
    fn test_innerprod_matches_reference() {
        use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        let sizes = vec![4, 9, 5];
        let nnz = 120;

        let tuples: Vec<Vec<usize>> = (0..nnz)
            .map(|_| sizes.iter().map(|&s| rng.random_range(0..s)).collect())
            .collect();
        let vals: Vec<Real> = (0..nnz).map(|_| rng.random_range(-2.0..2.0)).collect();
        let coo = SpTensor::from_tuples(sizes.clone(), &tuples, vals).unwrap();

        for nc in [1, 2, 4, 7, 16, 33] {
            let mut u = Ktensor::new(nc, &sizes);
            for m in 0..3 {
                for v in u.factor_mut(m).as_mut_slice() {
                    *v = rng.random_range(-1.0..1.0);
                }
            }
            let lambda =
                Array1::from_shape_fn(nc, |_| rng.random_range(0.0..2.0));

            let x = SparseTensor::with_layout(coo.clone(), TensorLayout::Coo);
            let expected = reference_innerprod(&coo, &u, &lambda);
            let actual = innerprod(&x, &u, &lambda).unwrap();

            let scale = expected.abs().max(1.0);
            assert!(
                (actual - expected).abs() < 1e-10 * scale,
                "nc {}: {} vs {}",
                nc,
                actual,
                expected
            );
        }
    }

    #[test]
    fn test_innerprod_empty_tensor() {
        let coo = SpTensor::new(vec![2, 2], vec![], vec![]).unwrap();
        let x = SparseTensor::with_layout(coo, TensorLayout::Coo);
        let mut u = Ktensor::new(2, &[2, 2]);
        for m in 0..2 {
            u.factor_mut(m).fill(1.0);
        }
        assert_eq!(innerprod(&x, &u, &array![1.0, 1.0]).unwrap(), 0.0);
    }

    #[test]
    fn test_innerprod_rejects_wrong_lambda_len() {
        let x = SparseTensor::with_layout(small_tensor(), TensorLayout::Coo);
        let u = Ktensor::new(2, &[2, 2, 2]);
        assert!(innerprod(&x, &u, &array![1.0]).is_err());
    }
}
