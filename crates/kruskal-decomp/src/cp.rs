//! CP-ALS: canonical polyadic decomposition via alternating least squares.

use kruskal_core::{
    CoreError, FactorMatrix, Ktensor, NormKind, Real, MACHINE_EPSILON,
};
use kruskal_kernels::{innerprod, mttkrp, KernelError};
use kruskal_sparse::SparseTensor;
use scirs2_core::ndarray_ext::{Array1, Array2};
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CpAlsError {
    #[error("cp_als: invalid tolerance {0}, must be positive")]
    InvalidTolerance(Real),

    #[error("cp_als: max_iters must be at least 1")]
    InvalidMaxIters,

    #[error("cp_als: residual norm squared is negative: {0:e}")]
    NegativeResidualNorm(Real),

    #[error("cp_als: {0}")]
    Kernel(#[from] KernelError),

    #[error("cp_als: {0}")]
    Core(#[from] CoreError),
}

/// Tuning knobs for one CP-ALS run.
#[derive(Debug, Clone)]
pub struct CpAlsParams {
    /// Stop when the fit change between outer iterations drops below this.
    pub tol: Real,
    /// Maximum number of outer iterations.
    pub max_iters: usize,
    /// Wall-clock budget in seconds, checked between outer iterations;
    /// the current iteration always finishes.
    pub max_secs: Option<f64>,
    /// Print progress every n outer iterations (0 = never).
    pub print_every: usize,
    /// Record performance info every n outer iterations (0 = never).
    pub perf_every: usize,
    /// Check factor matrices for NaN/Inf between iterations.
    pub guard_non_finite: bool,
}

impl Default for CpAlsParams {
    fn default() -> Self {
        Self {
            tol: 1e-4,
            max_iters: 100,
            max_secs: None,
            print_every: 0,
            perf_every: 0,
            guard_non_finite: false,
        }
    }
}

/// One performance sample, taken every `perf_every` iterations and once
/// at completion.
#[derive(Debug, Clone)]
pub struct CpAlsPerfInfo {
    /// Outer iteration count at the time of the sample (0 = initial guess).
    pub iter: usize,
    pub res_norm: Real,
    pub fit: Real,
    pub cum_time_secs: f64,
    /// MTTKRP throughput; only filled in for the final sample.
    pub mttkrp_gflops: f64,
}

/// Result of a CP-ALS run.
#[derive(Debug, Clone)]
pub struct CpAlsOutput {
    /// Outer iterations completed.
    pub num_iters: usize,
    /// Frobenius norm of the final residual.
    pub res_norm: Real,
    /// Final fit, `1 - res_norm / ||X||`.
    pub fit: Real,
    pub perf: Vec<CpAlsPerfInfo>,
}

/// Fit a CP model to `x` by alternating least squares.
///
/// `u` holds the initial guess on entry and the fitted model on return:
/// unit-norm factor columns, the component magnitudes absorbed into the
/// weights, components ordered by descending weight.
///
/// # Errors
///
/// - Shape and rank mismatches between `x` and `u` surface before any
///   work happens.
/// - `Core(SingularNormalEquations)` if a solve meets a numerically
///   singular coefficient matrix (e.g. a zero factor column).
/// - `NegativeResidualNorm` if the closed-form residual drops below the
///   roundoff threshold, which indicates corruption rather than noise.
///
/// # Examples
///
/// ```
/// use kruskal_core::Ktensor;
/// use kruskal_decomp::{cp_als, CpAlsParams};
/// use kruskal_sparse::{SparseTensor, SpTensor, TensorLayout};
///
/// let x = SpTensor::from_tuples(
///     vec![2, 2],
///     &[vec![0, 0], vec![1, 1]],
///     vec![1.0, 2.0],
/// )
/// .unwrap();
/// let x = SparseTensor::with_layout(x, TensorLayout::Row);
///
/// let mut u = Ktensor::new(2, &[2, 2]);
/// u.factor_mut(0).as_mut_slice().copy_from_slice(&[1.0, 0.1, 0.2, 0.9]);
/// u.factor_mut(1).as_mut_slice().copy_from_slice(&[0.8, 0.3, 0.1, 1.1]);
///
/// let out = cp_als(&x, &mut u, &CpAlsParams::default()).unwrap();
/// assert!(out.fit > 0.99);
/// ```
pub fn cp_als(
    x: &SparseTensor,
    u: &mut Ktensor,
    params: &CpAlsParams,
) -> Result<CpAlsOutput, CpAlsError> {
    if !(params.tol > 0.0) {
        return Err(CpAlsError::InvalidTolerance(params.tol));
    }
    if params.max_iters == 0 {
        return Err(CpAlsError::InvalidMaxIters);
    }
    u.check_consistent()?;
    u.check_sizes(x.sizes())?;

    let nd = x.ndims();
    let nc = u.ncomponents();
    let start = Instant::now();

    // Work with unit model weights; the per-iteration column norms live
    // in a separate lambda until the post-processing step.
    u.distribute(0)?;
    let mut lambda = Array1::<Real>::ones(nc);

    // Gramian cache, one matrix per mode.
    let mut gamma: Vec<Array2<Real>> = (0..nd).map(|n| u.factor(n).gramian()).collect();

    // Per-mode MTTKRP workspaces; mode sizes differ, so one each.
    let mut v: Vec<FactorMatrix> = (0..nd)
        .map(|n| FactorMatrix::zeros(x.size(n), nc))
        .collect();

    let mut upsilon = Array2::<Real>::ones((nc, nc));
    let x_norm = x.norm();

    let mut perf = Vec::new();
    let mut mttkrp_secs = 0.0f64;
    let mut mttkrp_calls = 0usize;

    if params.perf_every > 0 {
        // Residual and fit of the initial guess.
        let m_norm = u.norm_fsq().sqrt();
        let x_dot_m = innerprod(x, u, &lambda)?;
        let res = compute_res_norm(x_norm, m_norm, x_dot_m)?;
        perf.push(CpAlsPerfInfo {
            iter: 0,
            res_norm: res,
            fit: Real::max(0.0, 1.0 - res / x_norm),
            cum_time_secs: start.elapsed().as_secs_f64(),
            mttkrp_gflops: 0.0,
        });
    }

    let mut fit = 0.0;
    let mut res_norm = 0.0;
    let mut num_iters = 0;

    for iter in 0..params.max_iters {
        num_iters = iter + 1;
        let fit_old = fit;

        for n in 0..nd {
            let t0 = Instant::now();
            mttkrp(x, u, n, &mut v[n])?;
            mttkrp_secs += t0.elapsed().as_secs_f64();
            mttkrp_calls += 1;

            // Coefficients of the normal equations: the Hadamard product
            // of every other mode's Gramian.
            upsilon.fill(1.0);
            for (idx, g) in gamma.iter().enumerate() {
                if idx != n {
                    upsilon *= g;
                }
            }

            let factor = u.factor_mut(n);
            factor.assign(&v[n])?;
            factor.solve_transpose_rhs(&upsilon)?;

            // L2 norms on the first pass, floored max norms afterwards.
            lambda = if iter == 0 {
                factor.col_norms(NormKind::TwoNorm, 0.0)
            } else {
                factor.col_norms(NormKind::InfNorm, 1.0)
            };
            factor.col_scale(&lambda, true)?;

            gamma[n] = u.factor(n).gramian();
        }

        // Model norm from the cached quantities: upsilon still holds the
        // product over modes != nd-1.
        upsilon *= &gamma[nd - 1];
        for r in 0..nc {
            for s in 0..nc {
                upsilon[[r, s]] *= lambda[r] * lambda[s];
            }
        }
        let m_norm = upsilon.sum().abs().sqrt();

        let x_dot_m = innerprod(x, u, &lambda)?;
        res_norm = compute_res_norm(x_norm, m_norm, x_dot_m)?;
        fit = 1.0 - res_norm / x_norm;
        let fit_change = (fit - fit_old).abs();

        if params.guard_non_finite {
            for n in 0..nd {
                if u.factor(n).has_non_finite() {
                    return Err(CpAlsError::Core(CoreError::NonFiniteValue { mode: n }));
                }
            }
        }

        if params.print_every > 0 && num_iters % params.print_every == 0 {
            println!(
                "Iter {:2}: fit = {:13.6e}  fitdelta = {:8.1e}",
                num_iters, fit, fit_change
            );
        }
        if params.perf_every > 0 && num_iters % params.perf_every == 0 {
            perf.push(CpAlsPerfInfo {
                iter: num_iters,
                res_norm,
                fit,
                cum_time_secs: start.elapsed().as_secs_f64(),
                mttkrp_gflops: 0.0,
            });
        }

        if iter > 0 && fit_change < params.tol {
            break;
        }
        if let Some(max_secs) = params.max_secs {
            if start.elapsed().as_secs_f64() > max_secs {
                break;
            }
        }
    }

    // Fold the working weights back into the model, normalize, and order
    // components by weight.
    u.normalize(NormKind::TwoNorm)?;
    lambda *= u.weights();
    u.set_weights(lambda)?;
    u.arrange()?;

    if params.perf_every > 0 {
        perf.push(CpAlsPerfInfo {
            iter: num_iters,
            res_norm,
            fit,
            cum_time_secs: start.elapsed().as_secs_f64(),
            mttkrp_gflops: mttkrp_throughput(x.nnz(), nc, nd, mttkrp_secs, mttkrp_calls),
        });
    }

    Ok(CpAlsOutput {
        num_iters,
        res_norm,
        fit,
        perf,
    })
}

/// Residual norm `sqrt(||X||^2 + ||M||^2 - 2 <X, M>)`.
///
/// The sum can be slightly negative from roundoff when the model fits
/// almost exactly; anything below the empirical threshold indicates a
/// corrupted computation.
fn compute_res_norm(x_norm: Real, m_norm: Real, x_dot_m: Real) -> Result<Real, CpAlsError> {
    let d = x_norm * x_norm + m_norm * m_norm - 2.0 * x_dot_m;
    let small_neg_thresh = -(x_dot_m * MACHINE_EPSILON.sqrt() * 1e3);
    if d > Real::MIN_POSITIVE {
        Ok(d.sqrt())
    } else if d > small_neg_thresh {
        Ok(0.0)
    } else {
        Err(CpAlsError::NegativeResidualNorm(d))
    }
}

/// Average MTTKRP throughput in GFLOP/s, counting one flop per atomic
/// update on top of the Hadamard products.
fn mttkrp_throughput(nnz: usize, nc: usize, nd: usize, total_secs: f64, calls: usize) -> f64 {
    if calls == 0 || total_secs == 0.0 {
        return 0.0;
    }
    let flops = nnz as f64 * nc as f64 * (nd as f64 + 1.0);
    let avg = total_secs / calls as f64;
    flops / avg / (1024.0 * 1024.0 * 1024.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kruskal_sparse::{SpTensor, TensorLayout};
    use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

    fn random_tensor(seed: u64, sizes: &[usize], nnz: usize) -> SparseTensor {
        let mut rng = StdRng::seed_from_u64(seed);
        let tuples: Vec<Vec<usize>> = (0..nnz)
            .map(|_| sizes.iter().map(|&s| rng.random_range(0..s)).collect())
            .collect();
        let vals: Vec<Real> = (0..nnz).map(|_| rng.random_range(0.1..1.0)).collect();
        SparseTensor::with_layout(
            SpTensor::from_tuples(sizes.to_vec(), &tuples, vals).unwrap(),
            TensorLayout::Row,
        )
    }

    fn random_ktensor(seed: u64, sizes: &[usize], nc: usize) -> Ktensor {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut u = Ktensor::new(nc, sizes);
        for m in 0..sizes.len() {
            for v in u.factor_mut(m).as_mut_slice() {
                *v = rng.random_range(0.1..1.0);
            }
        }
        u
    }

    #[test]
    fn test_rejects_bad_tolerance() {
        let x = random_tensor(1, &[3, 3], 5);
        let mut u = random_ktensor(2, &[3, 3], 2);
        let params = CpAlsParams {
            tol: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            cp_als(&x, &mut u, &params),
            Err(CpAlsError::InvalidTolerance(_))
        ));
    }

    #[test]
    fn test_rejects_zero_max_iters() {
        let x = random_tensor(1, &[3, 3], 5);
        let mut u = random_ktensor(2, &[3, 3], 2);
        let params = CpAlsParams {
            max_iters: 0,
            ..Default::default()
        };
        assert!(matches!(
            cp_als(&x, &mut u, &params),
            Err(CpAlsError::InvalidMaxIters)
        ));
    }

    #[test]
    fn test_rejects_size_mismatch() {
        let x = random_tensor(1, &[3, 4], 5);
        let mut u = random_ktensor(2, &[3, 3], 2);
        assert!(matches!(
            cp_als(&x, &mut u, &CpAlsParams::default()),
            Err(CpAlsError::Core(CoreError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn test_zero_column_start_is_singular() {
        // A zero factor column makes the Gramians, and therefore the
        // normal equations, singular. This must fail loudly, not emit NaN.
        let x = random_tensor(3, &[4, 4, 4], 20);
        let mut u = random_ktensor(4, &[4, 4, 4], 2);
        for m in 0..3 {
            let nrows = u.factor(m).nrows();
            for i in 0..nrows {
                u.factor_mut(m).array_mut()[[i, 1]] = 0.0;
            }
        }

        let err = cp_als(&x, &mut u, &CpAlsParams::default()).unwrap_err();
        assert!(matches!(
            err,
            CpAlsError::Core(CoreError::SingularNormalEquations { .. })
        ));
    }

    #[test]
    fn test_time_budget_stops_after_one_iteration() {
        let x = random_tensor(5, &[6, 6, 6], 50);
        let mut u = random_ktensor(6, &[6, 6, 6], 3);
        let params = CpAlsParams {
            tol: 1e-12,
            max_iters: 50,
            max_secs: Some(0.0),
            ..Default::default()
        };
        let out = cp_als(&x, &mut u, &params).unwrap();
        assert_eq!(out.num_iters, 1);
    }

    #[test]
    fn test_output_is_normalized_and_arranged() {
        let x = random_tensor(7, &[5, 6, 7], 60);
        let mut u = random_ktensor(8, &[5, 6, 7], 3);
        let out = cp_als(&x, &mut u, &CpAlsParams::default()).unwrap();
        assert!(out.num_iters >= 1);

        for m in 0..3 {
            let norms = u.factor(m).col_norms(NormKind::TwoNorm, 0.0);
            for &n in norms.iter() {
                assert!((n - 1.0).abs() < 1e-10);
            }
        }
        for j in 0..u.ncomponents() - 1 {
            assert!(u.weights()[j] >= u.weights()[j + 1]);
        }
    }

    #[test]
    fn test_perf_records_initial_and_final() {
        let x = random_tensor(9, &[4, 5, 6], 40);
        let mut u = random_ktensor(10, &[4, 5, 6], 2);
        let params = CpAlsParams {
            max_iters: 5,
            tol: 1e-12,
            perf_every: 2,
            ..Default::default()
        };
        let out = cp_als(&x, &mut u, &params).unwrap();

        assert!(out.perf.len() >= 2);
        assert_eq!(out.perf[0].iter, 0);
        let last = out.perf.last().unwrap();
        assert_eq!(last.iter, out.num_iters);
        assert!(last.mttkrp_gflops > 0.0);
    }

    #[test]
    fn test_res_norm_small_negative_clamps_to_zero() {
        // d is tiny and negative but above the threshold.
        let res = compute_res_norm(1.0, 1.0, 1.0 + 1e-14).unwrap();
        assert_eq!(res, 0.0);
    }

    #[test]
    fn test_res_norm_large_negative_fails() {
        let err = compute_res_norm(1.0, 1.0, 2.0).unwrap_err();
        assert!(matches!(err, CpAlsError::NegativeResidualNorm(_)));
    }
}
