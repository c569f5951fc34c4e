//! Compare the three MTTKRP storage variants on one synthetic tensor.
//!
//! Run with:
//! ```bash
//! cargo run --example mttkrp_variants --release
//! ```

use kruskal_core::{FactorMatrix, Ktensor, Real};
use kruskal_kernels::mttkrp;
use kruskal_sparse::{SpTensor, SparseTensor, TensorLayout};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};
use std::time::Instant;

fn main() {
    let sizes = [100, 120, 140];
    let nnz = 200_000;
    let nc = 16;
    let iters = 5;

    let mut rng = StdRng::seed_from_u64(2024);
    let tuples: Vec<Vec<usize>> = (0..nnz)
        .map(|_| sizes.iter().map(|&s| rng.random_range(0..s)).collect())
        .collect();
    let vals: Vec<Real> = (0..nnz).map(|_| rng.random_range(-1.0..1.0)).collect();
    let coo = SpTensor::from_tuples(sizes.to_vec(), &tuples, vals).unwrap();

    let mut u = Ktensor::new(nc, &sizes);
    for m in 0..sizes.len() {
        for v in u.factor_mut(m).as_mut_slice() {
            *v = rng.random_range(-1.0..1.0);
        }
    }

    println!(
        "MTTKRP on {:?}, nnz = {}, rank = {}, {} sweeps per variant",
        sizes, nnz, nc, iters
    );

    let flops = nnz as f64 * nc as f64 * (sizes.len() as f64 + 1.0);
    for layout in [TensorLayout::Coo, TensorLayout::Perm, TensorLayout::Row] {
        let t0 = Instant::now();
        let x = SparseTensor::with_layout(coo.clone(), layout);
        let build = t0.elapsed().as_secs_f64();

        let mut v = FactorMatrix::zeros(sizes[0], nc);
        // Warm-up.
        mttkrp(&x, &u, 0, &mut v).unwrap();

        let t0 = Instant::now();
        for _ in 0..iters {
            mttkrp(&x, &u, 0, &mut v).unwrap();
        }
        let avg = t0.elapsed().as_secs_f64() / iters as f64;

        println!(
            "  {:?}: build {:.3} s, mttkrp {:.4} s/sweep, {:.2} GFLOP/s",
            layout,
            build,
            avg,
            flops / avg / (1024.0 * 1024.0 * 1024.0)
        );
    }
}
