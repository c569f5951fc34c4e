//! Fit a CP model to a synthetic low-rank sparse tensor.
//!
//! Run with:
//! ```bash
//! cargo run --example cp_als_synthetic --release
//! ```

use kruskal_core::{Ktensor, Real};
use kruskal_decomp::{cp_als, CpAlsParams};
use kruskal_sparse::{SpTensor, SparseTensor, TensorLayout};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

fn random_ktensor(rng: &mut StdRng, sizes: &[usize], nc: usize) -> Ktensor {
    let mut u = Ktensor::new(nc, sizes);
    for m in 0..sizes.len() {
        for v in u.factor_mut(m).as_mut_slice() {
            *v = rng.random_range(0.1..1.0);
        }
    }
    u
}

fn main() {
    let sizes = [30, 40, 50];
    let rank = 5;
    let mut rng = StdRng::seed_from_u64(1);

    // Ground-truth model, evaluated on a random subset of cells.
    let truth = random_ktensor(&mut rng, &sizes, rank);
    let nnz = 20_000;
    let tuples: Vec<Vec<usize>> = (0..nnz)
        .map(|_| sizes.iter().map(|&s| rng.random_range(0..s)).collect())
        .collect();
    let vals: Vec<Real> = tuples.iter().map(|t| truth.entry(t)).collect();
    let x = SpTensor::from_tuples(sizes.to_vec(), &tuples, vals).unwrap();
    println!(
        "Synthetic tensor: {:?}, nnz = {} (density {:.3}%)",
        x.sizes(),
        x.nnz(),
        100.0 * x.density()
    );

    let x = SparseTensor::with_layout(x, TensorLayout::Row);

    let mut u = random_ktensor(&mut rng, &sizes, rank);
    let params = CpAlsParams {
        tol: 1e-8,
        max_iters: 200,
        print_every: 10,
        perf_every: 10,
        ..Default::default()
    };

    let out = cp_als(&x, &mut u, &params).unwrap();

    println!();
    println!(
        "CP-ALS finished: {} iterations, fit = {:.8}, residual = {:.3e}",
        out.num_iters, out.fit, out.res_norm
    );
    println!("Component weights: {:?}", u.weights().to_vec());
    if let Some(last) = out.perf.last() {
        println!(
            "MTTKRP throughput: {:.2} GFLOP/s over {:.3} s total",
            last.mttkrp_gflops, last.cum_time_secs
        );
    }
}
