//! MTTKRP throughput comparison across the three storage variants.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kruskal_core::{FactorMatrix, Ktensor};
use kruskal_kernels::mttkrp;
use kruskal_sparse::{SpTensor, SparseTensor, TensorLayout};
use scirs2_core::random::{rngs::StdRng, Rng, SeedableRng};

fn synthetic_case(sizes: &[usize], nnz: usize, nc: usize) -> (SpTensor, Ktensor) {
    let mut rng = StdRng::seed_from_u64(20240131);

    let mut subs = Vec::with_capacity(nnz * sizes.len());
    let mut vals = Vec::with_capacity(nnz);
    for _ in 0..nnz {
        for &s in sizes {
            subs.push(rng.random_range(0..s));
        }
        vals.push(rng.random_range(-1.0..1.0));
    }
    let x = SpTensor::new(sizes.to_vec(), subs, vals).unwrap();

    let mut u = Ktensor::new(nc, sizes);
    for m in 0..sizes.len() {
        for v in u.factor_mut(m).as_mut_slice() {
            *v = rng.random_range(-1.0..1.0);
        }
    }
    (x, u)
}

fn bench_mttkrp_variants(c: &mut Criterion) {
    let sizes = [60, 70, 80];
    let nnz = 100_000;
    let nc = 16;
    let (coo, u) = synthetic_case(&sizes, nnz, nc);

    let mut group = c.benchmark_group("mttkrp");
    for layout in [TensorLayout::Coo, TensorLayout::Perm, TensorLayout::Row] {
        let x = SparseTensor::with_layout(coo.clone(), layout);
        let mut v = FactorMatrix::zeros(sizes[0], nc);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", layout)),
            &x,
            |b, x| {
                b.iter(|| {
                    mttkrp(black_box(x), black_box(&u), 0, &mut v).unwrap();
                    black_box(v.array()[[0, 0]])
                })
            },
        );
    }
    group.finish();
}

fn bench_mttkrp_rank_ladder(c: &mut Criterion) {
    let sizes = [40, 40, 40];
    let nnz = 50_000;

    let mut group = c.benchmark_group("mttkrp_rank");
    for nc in [2usize, 8, 16, 32] {
        let (coo, u) = synthetic_case(&sizes, nnz, nc);
        let x = SparseTensor::with_layout(coo, TensorLayout::Row);
        let mut v = FactorMatrix::zeros(sizes[0], nc);
        group.bench_with_input(BenchmarkId::from_parameter(nc), &nc, |b, _| {
            b.iter(|| {
                mttkrp(black_box(&x), black_box(&u), 0, &mut v).unwrap();
                black_box(v.array()[[0, 0]])
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_mttkrp_variants, bench_mttkrp_rank_ladder);
criterion_main!(benches);
