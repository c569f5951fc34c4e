//! MTTKRP performance driver.
//!
//! Reads a sparse tensor from a text file (or generates a synthetic one
//! from a seeded random K-tensor), builds the requested storage variant,
//! then times repeated MTTKRP sweeps over every mode and reports
//! per-mode throughput. `--check` validates the chosen variant against
//! the plain COO kernel.

mod gen;

use anyhow::{bail, Context, Result};
use clap::Parser;
use kruskal_core::{FactorMatrix, Ktensor, MACHINE_EPSILON};
use kruskal_kernels::mttkrp;
use kruskal_sparse::{io, SpTensor, SparseTensor, TensorLayout};
use scirs2_core::random::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use std::time::Instant;

/// Mode-size list, accepted as `30,40,50` or the bracketed `[30,40,50]`.
#[derive(Debug, Clone)]
struct Dims(Vec<usize>);

fn parse_dims(s: &str) -> Result<Dims, String> {
    let trimmed = s.trim().trim_start_matches('[').trim_end_matches(']');
    trimmed
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<usize>()
                .map_err(|_| format!("bad dimension '{}'", t))
        })
        .collect::<Result<Vec<usize>, String>>()
        .map(Dims)
}

#[derive(Parser, Debug)]
#[command(
    name = "kruskal-mttkrp",
    about = "Benchmark sparse MTTKRP across storage variants",
    version
)]
struct Args {
    /// Sparse tensor file to read; omit to generate synthetic data.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Subscript offset of headerless input files.
    #[arg(long = "index_base", default_value_t = 0)]
    index_base: usize,

    /// Read the input through a gzip filter.
    #[arg(long)]
    gz: bool,

    /// Mode sizes of the generated tensor.
    #[arg(long, value_parser = parse_dims, default_value = "[30,40,50]")]
    dims: Dims,

    /// Maximum number of generated nonzeros.
    #[arg(long, default_value_t = 1_000_000)]
    nnz: usize,

    /// Number of components (rank).
    #[arg(long, default_value_t = 32)]
    nc: usize,

    /// Timed MTTKRP sweeps over all modes.
    #[arg(long, default_value_t = 10)]
    iters: usize,

    /// Seed for the synthetic K-tensor and input factors.
    #[arg(long, default_value_t = 12345)]
    seed: u64,

    /// Validate the chosen variant against the COO kernel (0|1).
    #[arg(long, default_value_t = 0)]
    check: usize,

    /// Storage variant: kokkos (plain COO), perm, or row.
    #[arg(long, default_value = "row")]
    tensor: String,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("*** {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let layout: TensorLayout = args
        .tensor
        .parse()
        .with_context(|| format!("bad --tensor value '{}'", args.tensor))?;

    let mut rng = StdRng::seed_from_u64(args.seed);

    let coo = match &args.input {
        Some(path) => {
            let t0 = Instant::now();
            let x = io::import_sptensor(path, args.index_base, args.gz)
                .with_context(|| format!("cannot import '{}'", path.display()))?;
            println!("Data import took {:6.3} seconds", t0.elapsed().as_secs_f64());
            x
        }
        None => {
            println!(
                "Generating a random Ktensor/Sptensor pair: dims = {:?}, nc = {}, max nnz = {}",
                args.dims.0, args.nc, args.nnz
            );
            let truth = gen::random_ktensor(&mut rng, &args.dims.0, args.nc);
            let t0 = Instant::now();
            let x = gen::sample_sptensor(&mut rng, &truth, args.nnz)?;
            println!(
                "  (data generation took {:6.3} seconds, actual nnz = {})",
                t0.elapsed().as_secs_f64(),
                x.nnz()
            );
            x
        }
    };

    let sizes = coo.sizes().to_vec();
    let nd = sizes.len();

    // Random input K-tensor for the product side.
    let input = gen::random_ktensor(&mut rng, &sizes, args.nc);

    // Timed variant construction (permutation + rowptr builds).
    let coo_copy = if args.check != 0 { Some(coo.clone()) } else { None };
    let t0 = Instant::now();
    let x = SparseTensor::with_layout(coo, layout);
    println!(
        "  (fill_complete took {:6.3} seconds)",
        t0.elapsed().as_secs_f64()
    );

    let mut results: Vec<FactorMatrix> = sizes
        .iter()
        .map(|&m| FactorMatrix::zeros(m, args.nc))
        .collect();

    // Warm-up sweep so first-touch costs stay out of the timings.
    for n in 0..nd {
        mttkrp(&x, &input, n, &mut results[n])?;
    }

    println!("Performing {} iterations of MTTKRP", args.iters);
    let mut mode_secs = vec![0.0f64; nd];
    for _ in 0..args.iters {
        for n in 0..nd {
            let t0 = Instant::now();
            mttkrp(&x, &input, n, &mut results[n])?;
            mode_secs[n] += t0.elapsed().as_secs_f64();
        }
    }

    // One flop per atomic update on top of the Hadamard products.
    let flops = x.nnz() as f64 * args.nc as f64 * (nd as f64 + 1.0);
    println!("MTTKRP performance ({:?} variant):", x.layout());
    let mut total = 0.0;
    for n in 0..nd {
        let avg = mode_secs[n] / args.iters as f64;
        total += avg;
        println!(
            "  mode {}: {:.6} seconds, {:.3} GFLOP/s",
            n,
            avg,
            flops / avg / (1024.0 * 1024.0 * 1024.0)
        );
    }
    println!(
        "  total: {:.6} seconds, {:.3} GFLOP/s",
        total,
        nd as f64 * flops / total / (1024.0 * 1024.0 * 1024.0)
    );

    if let Some(coo) = coo_copy {
        check_against_coo(&coo, &input, &results)?;
        println!("Check passed: variant agrees with the COO kernel");
    }

    Ok(())
}

/// Frobenius-norm comparison of each mode's result against the plain COO
/// kernel, within the summation-order bound.
fn check_against_coo(coo: &SpTensor, input: &Ktensor, results: &[FactorMatrix]) -> Result<()> {
    let reference = SparseTensor::with_layout(coo.clone(), TensorLayout::Coo);
    for (n, got) in results.iter().enumerate() {
        let mut expected = FactorMatrix::zeros(got.nrows(), got.ncols());
        mttkrp(&reference, input, n, &mut expected)?;

        let mut diff_sq = 0.0;
        let mut norm_sq = 0.0;
        for (a, b) in expected.as_slice().iter().zip(got.as_slice()) {
            diff_sq += (a - b) * (a - b);
            norm_sq += a * a;
        }
        let rel = diff_sq.sqrt() / norm_sq.sqrt().max(MACHINE_EPSILON);
        if rel > 1e3 * MACHINE_EPSILON {
            bail!("mode {} check failed: relative error {:e}", n, rel);
        }
    }
    Ok(())
}
