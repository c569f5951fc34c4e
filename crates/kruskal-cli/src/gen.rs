//! Seeded synthetic test-set generation.
//!
//! A random K-tensor defines a probability distribution over cells: pick
//! a component by weight, then one row per mode from that component's
//! column distribution. Sampling `max_nnz` cells and counting hits yields
//! a sparse tensor whose large entries line up with the model's large
//! entries, which is what makes the MTTKRP benchmark representative of a
//! CP-ALS workload.

use anyhow::{ensure, Result};
use kruskal_core::{Ktensor, Real};
use kruskal_sparse::SpTensor;
use scirs2_core::random::{rngs::StdRng, Rng};
use std::collections::BTreeMap;

/// Uniform [0, 1) K-tensor with uniform weights.
pub fn random_ktensor(rng: &mut StdRng, sizes: &[usize], nc: usize) -> Ktensor {
    let mut u = Ktensor::new(nc, sizes);
    for m in 0..sizes.len() {
        for v in u.factor_mut(m).as_mut_slice() {
            *v = rng.random::<f64>();
        }
    }
    u
}

/// Cumulative distribution over `0..n` built from non-negative masses.
struct DiscreteCdf {
    cum: Vec<Real>,
}

impl DiscreteCdf {
    fn new(masses: impl Iterator<Item = Real>) -> Result<Self> {
        let mut cum = Vec::new();
        let mut total = 0.0;
        for m in masses {
            total += m.abs();
            cum.push(total);
        }
        ensure!(total > 0.0, "cannot sample from an all-zero distribution");
        for c in &mut cum {
            *c /= total;
        }
        Ok(Self { cum })
    }

    fn sample(&self, rng: &mut StdRng) -> usize {
        let r = rng.random::<f64>();
        self.cum
            .partition_point(|&c| c <= r)
            .min(self.cum.len() - 1)
    }
}

/// Sample up to `max_nnz` cells from the K-tensor's distribution; the
/// value of each resulting nonzero is its hit count. Collisions mean the
/// actual nnz can land below `max_nnz`.
pub fn sample_sptensor(rng: &mut StdRng, truth: &Ktensor, max_nnz: usize) -> Result<SpTensor> {
    let nd = truth.ndims();
    let nc = truth.ncomponents();
    let sizes: Vec<usize> = truth.factors().iter().map(|f| f.nrows()).collect();

    let weight_cdf = DiscreteCdf::new(truth.weights().iter().copied())?;
    let mut column_cdfs: Vec<Vec<DiscreteCdf>> = Vec::with_capacity(nd);
    for m in 0..nd {
        let factor = truth.factor(m);
        let mut per_component = Vec::with_capacity(nc);
        for j in 0..nc {
            per_component.push(DiscreteCdf::new(
                (0..factor.nrows()).map(|i| factor.array()[[i, j]]),
            )?);
        }
        column_cdfs.push(per_component);
    }

    let mut counts: BTreeMap<Vec<usize>, Real> = BTreeMap::new();
    for _ in 0..max_nnz {
        let j = weight_cdf.sample(rng);
        let cell: Vec<usize> = (0..nd).map(|m| column_cdfs[m][j].sample(rng)).collect();
        *counts.entry(cell).or_insert(0.0) += 1.0;
    }

    let tuples: Vec<Vec<usize>> = counts.keys().cloned().collect();
    let vals: Vec<Real> = counts.values().copied().collect();
    Ok(SpTensor::from_tuples(sizes, &tuples, vals)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::random::SeedableRng;

    #[test]
    fn test_sample_respects_bounds() {
        let mut rng = StdRng::seed_from_u64(99);
        let truth = random_ktensor(&mut rng, &[5, 6, 7], 3);
        let x = sample_sptensor(&mut rng, &truth, 500).unwrap();

        assert!(x.nnz() <= 500);
        assert!(x.nnz() > 0);
        assert_eq!(x.sizes(), &[5, 6, 7]);
        // Counts are positive and sum to the number of draws.
        let total: Real = x.values().iter().sum();
        assert_eq!(total, 500.0);
    }

    #[test]
    fn test_sample_is_deterministic_per_seed() {
        let mut rng_a = StdRng::seed_from_u64(7);
        let truth_a = random_ktensor(&mut rng_a, &[4, 4], 2);
        let xa = sample_sptensor(&mut rng_a, &truth_a, 100).unwrap();

        let mut rng_b = StdRng::seed_from_u64(7);
        let truth_b = random_ktensor(&mut rng_b, &[4, 4], 2);
        let xb = sample_sptensor(&mut rng_b, &truth_b, 100).unwrap();

        assert_eq!(xa.nnz(), xb.nnz());
        assert_eq!(xa.values(), xb.values());
    }

    #[test]
    fn test_cdf_rejects_all_zero() {
        assert!(DiscreteCdf::new([0.0, 0.0].into_iter()).is_err());
    }
}
