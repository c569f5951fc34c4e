//! K-tensor: a rank-R canonical polyadic factorization.
//!
//! An N-way K-tensor is an ordered sequence of N factor matrices sharing
//! the same column count R, plus a length-R weight vector. The model value
//! at multi-index `(i_0, ..., i_{N-1})` is
//! `sum_j w[j] * prod_m U_m[i_m, j]`.

use crate::error::{CoreError, CoreResult};
use crate::facmatrix::FactorMatrix;
use crate::types::{NormKind, Real, MACHINE_EPSILON};
use scirs2_core::ndarray_ext::{Array1, Array2};
use std::cmp::Ordering;

/// Weighted collection of factor matrices, one per tensor mode.
#[derive(Debug, Clone)]
pub struct Ktensor {
    weights: Array1<Real>,
    factors: Vec<FactorMatrix>,
}

impl Ktensor {
    /// Create a K-tensor of zeros with `ncomponents` columns per factor
    /// and unit weights.
    pub fn new(ncomponents: usize, sizes: &[usize]) -> Self {
        let factors = sizes
            .iter()
            .map(|&m| FactorMatrix::zeros(m, ncomponents))
            .collect();
        Self {
            weights: Array1::ones(ncomponents),
            factors,
        }
    }

    /// Assemble from existing weights and factors, validating consistency.
    pub fn from_parts(weights: Array1<Real>, factors: Vec<FactorMatrix>) -> CoreResult<Self> {
        let k = Self { weights, factors };
        k.check_consistent()?;
        Ok(k)
    }

    pub fn ndims(&self) -> usize {
        self.factors.len()
    }

    pub fn ncomponents(&self) -> usize {
        self.weights.len()
    }

    pub fn factor(&self, mode: usize) -> &FactorMatrix {
        &self.factors[mode]
    }

    pub fn factor_mut(&mut self, mode: usize) -> &mut FactorMatrix {
        &mut self.factors[mode]
    }

    pub fn factors(&self) -> &[FactorMatrix] {
        &self.factors
    }

    pub fn weights(&self) -> &Array1<Real> {
        &self.weights
    }

    /// Replace the weight vector; its length must equal the rank.
    pub fn set_weights(&mut self, weights: Array1<Real>) -> CoreResult<()> {
        if weights.len() != self.ncomponents() {
            return Err(CoreError::ShapeMismatch {
                op: "Ktensor::set_weights",
                what: "weight vector".to_string(),
                expected: vec![self.ncomponents()],
                actual: vec![weights.len()],
            });
        }
        self.weights = weights;
        Ok(())
    }

    /// All factors share the rank and the weight vector matches it.
    pub fn is_consistent(&self) -> bool {
        self.check_consistent().is_ok()
    }

    pub fn check_consistent(&self) -> CoreResult<()> {
        let rank = self.ncomponents();
        for (m, factor) in self.factors.iter().enumerate() {
            if factor.ncols() != rank {
                return Err(CoreError::RankMismatch {
                    factor: m,
                    expected: rank,
                    actual: factor.ncols(),
                });
            }
        }
        Ok(())
    }

    /// Factor row counts match the given mode sizes.
    pub fn check_sizes(&self, sizes: &[usize]) -> CoreResult<()> {
        let actual: Vec<usize> = self.factors.iter().map(|f| f.nrows()).collect();
        if actual != sizes {
            return Err(CoreError::ShapeMismatch {
                op: "Ktensor::check_sizes",
                what: "factor row counts".to_string(),
                expected: sizes.to_vec(),
                actual,
            });
        }
        Ok(())
    }

    /// Absorb the weights into the factor for `mode` and reset them to one.
    pub fn distribute(&mut self, mode: usize) -> CoreResult<()> {
        let weights = self.weights.clone();
        self.factors[mode].col_scale(&weights, false)?;
        self.weights.fill(1.0);
        Ok(())
    }

    /// Normalize every factor column to unit norm, absorbing the norms
    /// into the weights. Columns with vanishing norm are left untouched.
    pub fn normalize(&mut self, kind: NormKind) -> CoreResult<()> {
        let rank = self.ncomponents();
        for factor in &mut self.factors {
            let norms = factor.col_norms(kind, 0.0);
            let mut scale = Array1::<Real>::ones(rank);
            for j in 0..rank {
                if norms[j] > MACHINE_EPSILON {
                    scale[j] = norms[j];
                }
            }
            factor.col_scale(&scale, true)?;
            self.weights *= &scale;
        }
        Ok(())
    }

    /// Reorder components by descending weight. The sort is stable, so
    /// equal weights keep their original relative order.
    pub fn arrange(&mut self) -> CoreResult<()> {
        let rank = self.ncomponents();
        let mut order: Vec<usize> = (0..rank).collect();
        order.sort_by(|&a, &b| {
            self.weights[b]
                .partial_cmp(&self.weights[a])
                .unwrap_or(Ordering::Equal)
        });

        let old_weights = self.weights.clone();
        for (j, &p) in order.iter().enumerate() {
            self.weights[j] = old_weights[p];
        }
        for factor in &mut self.factors {
            factor.permute_columns(&order)?;
        }
        Ok(())
    }

    /// Squared Frobenius norm of the model, in closed form:
    /// `sum_{r,s} w_r w_s prod_m <U_m[:,r], U_m[:,s]>`.
    pub fn norm_fsq(&self) -> Real {
        let rank = self.ncomponents();
        let mut acc = Array2::<Real>::ones((rank, rank));
        for factor in &self.factors {
            acc *= &factor.gramian();
        }

        let mut total = 0.0;
        for r in 0..rank {
            for s in 0..rank {
                total += self.weights[r] * self.weights[s] * acc[[r, s]];
            }
        }
        total.abs()
    }

    /// Model value at one multi-index.
    pub fn entry(&self, subs: &[usize]) -> Real {
        let rank = self.ncomponents();
        let mut total = 0.0;
        for j in 0..rank {
            let mut term = self.weights[j];
            for (m, &i) in subs.iter().enumerate() {
                term *= self.factors[m].array()[[i, j]];
            }
            total += term;
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::array;

    fn sample_ktensor() -> Ktensor {
        let u0 = FactorMatrix::from_array(array![[1.0, 0.0], [0.0, 1.0]]);
        let u1 = FactorMatrix::from_array(array![[1.0, 1.0], [2.0, 0.0], [0.0, 3.0]]);
        Ktensor::from_parts(array![2.0, 0.5], vec![u0, u1]).unwrap()
    }

    #[test]
    fn test_new_is_consistent() {
        let k = Ktensor::new(3, &[4, 5, 6]);
        assert_eq!(k.ndims(), 3);
        assert_eq!(k.ncomponents(), 3);
        assert!(k.is_consistent());
        assert!(k.check_sizes(&[4, 5, 6]).is_ok());
    }

    #[test]
    fn test_from_parts_rejects_rank_mismatch() {
        let u0 = FactorMatrix::zeros(2, 2);
        let u1 = FactorMatrix::zeros(3, 3);
        let err = Ktensor::from_parts(array![1.0, 1.0], vec![u0, u1]).unwrap_err();
        assert!(matches!(err, CoreError::RankMismatch { factor: 1, .. }));
    }

    #[test]
    fn test_entry() {
        let k = sample_ktensor();
        // entry(0, 1) = 2*1*2 + 0.5*0*0 = 4
        assert!((k.entry(&[0, 1]) - 4.0).abs() < 1e-12);
        // entry(1, 2) = 2*0*0 + 0.5*1*3 = 1.5
        assert!((k.entry(&[1, 2]) - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_distribute_resets_weights() {
        let mut k = sample_ktensor();
        let before = k.entry(&[0, 0]);
        k.distribute(0).unwrap();
        assert!(k.weights().iter().all(|&w| w == 1.0));
        assert!((k.entry(&[0, 0]) - before).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_preserves_model() {
        let mut k = sample_ktensor();
        let before = k.entry(&[1, 1]);
        k.normalize(NormKind::TwoNorm).unwrap();
        assert!((k.entry(&[1, 1]) - before).abs() < 1e-12);

        // Every factor column should now have unit L2 norm.
        for factor in k.factors() {
            let norms = factor.col_norms(NormKind::TwoNorm, 0.0);
            for &n in norms.iter() {
                assert!((n - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_arrange_sorts_descending() {
        let u0 = FactorMatrix::from_array(array![[1.0, 2.0, 3.0]]);
        let u1 = FactorMatrix::from_array(array![[4.0, 5.0, 6.0]]);
        let mut k = Ktensor::from_parts(array![1.0, 3.0, 2.0], vec![u0, u1]).unwrap();

        let before = k.entry(&[0, 0]);
        k.arrange().unwrap();

        assert_eq!(k.weights()[0], 3.0);
        assert_eq!(k.weights()[1], 2.0);
        assert_eq!(k.weights()[2], 1.0);
        // Columns moved with their weights.
        assert_eq!(k.factor(0).row_slice(0), &[2.0, 3.0, 1.0]);
        assert!((k.entry(&[0, 0]) - before).abs() < 1e-12);
    }

    #[test]
    fn test_norm_fsq_matches_dense() {
        let k = sample_ktensor();
        // Dense norm: sum of squared model entries.
        let mut dense = 0.0;
        for i in 0..2 {
            for j in 0..3 {
                let v = k.entry(&[i, j]);
                dense += v * v;
            }
        }
        assert!((k.norm_fsq() - dense).abs() < 1e-10);
    }
}
