//! Permuted COO: coordinate storage plus per-mode sort permutations.
//!
//! For each mode `d`, `perm[d]` reorders `0..nnz` so the mode-`d`
//! subscripts are non-decreasing. Iterating nonzeros through the
//! permutation makes runs of equal target rows contiguous, which is what
//! lets the segmented MTTKRP kernel trade most of its atomic adds for
//! plain ones.
//!
//! The permutations are built once (a stable sort, ties keeping nonzero
//! order, so the result is deterministic) and read-only afterwards.

use crate::coo::SpTensor;
use kruskal_core::Real;

#[cfg(feature = "parallel")]
use scirs2_core::parallel_ops::*;

/// COO tensor with per-mode sort permutations.
#[derive(Debug, Clone)]
pub struct SpTensorPerm {
    tensor: SpTensor,
    perm: Vec<Vec<usize>>,
}

impl SpTensorPerm {
    /// Take ownership of a COO tensor and build the permutations.
    pub fn from_coo(tensor: SpTensor) -> Self {
        let mut this = Self {
            tensor,
            perm: Vec::new(),
        };
        this.fill_complete();
        this
    }

    /// Build the per-mode permutations. Idempotent: once built the
    /// accelerators are never recomputed.
    pub fn fill_complete(&mut self) {
        if !self.perm.is_empty() {
            return;
        }
        self.perm = build_mode_perms(&self.tensor);
    }

    /// Index into nonzero storage of the `i`-th entry in mode-`d` order.
    #[inline]
    pub fn get_perm(&self, i: usize, d: usize) -> usize {
        self.perm[d][i]
    }

    /// The full permutation for mode `d`.
    pub fn perm(&self, d: usize) -> &[usize] {
        &self.perm[d]
    }

    /// The underlying coordinate data.
    pub fn base(&self) -> &SpTensor {
        &self.tensor
    }

    pub fn ndims(&self) -> usize {
        self.tensor.ndims()
    }

    pub fn nnz(&self) -> usize {
        self.tensor.nnz()
    }

    pub fn size(&self, d: usize) -> usize {
        self.tensor.size(d)
    }

    pub fn sizes(&self) -> &[usize] {
        self.tensor.sizes()
    }

    #[inline]
    pub fn subscript(&self, i: usize, d: usize) -> usize {
        self.tensor.subscript(i, d)
    }

    #[inline]
    pub fn value(&self, i: usize) -> Real {
        self.tensor.value(i)
    }

    pub fn norm(&self) -> Real {
        self.tensor.norm()
    }
}

/// One stable sort of `0..nnz` per mode, keyed on that mode's subscript.
pub(crate) fn build_mode_perms(tensor: &SpTensor) -> Vec<Vec<usize>> {
    let nnz = tensor.nnz();
    (0..tensor.ndims())
        .map(|d| {
            let mut perm: Vec<usize> = (0..nnz).collect();
            #[cfg(feature = "parallel")]
            perm.par_sort_by_key(|&i| tensor.subscript(i, d));
            #[cfg(not(feature = "parallel"))]
            perm.sort_by_key(|&i| tensor.subscript(i, d));
            perm
        })
        .collect()
}
