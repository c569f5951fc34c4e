//! Row-indexed COO: permuted storage plus per-mode row pointers.
//!
//! On top of the mode permutations, `rowptr[d]` is a prefix-sum array of
//! length `size(d) + 1` such that the nonzeros whose mode-`d` subscript
//! equals `r` are exactly `perm[d][rowptr[d][r] .. rowptr[d][r+1]]`.
//! This gives the MTTKRP row kernel an exclusive nonzero range per output
//! row, eliminating atomics entirely.

use crate::coo::SpTensor;
use crate::perm::build_mode_perms;
use kruskal_core::Real;

/// COO tensor with per-mode sort permutations and row-pointer arrays.
#[derive(Debug, Clone)]
pub struct SpTensorRow {
    tensor: SpTensor,
    perm: Vec<Vec<usize>>,
    rowptr: Vec<Vec<usize>>,
}

impl SpTensorRow {
    /// Take ownership of a COO tensor and build both accelerators.
    pub fn from_coo(tensor: SpTensor) -> Self {
        let mut this = Self {
            tensor,
            perm: Vec::new(),
            rowptr: Vec::new(),
        };
        this.fill_complete();
        this
    }

    /// Build the permutations and row pointers. Idempotent.
    pub fn fill_complete(&mut self) {
        if !self.perm.is_empty() {
            return;
        }
        self.perm = build_mode_perms(&self.tensor);
        self.rowptr = build_rowptrs(&self.tensor, &self.perm);
    }

    #[inline]
    pub fn get_perm(&self, i: usize, d: usize) -> usize {
        self.perm[d][i]
    }

    /// Start of row `r`'s range in mode-`d` permuted order. Passing
    /// `r = size(d)` yields `nnz`, so `get_perm_row_begin(r + 1, d)` is
    /// always the exclusive end of row `r`.
    #[inline]
    pub fn get_perm_row_begin(&self, r: usize, d: usize) -> usize {
        self.rowptr[d][r]
    }

    pub fn perm(&self, d: usize) -> &[usize] {
        &self.perm[d]
    }

    pub fn rowptr(&self, d: usize) -> &[usize] {
        &self.rowptr[d]
    }

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

/// Prefix-sum row pointers from the sorted permutations.
///
/// Edge policy: rows below the smallest present subscript map to 0, rows
/// above the largest map to `nnz`, and an empty interior row `r` gets
/// `rowptr[r + 1] == rowptr[r]`.
fn build_rowptrs(tensor: &SpTensor, perm: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let nnz = tensor.nnz();
    (0..tensor.ndims())
        .map(|d| {
            let sz = tensor.size(d);
            let mut rowptr = vec![0usize; sz + 1];
            if nnz == 0 {
                return rowptr;
            }

            let first = tensor.subscript(perm[d][0], d);
            for slot in rowptr.iter_mut().take(first + 1) {
                *slot = 0;
            }
            for i in 1..nnz {
                let s = tensor.subscript(perm[d][i], d);
                let prev = tensor.subscript(perm[d][i - 1], d);
                if s != prev {
                    for slot in rowptr.iter_mut().take(s + 1).skip(prev + 1) {
                        *slot = i;
                    }
                }
            }
            let last = tensor.subscript(perm[d][nnz - 1], d);
            for slot in rowptr.iter_mut().skip(last + 1) {
                *slot = nnz;
            }

            rowptr
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SpTensor {
        SpTensor::from_tuples(
            vec![4, 3],
            &[vec![2, 0], vec![0, 2], vec![2, 1], vec![0, 0], vec![2, 2]],
            vec![1.0, 2.0, 3.0, 4.0, 5.0],
        )
        .unwrap()
    }

    #[test]
    fn test_rowptr_bounds() {
        let x = SpTensorRow::from_coo(sample());
        for d in 0..x.ndims() {
            let rp = x.rowptr(d);
            assert_eq!(rp.len(), x.size(d) + 1);
            assert_eq!(rp[0], 0);
            assert_eq!(rp[x.size(d)], x.nnz());
            for r in 0..x.size(d) {
                assert!(rp[r] <= rp[r + 1]);
            }
        }
    }

    #[test]
    fn test_rowptr_ranges_match_rows() {
        let x = SpTensorRow::from_coo(sample());
        for d in 0..x.ndims() {
            for r in 0..x.size(d) {
                let begin = x.get_perm_row_begin(r, d);
                let end = x.get_perm_row_begin(r + 1, d);
                // Every nonzero in the range has subscript r...
                for i in begin..end {
                    assert_eq!(x.subscript(x.get_perm(i, d), d), r);
                }
                // ...and the count matches a direct scan.
                let expected = (0..x.nnz()).filter(|&k| x.subscript(k, d) == r).count();
                assert_eq!(end - begin, expected);
            }
        }
    }

    #[test]
    fn test_rowptr_empty_rows() {
        // Mode 0 has nonzeros only in rows 0 and 2 of 4.
        let x = SpTensorRow::from_coo(sample());
        let rp = x.rowptr(0);
        assert_eq!(rp, &[0, 2, 2, 5, 5]);
    }

    #[test]
    fn test_rowptr_leading_trailing_empty() {
        // Single nonzero in the middle row; leading rows 0, trailing nnz.
        let x = SpTensorRow::from_coo(
            SpTensor::from_tuples(vec![5], &[vec![2]], vec![1.0]).unwrap(),
        );
        assert_eq!(x.rowptr(0), &[0, 0, 0, 1, 1, 1]);
    }

    #[test]
    fn test_fill_complete_idempotent() {
        let mut x = SpTensorRow::from_coo(sample());
        let perm_before: Vec<Vec<usize>> = (0..x.ndims()).map(|d| x.perm(d).to_vec()).collect();
        let rp_before: Vec<Vec<usize>> = (0..x.ndims()).map(|d| x.rowptr(d).to_vec()).collect();
        x.fill_complete();
        for d in 0..x.ndims() {
            assert_eq!(x.perm(d), &perm_before[d][..]);
            assert_eq!(x.rowptr(d), &rp_before[d][..]);
        }
    }

    #[test]
    fn test_empty_tensor() {
        let x = SpTensorRow::from_coo(SpTensor::new(vec![3, 2], vec![], vec![]).unwrap());
        assert_eq!(x.rowptr(0), &[0, 0, 0, 0]);
        assert_eq!(x.rowptr(1), &[0, 0, 0]);
    }
}
