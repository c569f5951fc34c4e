//! COO (coordinate) sparse tensor storage.
//!
//! The coordinate format stores an N-way tensor as `nnz` subscript tuples
//! plus `nnz` values. Subscripts live in one flat row-major buffer
//! (`subs[i * ndims + d]`) so a nonzero's tuple is a contiguous slice.
//! Nonzero order is arbitrary; duplicate tuples are allowed and sum
//! through the scatter kernels.
//!
//! # Examples
//!
//! ```
//! use kruskal_sparse::SpTensor;
//!
//! // 2x2x2 tensor with three nonzeros.
//! let x = SpTensor::new(
//!     vec![2, 2, 2],
//!     vec![0, 0, 0, 1, 0, 1, 0, 1, 1],
//!     vec![1.0, 2.0, 3.0],
//! )
//! .unwrap();
//! assert_eq!(x.nnz(), 3);
//! assert_eq!(x.subscript(1, 2), 1);
//! ```

use crate::error::{SparseError, SparseResult};
use kruskal_core::Real;

/// Coordinate-format sparse tensor.
#[derive(Debug, Clone, PartialEq)]
pub struct SpTensor {
    sizes: Vec<usize>,
    subs: Vec<usize>,
    vals: Vec<Real>,
}

impl SpTensor {
    /// Create from mode sizes, a flat row-major subscript buffer of
    /// `nnz * ndims` entries, and `nnz` values.
    ///
    /// # Errors
    ///
    /// - `ShapeMismatch` if `sizes` is empty or contains a zero.
    /// - `LengthMismatch` if the subscript buffer length is not
    ///   `vals.len() * sizes.len()`.
    /// - `IndexOutOfRange` if any subscript reaches its mode size.
    pub fn new(sizes: Vec<usize>, subs: Vec<usize>, vals: Vec<Real>) -> SparseResult<Self> {
        if sizes.is_empty() {
            return Err(SparseError::ShapeMismatch(
                "tensor must have at least one mode".to_string(),
            ));
        }
        if sizes.contains(&0) {
            return Err(SparseError::ShapeMismatch(format!(
                "mode sizes must be positive, got {:?}",
                sizes
            )));
        }
        let nd = sizes.len();
        if subs.len() != vals.len() * nd {
            return Err(SparseError::LengthMismatch {
                subs: subs.len() / nd,
                vals: vals.len(),
            });
        }

        let tensor = Self { sizes, subs, vals };
        for i in 0..tensor.nnz() {
            for d in 0..nd {
                let s = tensor.subscript(i, d);
                if s >= tensor.sizes[d] {
                    return Err(SparseError::IndexOutOfRange {
                        nonzero: i,
                        mode: d,
                        subscript: s,
                        size: tensor.sizes[d],
                    });
                }
            }
        }
        Ok(tensor)
    }

    /// Create from per-nonzero subscript tuples.
    pub fn from_tuples(
        sizes: Vec<usize>,
        tuples: &[Vec<usize>],
        vals: Vec<Real>,
    ) -> SparseResult<Self> {
        let nd = sizes.len();
        for (i, t) in tuples.iter().enumerate() {
            if t.len() != nd {
                return Err(SparseError::ShapeMismatch(format!(
                    "nonzero {} has {} subscripts, expected {}",
                    i,
                    t.len(),
                    nd
                )));
            }
        }
        let mut subs = Vec::with_capacity(tuples.len() * nd);
        for t in tuples {
            subs.extend_from_slice(t);
        }
        Self::new(sizes, subs, vals)
    }

    /// Number of modes.
    pub fn ndims(&self) -> usize {
        self.sizes.len()
    }

    /// Number of stored nonzeros (duplicates counted).
    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    /// Size of mode `d`.
    pub fn size(&self, d: usize) -> usize {
        self.sizes[d]
    }

    /// All mode sizes.
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// Mode-`d` subscript of nonzero `i`.
    #[inline]
    pub fn subscript(&self, i: usize, d: usize) -> usize {
        self.subs[i * self.sizes.len() + d]
    }

    /// Full subscript tuple of nonzero `i`.
    #[inline]
    pub fn subs_row(&self, i: usize) -> &[usize] {
        let nd = self.sizes.len();
        &self.subs[i * nd..(i + 1) * nd]
    }

    /// Value of nonzero `i`.
    #[inline]
    pub fn value(&self, i: usize) -> Real {
        self.vals[i]
    }

    /// All values.
    pub fn values(&self) -> &[Real] {
        &self.vals
    }

    /// Frobenius norm over the stored nonzeros.
    pub fn norm(&self) -> Real {
        self.vals.iter().map(|v| v * v).sum::<Real>().sqrt()
    }

    /// Fraction of cells that carry a stored nonzero.
    pub fn density(&self) -> f64 {
        let total: usize = self.sizes.iter().product();
        self.nnz() as f64 / total as f64
    }

    /// No accelerators to build for plain COO.
    pub fn fill_complete(&mut self) {}
}
