//! Dense factor matrix for CP factorizations.
//!
//! A factor matrix holds one mode of a K-tensor: `m` rows (the mode size)
//! by `R` columns (the rank), row-major. The row-major invariant matters:
//! the sparse kernels read whole rows as contiguous slices.

use crate::error::{CoreError, CoreResult};
use crate::linalg::solve_spd;
use crate::types::{NormKind, Real};
use scirs2_core::ndarray_ext::{Array1, Array2};

/// Dense `m x R` matrix of reals in row-major layout.
#[derive(Debug, Clone, PartialEq)]
pub struct FactorMatrix {
    data: Array2<Real>,
}

impl FactorMatrix {
    /// Create an `nrows x ncols` matrix of zeros.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: Array2::zeros((nrows, ncols)),
        }
    }

    /// Wrap an existing array, copying only if it is not already row-major.
    pub fn from_array(array: Array2<Real>) -> Self {
        let data = if array.is_standard_layout() {
            array
        } else {
            array.as_standard_layout().into_owned()
        };
        Self { data }
    }

    /// Build from a flat row-major value buffer.
    pub fn from_vec(values: Vec<Real>, nrows: usize, ncols: usize) -> CoreResult<Self> {
        let actual = values.len();
        let data = Array2::from_shape_vec((nrows, ncols), values).map_err(|_| {
            CoreError::ShapeMismatch {
                op: "FactorMatrix::from_vec",
                what: "value buffer".to_string(),
                expected: vec![nrows * ncols],
                actual: vec![actual],
            }
        })?;
        Ok(Self { data })
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn array(&self) -> &Array2<Real> {
        &self.data
    }

    pub fn array_mut(&mut self) -> &mut Array2<Real> {
        &mut self.data
    }

    /// Flat row-major view of all entries.
    pub fn as_slice(&self) -> &[Real] {
        self.data.as_slice().expect("FactorMatrix is row-major")
    }

    /// Flat mutable row-major view of all entries.
    pub fn as_mut_slice(&mut self) -> &mut [Real] {
        self.data.as_slice_mut().expect("FactorMatrix is row-major")
    }

    /// Row `i` as a contiguous slice of length `ncols`.
    pub fn row_slice(&self, i: usize) -> &[Real] {
        let ncols = self.ncols();
        &self.as_slice()[i * ncols..(i + 1) * ncols]
    }

    /// Set every entry to `value`.
    pub fn fill(&mut self, value: Real) {
        self.data.fill(value);
    }

    /// Copy all entries from `other`, which must have the same shape.
    pub fn assign(&mut self, other: &FactorMatrix) -> CoreResult<()> {
        if self.nrows() != other.nrows() || self.ncols() != other.ncols() {
            return Err(CoreError::ShapeMismatch {
                op: "FactorMatrix::assign",
                what: "source matrix".to_string(),
                expected: vec![self.nrows(), self.ncols()],
                actual: vec![other.nrows(), other.ncols()],
            });
        }
        self.data.assign(&other.data);
        Ok(())
    }

    /// Gramian `U^T U`, exploiting symmetry.
    pub fn gramian(&self) -> Array2<Real> {
        let (rows, cols) = (self.nrows(), self.ncols());
        let mut gram = Array2::<Real>::zeros((cols, cols));

        for i in 0..cols {
            for j in i..cols {
                let mut sum = 0.0;
                for k in 0..rows {
                    sum += self.data[[k, i]] * self.data[[k, j]];
                }
                gram[[i, j]] = sum;
                gram[[j, i]] = sum;
            }
        }

        gram
    }

    /// Column norms with a floor applied to each result.
    ///
    /// A positive `floor` keeps later normalization steps from dividing by
    /// a vanishing norm.
    pub fn col_norms(&self, kind: NormKind, floor: Real) -> Array1<Real> {
        let (rows, cols) = (self.nrows(), self.ncols());
        let mut norms = Array1::<Real>::zeros(cols);

        for j in 0..cols {
            let norm = match kind {
                NormKind::TwoNorm => {
                    let mut sum = 0.0;
                    for i in 0..rows {
                        let v = self.data[[i, j]];
                        sum += v * v;
                    }
                    sum.sqrt()
                }
                NormKind::InfNorm => {
                    let mut max = 0.0;
                    for i in 0..rows {
                        max = Real::max(max, self.data[[i, j]].abs());
                    }
                    max
                }
            };
            norms[j] = if norm < floor { floor } else { norm };
        }

        norms
    }

    /// Scale column `j` by `scale[j]`, or by `1/scale[j]` when `invert`.
    pub fn col_scale(&mut self, scale: &Array1<Real>, invert: bool) -> CoreResult<()> {
        let cols = self.ncols();
        if scale.len() != cols {
            return Err(CoreError::ShapeMismatch {
                op: "FactorMatrix::col_scale",
                what: "scale vector".to_string(),
                expected: vec![cols],
                actual: vec![scale.len()],
            });
        }

        for j in 0..cols {
            let s = if invert { 1.0 / scale[j] } else { scale[j] };
            for v in self.data.column_mut(j).iter_mut() {
                *v *= s;
            }
        }
        Ok(())
    }

    /// Solve `self <- self * upsilon^{-1}` for symmetric positive-definite
    /// `upsilon` (the Matlab operation `(upsilon \ self')'`).
    pub fn solve_transpose_rhs(&mut self, upsilon: &Array2<Real>) -> CoreResult<()> {
        solve_spd(upsilon, &mut self.data)
    }

    /// Reorder columns so new column `j` is old column `perm[j]`.
    pub fn permute_columns(&mut self, perm: &[usize]) -> CoreResult<()> {
        let cols = self.ncols();
        if perm.len() != cols {
            return Err(CoreError::ShapeMismatch {
                op: "FactorMatrix::permute_columns",
                what: "permutation".to_string(),
                expected: vec![cols],
                actual: vec![perm.len()],
            });
        }
        for &p in perm {
            if p >= cols {
                return Err(CoreError::IndexOutOfRange {
                    what: "column",
                    index: p,
                    bound: cols,
                });
            }
        }

        let old = self.data.clone();
        for (j, &p) in perm.iter().enumerate() {
            self.data.column_mut(j).assign(&old.column(p));
        }
        Ok(())
    }

    /// True if any entry is NaN or infinite.
    pub fn has_non_finite(&self) -> bool {
        self.as_slice().iter().any(|v| !v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scirs2_core::ndarray_ext::array;

    #[test]
    fn test_zeros_shape() {
        let f = FactorMatrix::zeros(4, 2);
        assert_eq!(f.nrows(), 4);
        assert_eq!(f.ncols(), 2);
        assert!(f.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_row_slice_is_contiguous() {
        let f = FactorMatrix::from_array(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        assert_eq!(f.row_slice(1), &[3.0, 4.0]);
    }

    #[test]
    fn test_gramian() {
        let f = FactorMatrix::from_array(array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]);
        let gram = f.gramian();

        // Gram[0,0] = 1 + 9 + 25 = 35, Gram[1,1] = 4 + 16 + 36 = 56,
        // Gram[0,1] = 2 + 12 + 30 = 44.
        assert!((gram[[0, 0]] - 35.0).abs() < 1e-12);
        assert!((gram[[1, 1]] - 56.0).abs() < 1e-12);
        assert!((gram[[0, 1]] - 44.0).abs() < 1e-12);
        assert!((gram[[1, 0]] - 44.0).abs() < 1e-12);
    }

    #[test]
    fn test_col_norms_two() {
        let f = FactorMatrix::from_array(array![[3.0, 0.0], [4.0, 0.0]]);
        let norms = f.col_norms(NormKind::TwoNorm, 0.0);
        assert!((norms[0] - 5.0).abs() < 1e-12);
        assert_eq!(norms[1], 0.0);
    }

    #[test]
    fn test_col_norms_inf_with_floor() {
        let f = FactorMatrix::from_array(array![[0.5, -2.0], [0.25, 1.5]]);
        let norms = f.col_norms(NormKind::InfNorm, 1.0);
        // Column 0 max |.| is 0.5, floored to 1.0.
        assert_eq!(norms[0], 1.0);
        assert_eq!(norms[1], 2.0);
    }

    #[test]
    fn test_col_scale_invert() {
        let mut f = FactorMatrix::from_array(array![[2.0, 9.0], [4.0, 3.0]]);
        let scale = array![2.0, 3.0];
        f.col_scale(&scale, true).unwrap();
        assert_eq!(f.array()[[0, 0]], 1.0);
        assert_eq!(f.array()[[1, 0]], 2.0);
        assert_eq!(f.array()[[0, 1]], 3.0);
        assert_eq!(f.array()[[1, 1]], 1.0);
    }

    #[test]
    fn test_solve_transpose_rhs_identity() {
        let mut f = FactorMatrix::from_array(array![[1.0, 2.0], [3.0, 4.0]]);
        let upsilon = Array2::<Real>::eye(2);
        f.solve_transpose_rhs(&upsilon).unwrap();
        assert!((f.array()[[0, 0]] - 1.0).abs() < 1e-12);
        assert!((f.array()[[1, 1]] - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_permute_columns() {
        let mut f = FactorMatrix::from_array(array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        f.permute_columns(&[2, 0, 1]).unwrap();
        assert_eq!(f.row_slice(0), &[3.0, 1.0, 2.0]);
        assert_eq!(f.row_slice(1), &[6.0, 4.0, 5.0]);
    }

    #[test]
    fn test_has_non_finite() {
        let mut f = FactorMatrix::zeros(2, 2);
        assert!(!f.has_non_finite());
        f.array_mut()[[1, 0]] = Real::NAN;
        assert!(f.has_non_finite());
    }

    #[test]
    fn test_assign_shape_mismatch() {
        let mut f = FactorMatrix::zeros(2, 2);
        let g = FactorMatrix::zeros(3, 2);
        assert!(matches!(
            f.assign(&g),
            Err(CoreError::ShapeMismatch { .. })
        ));
    }
}
