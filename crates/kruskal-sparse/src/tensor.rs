//! Tagged union over the sparse storage variants.
//!
//! The MTTKRP entry point dispatches on this enum once per call; the hot
//! loops never see dynamic dispatch.

use crate::coo::SpTensor;
use crate::error::{SparseError, SparseResult};
use crate::perm::SpTensorPerm;
use crate::row::SpTensorRow;
use kruskal_core::Real;
use std::str::FromStr;

/// Which storage variant to build for a tensor.
///
/// Typical selection: `Row` on CPUs (no atomics, good rowptr locality),
/// `Perm` when runs of equal target rows are long, `Coo` when no
/// preprocessing budget is acceptable or rank is low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TensorLayout {
    Coo,
    Perm,
    Row,
}

impl FromStr for TensorLayout {
    type Err = SparseError;

    /// Accepts the driver names `kokkos` (plain COO), `perm`, and `row`.
    fn from_str(s: &str) -> SparseResult<Self> {
        match s {
            "kokkos" | "coo" => Ok(TensorLayout::Coo),
            "perm" => Ok(TensorLayout::Perm),
            "row" => Ok(TensorLayout::Row),
            other => Err(SparseError::ShapeMismatch(format!(
                "unknown tensor layout '{}', expected kokkos|perm|row",
                other
            ))),
        }
    }
}

/// A sparse tensor in one of the three storage variants.
#[derive(Debug, Clone)]
pub enum SparseTensor {
    Coo(SpTensor),
    Perm(SpTensorPerm),
    Row(SpTensorRow),
}

impl SparseTensor {
    /// Build the requested variant from coordinate data, including its
    /// accelerators.
    pub fn with_layout(tensor: SpTensor, layout: TensorLayout) -> Self {
        match layout {
            TensorLayout::Coo => SparseTensor::Coo(tensor),
            TensorLayout::Perm => SparseTensor::Perm(SpTensorPerm::from_coo(tensor)),
            TensorLayout::Row => SparseTensor::Row(SpTensorRow::from_coo(tensor)),
        }
    }

    pub fn layout(&self) -> TensorLayout {
        match self {
            SparseTensor::Coo(_) => TensorLayout::Coo,
            SparseTensor::Perm(_) => TensorLayout::Perm,
            SparseTensor::Row(_) => TensorLayout::Row,
        }
    }

    /// The coordinate data common to every variant.
    pub fn base(&self) -> &SpTensor {
        match self {
            SparseTensor::Coo(t) => t,
            SparseTensor::Perm(t) => t.base(),
            SparseTensor::Row(t) => t.base(),
        }
    }

    /// Build any variant-specific accelerators. Idempotent; a no-op for
    /// plain COO.
    pub fn fill_complete(&mut self) {
        match self {
            SparseTensor::Coo(t) => t.fill_complete(),
            SparseTensor::Perm(t) => t.fill_complete(),
            SparseTensor::Row(t) => t.fill_complete(),
        }
    }

    pub fn ndims(&self) -> usize {
        self.base().ndims()
    }

    pub fn nnz(&self) -> usize {
        self.base().nnz()
    }

    pub fn size(&self, d: usize) -> usize {
        self.base().size(d)
    }

    pub fn sizes(&self) -> &[usize] {
        self.base().sizes()
    }

    #[inline]
    pub fn subscript(&self, i: usize, d: usize) -> usize {
        self.base().subscript(i, d)
    }

    #[inline]
    pub fn value(&self, i: usize) -> Real {
        self.base().value(i)
    }

    pub fn norm(&self) -> Real {
        self.base().norm()
    }
}
