//! # kruskal-sparse
//!
//! Sparse tensor storage for the Kruskal stack.
//!
//! Three variants of the same coordinate data, chosen per hardware and
//! workload by the MTTKRP caller:
//!
//! - [`SpTensor`] - plain COO: subscripts and values, nothing else.
//! - [`SpTensorPerm`] - COO plus one stable sort permutation per mode, so
//!   nonzeros sharing a target row cluster together.
//! - [`SpTensorRow`] - the permuted layout plus per-mode row-pointer
//!   arrays, giving each output row its exact nonzero range.
//!
//! [`SparseTensor`] is the tagged union the kernels dispatch on.
//!
//! The crate also carries the text formats (`sptensor`, `matrix` /
//! `facmatrix`, `ktensor`, optionally gzipped) in [`io`].
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext`.
//! Direct use of `ndarray` is forbidden per SCIRS2_INTEGRATION_POLICY.md

pub mod coo;
pub mod error;
pub mod io;
pub mod perm;
pub mod row;
pub mod tensor;


pub use coo::SpTensor;
pub use error::{SparseError, SparseResult};
pub use perm::SpTensorPerm;
pub use row::SpTensorRow;
pub use tensor::{SparseTensor, TensorLayout};
