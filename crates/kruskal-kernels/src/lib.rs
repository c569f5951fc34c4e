//! # kruskal-kernels
//!
//! The performance-critical kernels of the Kruskal stack: MTTKRP
//! (matricized-tensor-times-Khatri-Rao-product) over the three sparse
//! storage variants, and the sparse-tensor / K-tensor inner product.
//! These two operations dominate CP-ALS runtime; everything else in the
//! stack is bookkeeping around them.
//!
//! The kernels share a compile-time rank-tile ladder: the inner loops are
//! instantiated over a small closed set of tile widths so the compiler can
//! unroll and vectorize them, with a runtime-length trailing tile. The
//! MTTKRP variants differ only in how they resolve concurrent writes into
//! the output factor matrix:
//!
//! - COO: atomic scatter-add per nonzero.
//! - Permuted: segmented accumulation over sorted row runs; only the
//!   boundary rows of each block need atomics.
//! - Row-indexed: one worker per output row, no atomics at all.
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext`; parallel execution
//! goes through `scirs2_core::parallel_ops` behind the `parallel` feature.
//! Direct use of `ndarray` is forbidden per SCIRS2_INTEGRATION_POLICY.md

pub mod atomic;
pub mod error;
pub mod innerprod;
pub mod mttkrp;
pub mod util;


pub use error::{KernelError, KernelResult};
pub use innerprod::innerprod;
pub use mttkrp::mttkrp;
