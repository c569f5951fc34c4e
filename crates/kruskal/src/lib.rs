//! # kruskal
//!
//! Umbrella crate for the Kruskal sparse tensor decomposition stack.
//! Re-exports the public surface of the member crates:
//!
//! - [`kruskal_core`]: factor matrices, K-tensors, dense solves.
//! - [`kruskal_sparse`]: COO / permuted / row-indexed storage and text I/O.
//! - [`kruskal_kernels`]: MTTKRP and inner-product kernels.
//! - [`kruskal_decomp`]: the CP-ALS driver.
//!
//! # Examples
//!
//! ```
//! use kruskal::{cp_als, CpAlsParams, Ktensor, SparseTensor, SpTensor, TensorLayout};
//!
//! let x = SpTensor::from_tuples(
//!     vec![3, 3],
//!     &[vec![0, 0], vec![1, 1], vec![2, 2]],
//!     vec![1.0, 2.0, 3.0],
//! )
//! .unwrap();
//! let x = SparseTensor::with_layout(x, TensorLayout::Row);
//!
//! let mut u = Ktensor::new(2, &[3, 3]);
//! for m in 0..2 {
//!     for (i, v) in u.factor_mut(m).as_mut_slice().iter_mut().enumerate() {
//!         *v = 0.3 + 0.1 * (i % 7) as f64;
//!     }
//! }
//!
//! let out = cp_als(&x, &mut u, &CpAlsParams::default()).unwrap();
//! assert!(out.num_iters >= 1);
//! ```

pub use kruskal_core::{
    solve_spd, CoreError, CoreResult, FactorMatrix, Ktensor, NormKind, Real, MACHINE_EPSILON,
};
pub use kruskal_decomp::{cp_als, CpAlsError, CpAlsOutput, CpAlsParams, CpAlsPerfInfo};
pub use kruskal_kernels::{innerprod, mttkrp, KernelError, KernelResult};
pub use kruskal_sparse::{
    io, SpTensor, SpTensorPerm, SpTensorRow, SparseError, SparseResult, SparseTensor, TensorLayout,
};
