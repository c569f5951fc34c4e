//! # kruskal-decomp
//!
//! Alternating-least-squares fitting of a canonical polyadic model to a
//! sparse tensor. One outer iteration sweeps every mode: MTTKRP, a
//! symmetric positive-definite solve against the Hadamard product of the
//! other modes' Gramians, column normalization into the working weights,
//! and a Gramian refresh. Convergence is judged on the change of the fit
//! `1 - ||X - M|| / ||X||`, with the residual computed in closed form
//! from `||X||`, `||M||`, and `<X, M>` - no reconstruction is ever
//! materialized.
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext`.
//! Direct use of `ndarray` is forbidden per SCIRS2_INTEGRATION_POLICY.md

pub mod cp;

pub use cp::{cp_als, CpAlsError, CpAlsOutput, CpAlsParams, CpAlsPerfInfo};
