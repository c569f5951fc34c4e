//! # kruskal-core
//!
//! Dense containers for CP (canonical polyadic) tensor factorization:
//! factor matrices, K-tensors, and the small dense linear algebra layer
//! (Gramians, column norms, symmetric positive-definite solves) that the
//! alternating-least-squares driver consumes.
//!
//! This crate owns no parallelism; everything here is cheap relative to the
//! sparse kernels and runs serially inside one ALS step.
//!
//! # SciRS2 Integration
//!
//! All array operations use `scirs2_core::ndarray_ext` and
//! `scirs2_linalg`. Direct use of `ndarray` is forbidden per
//! SCIRS2_INTEGRATION_POLICY.md

pub mod error;
pub mod facmatrix;
pub mod ktensor;
pub mod linalg;
pub mod types;

pub use error::{CoreError, CoreResult};
pub use facmatrix::FactorMatrix;
pub use ktensor::Ktensor;
pub use linalg::solve_spd;
pub use types::{NormKind, Real, MACHINE_EPSILON};
