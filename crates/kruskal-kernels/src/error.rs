//! Error types for kernel preconditions.
//!
//! Kernels check every precondition eagerly and never recover locally;
//! a failed check means the caller wired shapes together wrong.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KernelError {
    #[error("{op}: mode {mode} out of range for {ndims}-way tensor")]
    ModeOutOfRange {
        op: &'static str,
        mode: usize,
        ndims: usize,
    },

    #[error("{op}: factor {factor} has {actual} columns, expected {expected}")]
    RankMismatch {
        op: &'static str,
        factor: usize,
        expected: usize,
        actual: usize,
    },

    #[error("{op}: {what} has shape {actual:?}, expected {expected:?}")]
    ShapeMismatch {
        op: &'static str,
        what: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
}

pub type KernelResult<T> = Result<T, KernelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_out_of_range_display() {
        let err = KernelError::ModeOutOfRange {
            op: "mttkrp",
            mode: 3,
            ndims: 3,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("mttkrp"));
        assert!(msg.contains("mode 3"));
        assert!(msg.contains("3-way"));
    }

    #[test]
    fn test_rank_mismatch_display() {
        let err = KernelError::RankMismatch {
            op: "innerprod",
            factor: 1,
            expected: 4,
            actual: 2,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("factor 1"));
        assert!(msg.contains("expected 4"));
    }
}
