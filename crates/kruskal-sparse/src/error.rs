//! Error types for sparse tensor construction and I/O.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SparseError {
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("length mismatch: {subs} subscript tuples but {vals} values")]
    LengthMismatch { subs: usize, vals: usize },

    #[error(
        "subscript {subscript} of nonzero {nonzero} out of range for mode {mode} (size {size})"
    )]
    IndexOutOfRange {
        nonzero: usize,
        mode: usize,
        subscript: usize,
        size: usize,
    },

    #[error("invalid mode {mode} for {ndims}-way tensor")]
    InvalidMode { mode: usize, ndims: usize },

    #[error("malformed input at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    #[error("i/o failure on {}: {source}", path.display())]
    IoFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type SparseResult<T> = Result<T, SparseError>;
