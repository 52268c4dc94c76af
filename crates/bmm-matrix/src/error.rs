use thiserror::Error;

use crate::shape::Dims;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatmulError {
    #[error("matmul dimension mismatch: [{m}x{n}] @ [{n2}x{p}]")]
    InvalidDimensions {
        m: usize,
        n: usize,
        n2: usize,
        p: usize,
    },
    #[error("invalid block size {0}: must be at least 1")]
    InvalidBlockSize(usize),
    #[error("buffer length {got} does not match {dims} (expected {expected})")]
    BufferLength {
        dims: Dims,
        expected: usize,
        got: usize,
    },
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: Dims, got: Dims },
    #[error("matrix {0} has more elements than fit in memory")]
    TooLarge(Dims),
    #[error("execution failure: {0}")]
    ExecutionFailure(String),
}

pub type Result<T> = std::result::Result<T, MatmulError>;
