//! `bmm-matrix` - Cache-blocked dense matrix multiplication with pluggable
//! executors.
//!
//! This crate provides:
//! - A `Matrix` type: row-major f32, dimensions fixed at creation
//! - The blocked multiply kernel (block-row / block-column / block-depth)
//! - An `Executor` trait for pluggable execution (calling thread, rayon pool,
//!   scoped worker threads)
//! - Partitioning of the block space into jobs with exclusive output
//!   ownership
//! - `BlockedMultiplier`, the front door tying the above together
//!
//! ```
//! use bmm_matrix::{multiply, Matrix};
//!
//! let a = Matrix::ones(4, 3);
//! let b = Matrix::from_fn(3, 2, |k, _| (k + 1) as f32);
//! let c = multiply(&a, &b, 2).unwrap();
//! assert!(c.as_slice().iter().all(|&v| v == 6.0));
//! ```

pub mod block;
pub mod cpu;
pub mod dispatch;
pub mod error;
pub mod executor;
pub mod matrix;
pub mod multiplier;
pub mod shape;

// Re-export primary types at the crate root for convenience.
pub use block::{BlockCoord, BlockSize};
pub use dispatch::Partition;
pub use error::{MatmulError, Result};
pub use executor::{Executor, Job, RayonExecutor, ScopedExecutor, SequentialExecutor};
pub use matrix::Matrix;
pub use multiplier::{multiply, BlockedMultiplier, Product};
pub use shape::Dims;
