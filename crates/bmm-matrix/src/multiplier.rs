use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::block::BlockSize;
use crate::dispatch::{self, Partition, Problem};
use crate::error::{MatmulError, Result};
use crate::executor::{Executor, SequentialExecutor};
use crate::matrix::Matrix;
use crate::shape::Dims;

/// Blocked product `a @ b` on the calling thread.
///
/// # Errors
/// - `InvalidBlockSize` if `block_size == 0`
/// - `InvalidDimensions` if `a.cols() != b.rows()`
pub fn multiply(a: &Matrix, b: &Matrix, block_size: usize) -> Result<Matrix> {
    BlockedMultiplier::new(block_size)?.multiply(a, b)
}

/// A product together with the wall-clock time of its compute phase.
#[derive(Debug, Clone)]
pub struct Product {
    pub matrix: Matrix,
    /// Time spent inside the executor. Validation and allocation of the
    /// result are not included.
    pub elapsed: Duration,
}

impl Product {
    /// Achieved throughput, counting one multiply and one add per term.
    pub fn gflops(&self, depth: usize) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        let flops = 2.0 * (self.matrix.rows() * self.matrix.cols() * depth) as f64;
        flops / secs / 1e9
    }
}

/// Cache-blocked matrix multiplier bound to an executor.
///
/// The block size only affects locality: every configuration performs the
/// same `m * n * p` multiply-adds. With a partition that preserves summation
/// order the result is bit-identical to the sequential one regardless of the
/// executor or its worker count.
#[derive(Debug, Clone)]
pub struct BlockedMultiplier {
    block: BlockSize,
    partition: Partition,
    executor: Arc<dyn Executor>,
}

impl BlockedMultiplier {
    /// A sequential multiplier with the given block size.
    ///
    /// # Errors
    /// Returns `InvalidBlockSize` if `block_size == 0`.
    pub fn new(block_size: usize) -> Result<Self> {
        Ok(BlockedMultiplier {
            block: BlockSize::new(block_size)?,
            partition: Partition::default(),
            executor: Arc::new(SequentialExecutor::new()),
        })
    }

    /// Run on `executor` instead of the calling thread.
    pub fn with_executor(mut self, executor: Arc<dyn Executor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partition = partition;
        self
    }

    pub fn block_size(&self) -> BlockSize {
        self.block
    }

    pub fn partition(&self) -> Partition {
        self.partition
    }

    pub fn executor(&self) -> &dyn Executor {
        self.executor.as_ref()
    }

    /// Compute `a @ b`.
    ///
    /// a is [m, n], b is [n, p], result is [m, p].
    ///
    /// # Errors
    /// - `InvalidDimensions` if `a.cols() != b.rows()`; nothing is computed.
    /// - `ExecutionFailure` if a worker fails; no partial result is returned.
    pub fn multiply(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        self.multiply_timed(a, b).map(|product| product.matrix)
    }

    /// Like [`multiply`](Self::multiply), also reporting how long the
    /// compute phase took.
    pub fn multiply_timed(&self, a: &Matrix, b: &Matrix) -> Result<Product> {
        let (m, n) = (a.rows(), a.cols());
        let (n2, p) = (b.rows(), b.cols());
        if n != n2 {
            return Err(MatmulError::InvalidDimensions { m, n, n2, p });
        }

        let out = Dims::new(m, p);
        if out.checked_numel().is_none() {
            return Err(MatmulError::TooLarge(out));
        }
        let mut c = Matrix::zeros(m, p);
        let prob = Problem {
            a: a.as_slice(),
            b: b.as_slice(),
            m,
            n,
            p,
            block: self.block,
        };

        let start = Instant::now();
        dispatch::run(self.executor.as_ref(), self.partition, &prob, c.as_mut_slice())?;
        let elapsed = start.elapsed();

        log::debug!(
            "multiply: {} @ {} -> {} in {:?} ({} executor)",
            a.dims(),
            b.dims(),
            c.dims(),
            elapsed,
            self.executor.name()
        );
        Ok(Product { matrix: c, elapsed })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{RayonExecutor, ScopedExecutor};

    fn square_example() -> (Matrix, Matrix) {
        let a = Matrix::new(3, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]).unwrap();
        let b = Matrix::new(3, 3, vec![9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0]).unwrap();
        (a, b)
    }

    #[test]
    fn test_multiply_3x3_block_2() {
        let (a, b) = square_example();
        let c = multiply(&a, &b, 2).unwrap();
        assert_eq!(
            c.as_slice(),
            &[30.0, 24.0, 18.0, 84.0, 69.0, 54.0, 138.0, 114.0, 90.0]
        );
    }

    #[test]
    fn test_zero_block_size() {
        let (a, b) = square_example();
        assert_eq!(
            multiply(&a, &b, 0).unwrap_err(),
            MatmulError::InvalidBlockSize(0)
        );
    }

    #[test]
    fn test_dimension_mismatch_reports_all_dims() {
        let a = Matrix::ones(2, 3);
        let b = Matrix::ones(4, 5);
        assert_eq!(
            multiply(&a, &b, 2).unwrap_err(),
            MatmulError::InvalidDimensions {
                m: 2,
                n: 3,
                n2: 4,
                p: 5
            }
        );
    }

    #[test]
    fn test_oversized_result_with_empty_depth() {
        let big = usize::MAX / 2;
        let a = Matrix::zeros(big, 0);
        let b = Matrix::zeros(0, big);
        assert_eq!(
            multiply(&a, &b, 4).unwrap_err(),
            MatmulError::TooLarge(Dims::new(big, big))
        );
    }

    #[test]
    fn test_scalar_case() {
        let a = Matrix::new(1, 1, vec![3.5]).unwrap();
        let b = Matrix::new(1, 1, vec![-2.0]).unwrap();
        assert_eq!(multiply(&a, &b, 1).unwrap().as_slice(), &[-7.0]);
    }

    #[test]
    fn test_builder_accessors() {
        let mul = BlockedMultiplier::new(8)
            .unwrap()
            .with_executor(Arc::new(ScopedExecutor::new(2)))
            .with_partition(Partition::Tiles);
        assert_eq!(mul.block_size().get(), 8);
        assert_eq!(mul.partition(), Partition::Tiles);
        assert_eq!(mul.executor().name(), "scoped");
        assert_eq!(mul.executor().parallelism(), 2);
    }

    #[test]
    fn test_every_executor_and_partition_agree() {
        let a = Matrix::from_fn(9, 14, |i, j| ((i * 3 + j) % 7) as f32 - 3.0);
        let b = Matrix::from_fn(14, 6, |i, j| ((i + 2 * j) % 5) as f32);
        let expected = multiply(&a, &b, 4).unwrap();

        let executors: Vec<Arc<dyn Executor>> = vec![
            Arc::new(SequentialExecutor::new()),
            Arc::new(RayonExecutor::new(2).unwrap()),
            Arc::new(ScopedExecutor::new(3)),
        ];
        for exec in executors {
            for partition in Partition::ALL {
                let mul = BlockedMultiplier::new(4)
                    .unwrap()
                    .with_executor(exec.clone())
                    .with_partition(partition);
                // Integer-valued inputs: every partition is exact here.
                assert_eq!(
                    mul.multiply(&a, &b).unwrap(),
                    expected,
                    "{} / {}",
                    exec.name(),
                    partition
                );
            }
        }
    }

    #[test]
    fn test_timed_product() {
        let a = Matrix::ones(16, 16);
        let b = Matrix::ones(16, 16);
        let product = BlockedMultiplier::new(4).unwrap().multiply_timed(&a, &b).unwrap();
        assert!(product.matrix.as_slice().iter().all(|&v| v == 16.0));
        assert!(product.gflops(16) >= 0.0);
    }

    #[test]
    fn test_gflops_zero_elapsed() {
        let product = Product {
            matrix: Matrix::zeros(2, 2),
            elapsed: Duration::ZERO,
        };
        assert_eq!(product.gflops(2), 0.0);
    }
}
