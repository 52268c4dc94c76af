use std::fmt;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use super::{available_workers, collect_failures, run_job, Executor, Job};
use crate::error::{MatmulError, Result};

/// Runs jobs on a dedicated rayon thread pool.
///
/// The pool is owned by the executor, so its worker count is independent of
/// rayon's global pool and of any other executor.
pub struct RayonExecutor {
    pool: ThreadPool,
    workers: usize,
}

impl RayonExecutor {
    /// Build a pool with `workers` threads. `0` means one per available core.
    ///
    /// # Errors
    /// Returns `ExecutionFailure` if the operating system refuses to spawn
    /// the worker threads.
    pub fn new(workers: usize) -> Result<Self> {
        let workers = if workers == 0 {
            available_workers()
        } else {
            workers
        };
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("bmm-worker-{}", i))
            .build()
            .map_err(|e| {
                MatmulError::ExecutionFailure(format!("failed to build thread pool: {}", e))
            })?;
        log::debug!("rayon executor: pool ready with {} workers", workers);
        Ok(RayonExecutor { pool, workers })
    }
}

impl fmt::Debug for RayonExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonExecutor")
            .field("workers", &self.workers)
            .finish()
    }
}

impl Executor for RayonExecutor {
    fn name(&self) -> &str {
        "rayon"
    }

    fn parallelism(&self) -> usize {
        self.workers
    }

    fn submit(&self, jobs: Vec<Job<'_>>) -> Result<()> {
        log::trace!(
            "rayon executor: running {} jobs on {} workers",
            jobs.len(),
            self.workers
        );
        let outcomes: Vec<_> = self
            .pool
            .install(|| jobs.into_par_iter().map(run_job).collect());
        collect_failures(self.name(), outcomes)
    }
}
