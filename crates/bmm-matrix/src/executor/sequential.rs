use super::{collect_failures, run_job, Executor, Job};
use crate::error::Result;

/// Runs every job on the calling thread, in submission order.
#[derive(Debug, Clone, Default)]
pub struct SequentialExecutor;

impl SequentialExecutor {
    pub fn new() -> Self {
        SequentialExecutor
    }
}

impl Executor for SequentialExecutor {
    fn name(&self) -> &str {
        "sequential"
    }

    fn parallelism(&self) -> usize {
        1
    }

    fn submit(&self, jobs: Vec<Job<'_>>) -> Result<()> {
        log::trace!("sequential executor: running {} jobs", jobs.len());
        let outcomes: Vec<_> = jobs.into_iter().map(run_job).collect();
        collect_failures(self.name(), outcomes)
    }
}
