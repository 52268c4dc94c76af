use std::thread;

use super::{available_workers, collect_failures, panic_message, run_job, Executor, Job};
use crate::error::Result;

/// Runs jobs on a fixed group of scoped OS threads.
///
/// Jobs are dealt round-robin into one queue per worker, the way a device
/// spreads work-items over its compute units. Threads are spawned per
/// `submit` and all joined before it returns.
#[derive(Debug, Clone)]
pub struct ScopedExecutor {
    workers: usize,
}

impl ScopedExecutor {
    /// `0` means one worker per available core.
    pub fn new(workers: usize) -> Self {
        let workers = if workers == 0 {
            available_workers()
        } else {
            workers
        };
        ScopedExecutor { workers }
    }
}

impl Default for ScopedExecutor {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Executor for ScopedExecutor {
    fn name(&self) -> &str {
        "scoped"
    }

    fn parallelism(&self) -> usize {
        self.workers
    }

    fn submit(&self, jobs: Vec<Job<'_>>) -> Result<()> {
        let lanes = self.workers.min(jobs.len());
        if lanes <= 1 {
            let outcomes: Vec<_> = jobs.into_iter().map(run_job).collect();
            return collect_failures(self.name(), outcomes);
        }

        let mut queues: Vec<Vec<Job<'_>>> = (0..lanes).map(|_| Vec::new()).collect();
        for (i, job) in jobs.into_iter().enumerate() {
            queues[i % lanes].push(job);
        }
        log::trace!("scoped executor: {} lanes", lanes);

        let outcomes: Vec<std::result::Result<(), String>> = thread::scope(|s| {
            let handles: Vec<_> = queues
                .into_iter()
                .map(|queue| {
                    s.spawn(move || {
                        queue
                            .into_iter()
                            .map(run_job)
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(lane) => lane,
                    Err(payload) => vec![Err(panic_message(payload))],
                })
                .collect()
        });
        collect_failures(self.name(), outcomes)
    }
}
