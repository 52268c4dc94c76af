pub mod pool;
pub mod scoped;
pub mod sequential;

use std::any::Any;
use std::fmt::Debug;
use std::panic::{self, AssertUnwindSafe};

use crate::error::{MatmulError, Result};

pub use pool::RayonExecutor;
pub use scoped::ScopedExecutor;
pub use sequential::SequentialExecutor;

/// One unit of work handed to an executor.
///
/// Jobs borrow the inputs and own a disjoint piece of the output for the
/// duration of a single `submit` call.
pub type Job<'scope> = Box<dyn FnOnce() + Send + 'scope>;

/// Trait for pluggable execution backends: the calling thread, a rayon pool
/// or scoped worker threads.
///
/// An executor only decides *where* jobs run. What a job computes, and which
/// part of C it owns, is decided by the dispatcher before submission.
pub trait Executor: Send + Sync + Debug {
    /// Returns the name of this executor (e.g., "sequential", "rayon").
    fn name(&self) -> &str;

    /// Number of jobs that may run at the same time.
    fn parallelism(&self) -> usize;

    /// Run every job and return once all of them have finished.
    ///
    /// This is the only synchronization point: no job observes another, and
    /// the caller must not read the output before `submit` returns.
    ///
    /// # Errors
    /// Returns `ExecutionFailure` if any job panicked. The remaining jobs are
    /// still run to completion first.
    fn submit(&self, jobs: Vec<Job<'_>>) -> Result<()>;
}

/// Worker count to use when the caller asks for `0`.
pub fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Run a job, converting a panic into its message.
pub(crate) fn run_job(job: Job<'_>) -> std::result::Result<(), String> {
    panic::catch_unwind(AssertUnwindSafe(job)).map_err(panic_message)
}

/// Fold per-job outcomes into a single result, logging every failure.
pub(crate) fn collect_failures<I>(executor: &str, outcomes: I) -> Result<()>
where
    I: IntoIterator<Item = std::result::Result<(), String>>,
{
    let mut first = None;
    let mut failed = 0usize;
    for outcome in outcomes {
        if let Err(msg) = outcome {
            log::warn!("{} executor: job panicked: {}", executor, msg);
            failed += 1;
            first.get_or_insert(msg);
        }
    }
    match first {
        None => Ok(()),
        Some(msg) => Err(MatmulError::ExecutionFailure(format!(
            "{} of the {} executor's jobs panicked; first: {}",
            failed, executor, msg
        ))),
    }
}

pub(crate) fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_variants() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42u8)), "non-string panic payload");
    }

    #[test]
    fn test_collect_failures() {
        assert!(collect_failures("test", vec![Ok(()), Ok(())]).is_ok());

        let err = collect_failures(
            "test",
            vec![Ok(()), Err("first".to_string()), Err("second".to_string())],
        )
        .unwrap_err();
        match err {
            MatmulError::ExecutionFailure(msg) => {
                assert!(msg.starts_with("2 of the test"));
                assert!(msg.ends_with("first: first"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_available_workers_positive() {
        assert!(available_workers() >= 1);
    }
}
