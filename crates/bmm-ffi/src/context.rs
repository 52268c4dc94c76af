use std::sync::Arc;

use bmm_matrix::{
    BlockedMultiplier, Executor, RayonExecutor, Result, ScopedExecutor, SequentialExecutor,
};

use crate::types::{BmmExecutorKind, BmmParams};

/// Opaque context handle that owns the executor and multiply settings.
pub struct BmmContext {
    pub multiplier: BlockedMultiplier,
    /// Compute-phase duration of the most recent successful multiply.
    pub last_elapsed_ns: u64,
}

impl BmmContext {
    pub fn new(kind: BmmExecutorKind, params: &BmmParams) -> Result<Self> {
        let workers = params.workers as usize;
        let executor: Arc<dyn Executor> = match kind {
            BmmExecutorKind::Sequential => Arc::new(SequentialExecutor::new()),
            BmmExecutorKind::RayonPool => Arc::new(RayonExecutor::new(workers)?),
            BmmExecutorKind::ScopedThreads => Arc::new(ScopedExecutor::new(workers)),
        };
        let multiplier = BlockedMultiplier::new(params.block_size as usize)?
            .with_executor(executor)
            .with_partition(params.partition.into());
        Ok(Self {
            multiplier,
            last_elapsed_ns: 0,
        })
    }
}
