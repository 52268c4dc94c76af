use bmm_matrix::Partition;

/// Status codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BmmStatus {
    Ok = 0,
    ErrorInvalidArgument = 1,
    ErrorInvalidDimensions = 2,
    ErrorExecution = 3,
    ErrorMismatch = 4,
    ErrorInternal = 5,
}

/// Executor selector.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BmmExecutorKind {
    Sequential = 0,
    RayonPool = 1,
    ScopedThreads = 2,
}

/// How the block space is split into jobs.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BmmPartition {
    RowStrips = 0,
    Tiles = 1,
    TilesSplitDepth = 2,
}

impl From<BmmPartition> for Partition {
    fn from(p: BmmPartition) -> Self {
        match p {
            BmmPartition::RowStrips => Partition::RowStrips,
            BmmPartition::Tiles => Partition::Tiles,
            BmmPartition::TilesSplitDepth => Partition::TilesSplitDepth,
        }
    }
}

/// Parameters controlling a multiply context.
#[repr(C)]
#[derive(Debug, Clone)]
pub struct BmmParams {
    pub block_size: u32,
    pub partition: BmmPartition,
    /// Worker threads; 0 uses every available core.
    pub workers: u32,
}

impl Default for BmmParams {
    fn default() -> Self {
        Self {
            block_size: 32,
            partition: BmmPartition::RowStrips,
            workers: 0,
        }
    }
}
