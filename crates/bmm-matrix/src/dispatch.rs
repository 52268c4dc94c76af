//! Partitioning of the blocked multiply into executor jobs.
//!
//! Every partition hands each job exclusive ownership of the output cells it
//! writes: either a `chunks_mut` strip of C or a private buffer that is
//! folded into C after the executor has joined. No job ever holds a
//! reference into another job's cells, so a data race on C cannot be
//! expressed.

use std::fmt;
use std::ops::Range;

use crate::block::{BlockCoord, BlockSize};
use crate::cpu::{self, OutTile};
use crate::error::Result;
use crate::executor::{Executor, Job};

/// How the block iteration space is split into jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Partition {
    /// One job per block-row; each owns the C rows `[bi, bi + bs)`.
    #[default]
    RowStrips,
    /// One job per `(bi, bj)` tile, each summing the full depth into a
    /// private tile buffer that is copied into C after the join.
    Tiles,
    /// One job per `(bi, bj, bk)` triple, each producing a private partial
    /// tile. Partials are reduced into C in ascending `bk` order after the
    /// join. The result matches the sequential multiply within floating-point
    /// tolerance but not bit for bit.
    TilesSplitDepth,
}

impl Partition {
    pub const ALL: [Partition; 3] = [
        Partition::RowStrips,
        Partition::Tiles,
        Partition::TilesSplitDepth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Partition::RowStrips => "rows",
            Partition::Tiles => "tiles",
            Partition::TilesSplitDepth => "split-depth",
        }
    }

    /// True when every cell sees its k terms in one unbroken ascending run,
    /// making the result identical to the sequential multiply.
    pub fn preserves_summation_order(&self) -> bool {
        !matches!(self, Partition::TilesSplitDepth)
    }

    /// Number of jobs this partition submits for an `m x n @ n x p` product.
    pub fn job_count(&self, block: BlockSize, m: usize, n: usize, p: usize) -> usize {
        if m == 0 || p == 0 {
            return 0;
        }
        match self {
            Partition::RowStrips => block.count(m),
            Partition::Tiles => block.count(m) * block.count(p),
            Partition::TilesSplitDepth => block.count(m) * block.count(p) * block.count(n),
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Operands and geometry of one multiply.
#[derive(Debug, Clone, Copy)]
pub struct Problem<'a> {
    pub a: &'a [f32],
    pub b: &'a [f32],
    pub m: usize,
    pub n: usize,
    pub p: usize,
    pub block: BlockSize,
}

/// A private output buffer for one tile (or one depth slice of a tile).
#[derive(Debug)]
struct TileBuf {
    origin: BlockCoord,
    rows: Range<usize>,
    cols: Range<usize>,
    depth: Range<usize>,
    data: Vec<f32>,
}

impl TileBuf {
    fn new(rows: Range<usize>, cols: Range<usize>, depth: Range<usize>) -> Self {
        let data = vec![0.0; rows.len() * cols.len()];
        TileBuf {
            origin: BlockCoord {
                row: rows.start,
                col: cols.start,
                depth: depth.start,
            },
            rows,
            cols,
            depth,
            data,
        }
    }

    fn compute(&mut self, prob: &Problem<'_>) {
        let stride = self.cols.len();
        let mut out = OutTile::new(&mut self.data, self.origin.row, self.origin.col, stride);
        for depth in prob.block.ranges_in(self.depth.clone()) {
            cpu::accumulate_block(
                prob.a,
                prob.b,
                prob.n,
                prob.p,
                &mut out,
                self.rows.clone(),
                self.cols.clone(),
                depth,
            );
        }
    }

    fn store_into(&self, c: &mut [f32], p: usize) {
        let width = self.cols.len();
        for (r, i) in self.rows.clone().enumerate() {
            let dst = i * p + self.cols.start;
            c[dst..dst + width].copy_from_slice(&self.data[r * width..(r + 1) * width]);
        }
    }

    fn add_into(&self, c: &mut [f32], p: usize) {
        let width = self.cols.len();
        for (r, i) in self.rows.clone().enumerate() {
            let dst = &mut c[i * p + self.cols.start..i * p + self.cols.end];
            for (d, s) in dst.iter_mut().zip(&self.data[r * width..(r + 1) * width]) {
                *d += *s;
            }
        }
    }
}

/// Compute `c = a @ b` by submitting the jobs of `partition` to `executor`.
///
/// `c` must hold `m * p` zeroed elements. On error its contents are
/// unspecified.
pub fn run(
    executor: &dyn Executor,
    partition: Partition,
    prob: &Problem<'_>,
    c: &mut [f32],
) -> Result<()> {
    if c.is_empty() {
        return Ok(());
    }

    log::debug!(
        "dispatch: [{}x{}] @ [{}x{}], block {}, partition {}, {} jobs on {} ({} workers)",
        prob.m,
        prob.n,
        prob.n,
        prob.p,
        prob.block.get(),
        partition,
        partition.job_count(prob.block, prob.m, prob.n, prob.p),
        executor.name(),
        executor.parallelism()
    );

    match partition {
        Partition::RowStrips => run_row_strips(executor, prob, c),
        Partition::Tiles => run_tiles(executor, prob, c),
        Partition::TilesSplitDepth => run_split_depth(executor, prob, c),
    }
}

fn run_row_strips(executor: &dyn Executor, prob: &Problem<'_>, c: &mut [f32]) -> Result<()> {
    let bs = prob.block.get();
    let p = prob.p;
    let jobs: Vec<Job<'_>> = c
        .chunks_mut(bs.saturating_mul(p))
        .enumerate()
        .map(|(s, strip)| {
            let start = s * bs;
            let rows = start..start + strip.len() / p;
            let prob = *prob;
            Box::new(move || {
                cpu::blocked_rows(prob.a, prob.b, strip, rows, prob.n, prob.p, prob.block)
            }) as Job<'_>
        })
        .collect();
    executor.submit(jobs)
}

fn run_tiles(executor: &dyn Executor, prob: &Problem<'_>, c: &mut [f32]) -> Result<()> {
    let count = prob.block.count(prob.m) * prob.block.count(prob.p);
    let mut tiles: Vec<TileBuf> = Vec::with_capacity(count);
    for rows in prob.block.ranges(prob.m) {
        for cols in prob.block.ranges(prob.p) {
            tiles.push(TileBuf::new(rows.clone(), cols, 0..prob.n));
        }
    }

    submit_tiles(executor, prob, &mut tiles)?;

    for tile in &tiles {
        tile.store_into(c, prob.p);
    }
    Ok(())
}

/// Partial-tile elements held at once by the split-depth partition.
const PARTIAL_BUDGET: usize = 1 << 22;
/// Partial tiles submitted in one executor batch.
const MAX_BATCH_TILES: usize = 1 << 14;

fn run_split_depth(executor: &dyn Executor, prob: &Problem<'_>, c: &mut [f32]) -> Result<()> {
    run_split_depth_batched(executor, prob, c, PARTIAL_BUDGET, MAX_BATCH_TILES)
}

/// Split-depth in batches of at most `max_tiles` partials (or `budget`
/// elements, whichever fills first), each reduced into C before the next
/// is allocated.
///
/// Partials are generated tile-major, then by ascending depth, and batches
/// are reduced in generation order, so every cell still receives its
/// partials in ascending `bk` order.
fn run_split_depth_batched(
    executor: &dyn Executor,
    prob: &Problem<'_>,
    c: &mut [f32],
    budget: usize,
    max_tiles: usize,
) -> Result<()> {
    let block = prob.block;
    let (n, p) = (prob.n, prob.p);
    let partials = block.ranges(prob.m).flat_map(move |rows| {
        block.ranges(p).flat_map(move |cols| {
            let rows = rows.clone();
            block
                .ranges(n)
                .map(move |depth| (rows.clone(), cols.clone(), depth))
        })
    });

    let mut batch: Vec<TileBuf> = Vec::new();
    let mut held = 0usize;
    for (rows, cols, depth) in partials {
        held += rows.len() * cols.len();
        batch.push(TileBuf::new(rows, cols, depth));
        if held >= budget || batch.len() >= max_tiles {
            reduce_batch(executor, prob, &mut batch, c)?;
            held = 0;
        }
    }
    reduce_batch(executor, prob, &mut batch, c)
}

fn reduce_batch(
    executor: &dyn Executor,
    prob: &Problem<'_>,
    batch: &mut Vec<TileBuf>,
    c: &mut [f32],
) -> Result<()> {
    if batch.is_empty() {
        return Ok(());
    }
    submit_tiles(executor, prob, batch)?;
    for partial in batch.drain(..) {
        partial.add_into(c, prob.p);
    }
    Ok(())
}

fn submit_tiles(
    executor: &dyn Executor,
    prob: &Problem<'_>,
    tiles: &mut [TileBuf],
) -> Result<()> {
    let jobs: Vec<Job<'_>> = tiles
        .iter_mut()
        .map(|tile| {
            let prob = *prob;
            Box::new(move || tile.compute(&prob)) as Job<'_>
        })
        .collect();
    executor.submit(jobs)
}
