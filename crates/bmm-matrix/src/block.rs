use std::num::NonZeroUsize;
use std::ops::Range;

use crate::error::{MatmulError, Result};

/// Edge length of the square blocks the multiply iterates over.
///
/// Chosen independently of the matrix dimensions. When it does not divide a
/// dimension evenly, the last block along that dimension is shorter; when it
/// exceeds a dimension, that dimension is a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockSize(NonZeroUsize);

impl BlockSize {
    /// # Errors
    /// Returns `InvalidBlockSize` if `size == 0`.
    pub fn new(size: usize) -> Result<Self> {
        NonZeroUsize::new(size)
            .map(BlockSize)
            .ok_or(MatmulError::InvalidBlockSize(size))
    }

    pub fn get(&self) -> usize {
        self.0.get()
    }

    /// Number of blocks needed to cover `dim`.
    pub fn count(&self, dim: usize) -> usize {
        dim.div_ceil(self.get())
    }

    /// Block ranges covering `[0, dim)`, each clamped to `dim`.
    pub fn ranges(&self, dim: usize) -> BlockRanges {
        self.ranges_in(0..dim)
    }

    /// Block ranges covering `span`, stepping from `span.start`.
    pub fn ranges_in(&self, span: Range<usize>) -> BlockRanges {
        BlockRanges {
            next: span.start,
            dim: span.end,
            step: self.get(),
        }
    }

    /// The block starting at `start`, clamped to `dim`.
    pub fn range_at(&self, start: usize, dim: usize) -> Range<usize> {
        start..start.saturating_add(self.get()).min(dim)
    }
}

impl TryFrom<usize> for BlockSize {
    type Error = MatmulError;

    fn try_from(size: usize) -> Result<Self> {
        BlockSize::new(size)
    }
}

/// Iterator over `[s, min(s + bs, dim))` for `s = 0, bs, 2bs, ...`.
#[derive(Debug, Clone)]
pub struct BlockRanges {
    next: usize,
    dim: usize,
    step: usize,
}

impl Iterator for BlockRanges {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        if self.next >= self.dim {
            return None;
        }
        let start = self.next;
        let end = start.saturating_add(self.step).min(self.dim);
        self.next = end;
        Some(start..end)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.dim - self.next.min(self.dim)).div_ceil(self.step);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BlockRanges {}

/// Start offsets of one block triple: block-row, block-column, block-depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockCoord {
    pub row: usize,
    pub col: usize,
    pub depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_block_size_rejected() {
        assert_eq!(BlockSize::new(0), Err(MatmulError::InvalidBlockSize(0)));
        assert!(BlockSize::try_from(3usize).is_ok());
    }

    #[test]
    fn test_even_ranges() {
        let bs = BlockSize::new(2).unwrap();
        let r: Vec<_> = bs.ranges(6).collect();
        assert_eq!(r, vec![0..2, 2..4, 4..6]);
        assert_eq!(bs.count(6), 3);
    }

    #[test]
    fn test_remainder_block() {
        let bs = BlockSize::new(4).unwrap();
        let r: Vec<_> = bs.ranges(10).collect();
        assert_eq!(r, vec![0..4, 4..8, 8..10]);
        assert_eq!(bs.count(10), 3);
        assert_eq!(bs.ranges(10).len(), 3);
    }

    #[test]
    fn test_block_larger_than_dim() {
        let bs = BlockSize::new(64).unwrap();
        let r: Vec<_> = bs.ranges(5).collect();
        assert_eq!(r, vec![0..5]);
        assert_eq!(bs.range_at(0, 5), 0..5);
    }

    #[test]
    fn test_ranges_in_span() {
        let bs = BlockSize::new(3).unwrap();
        assert_eq!(bs.ranges_in(6..8).collect::<Vec<_>>(), vec![6..8]);
        assert_eq!(bs.ranges_in(0..7).collect::<Vec<_>>(), vec![0..3, 3..6, 6..7]);
        assert_eq!(bs.ranges_in(4..4).count(), 0);
    }

    #[test]
    fn test_zero_dim_has_no_blocks() {
        let bs = BlockSize::new(3).unwrap();
        assert_eq!(bs.ranges(0).count(), 0);
        assert_eq!(bs.count(0), 0);
    }

    #[test]
    fn test_huge_block_does_not_overflow() {
        let bs = BlockSize::new(usize::MAX).unwrap();
        assert_eq!(bs.ranges(7).collect::<Vec<_>>(), vec![0..7]);
    }
}
