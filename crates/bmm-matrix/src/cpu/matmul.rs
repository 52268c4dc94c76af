// Blocked multiply-accumulate kernel.
//
// Every execution path (sequential, row strips, private tiles, depth-split
// partials) funnels through `accumulate_block`, so the order in which a cell
// sees its k contributions is decided in exactly one place: ascending k.

use std::ops::Range;

use crate::block::BlockSize;

/// A writable window onto part of C.
///
/// `data` holds rows `row0..` and columns `col0..col0 + stride` of the
/// output, row-major with `stride` elements per row. A full C is a window with
/// `row0 = col0 = 0` and `stride = p`.
#[derive(Debug)]
pub struct OutTile<'a> {
    data: &'a mut [f32],
    row0: usize,
    col0: usize,
    stride: usize,
}

impl<'a> OutTile<'a> {
    pub fn new(data: &'a mut [f32], row0: usize, col0: usize, stride: usize) -> Self {
        OutTile {
            data,
            row0,
            col0,
            stride,
        }
    }

    /// The window covering all of an `m x p` result.
    pub fn full(data: &'a mut [f32], p: usize) -> Self {
        Self::new(data, 0, 0, p)
    }
}

/// `C[i][j] += sum(A[i][k] * B[k][j])` for one block triple.
///
/// `a` is `[m, n]` and `b` is `[n, p]`, both row-major. The ranges are
/// already clamped to the matrix bounds. k is visited in ascending order so
/// that running this over consecutive depth blocks reproduces the naive
/// left-to-right sum exactly.
#[allow(clippy::too_many_arguments)]
pub fn accumulate_block(
    a: &[f32],
    b: &[f32],
    n: usize,
    p: usize,
    out: &mut OutTile<'_>,
    rows: Range<usize>,
    cols: Range<usize>,
    depth: Range<usize>,
) {
    for i in rows {
        let a_row = &a[i * n..(i + 1) * n];
        let base = (i - out.row0) * out.stride;
        for j in cols.clone() {
            let idx = base + (j - out.col0);
            let mut acc = out.data[idx];
            for k in depth.clone() {
                acc += a_row[k] * b[k * p + j];
            }
            out.data[idx] = acc;
        }
    }
}

/// Sequential blocked multiply: `c += a @ b`.
///
/// Iterates block-row, block-column, block-depth, then the element ranges
/// inside each block. `c` must be zeroed by the caller for a plain product.
pub fn blocked(
    a: &[f32],
    b: &[f32],
    c: &mut [f32],
    m: usize,
    n: usize,
    p: usize,
    block: BlockSize,
) {
    let mut out = OutTile::full(c, p);
    for rows in block.ranges(m) {
        for cols in block.ranges(p) {
            for depth in block.ranges(n) {
                accumulate_block(a, b, n, p, &mut out, rows.clone(), cols.clone(), depth);
            }
        }
    }
}

/// Blocked multiply of the C rows `rows` only, written into `strip`.
///
/// `strip` holds exactly those rows of C (`rows.len() * p` elements).
pub fn blocked_rows(
    a: &[f32],
    b: &[f32],
    strip: &mut [f32],
    rows: Range<usize>,
    n: usize,
    p: usize,
    block: BlockSize,
) {
    let mut out = OutTile::new(strip, rows.start, 0, p);
    for cols in block.ranges(p) {
        for depth in block.ranges(n) {
            accumulate_block(a, b, n, p, &mut out, rows.clone(), cols.clone(), depth);
        }
    }
}
