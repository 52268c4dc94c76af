use std::ops::Index;

use crate::error::{MatmulError, Result};
use crate::multiplier::BlockedMultiplier;
use crate::shape::Dims;

/// A dense, row-major f32 matrix.
///
/// The dimensions are fixed at creation and always satisfy
/// `rows * cols == data.len()`. There is no public way to resize a matrix or
/// to write into it; results are produced by the multiplier as fresh values.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    data: Vec<f32>,
    dims: Dims,
}

impl Matrix {
    /// Create a matrix from row-major data.
    ///
    /// # Errors
    /// Returns `BufferLength` if `data.len() != rows * cols`.
    pub fn new(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        let dims = Dims::new(rows, cols);
        if data.len() != dims.numel() {
            return Err(MatmulError::BufferLength {
                dims,
                expected: dims.numel(),
                got: data.len(),
            });
        }
        Ok(Matrix { data, dims })
    }

    /// Create a zero-filled matrix.
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 0.0)
    }

    /// Create a matrix filled with ones.
    pub fn ones(rows: usize, cols: usize) -> Self {
        Self::filled(rows, cols, 1.0)
    }

    /// Create a matrix with every element set to `value`.
    pub fn filled(rows: usize, cols: usize, value: f32) -> Self {
        let dims = Dims::new(rows, cols);
        Matrix {
            data: vec![value; dims.numel()],
            dims,
        }
    }

    /// Create a matrix whose element `(i, j)` is `f(i, j)`.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for i in 0..rows {
            for j in 0..cols {
                data.push(f(i, j));
            }
        }
        Matrix {
            data,
            dims: Dims::new(rows, cols),
        }
    }

    pub fn rows(&self) -> usize {
        self.dims.rows
    }

    pub fn cols(&self) -> usize {
        self.dims.cols
    }

    pub fn dims(&self) -> Dims {
        self.dims
    }

    /// Element `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        self.dims.offset(row, col).map(|idx| self.data[idx])
    }

    /// Row `i` as a slice.
    ///
    /// # Panics
    /// Panics if `i >= rows()`.
    pub fn row(&self, i: usize) -> &[f32] {
        let cols = self.dims.cols;
        &self.data[i * cols..(i + 1) * cols]
    }

    /// The underlying row-major buffer.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume the matrix, returning its row-major buffer.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Matrix product `self @ other` using the given multiplier.
    ///
    /// self is [m, n], other is [n, p], result is [m, p].
    pub fn matmul(&self, other: &Matrix, multiplier: &BlockedMultiplier) -> Result<Matrix> {
        multiplier.multiply(self, other)
    }
}

impl Index<(usize, usize)> for Matrix {
    type Output = f32;

    fn index(&self, (row, col): (usize, usize)) -> &f32 {
        match self.dims.offset(row, col) {
            Some(idx) => &self.data[idx],
            None => panic!(
                "index ({}, {}) out of bounds for matrix {}",
                row, col, self.dims
            ),
        }
    }
}
