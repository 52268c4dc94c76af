use std::fmt;

/// Dimensions of a row-major matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dims {
    pub rows: usize,
    pub cols: usize,
}

impl Dims {
    pub fn new(rows: usize, cols: usize) -> Self {
        Dims { rows, cols }
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.rows * self.cols
    }

    /// Element count, or `None` if it does not fit in `usize`.
    pub fn checked_numel(&self) -> Option<usize> {
        self.rows.checked_mul(self.cols)
    }

    /// Returns true if either dimension is zero.
    pub fn is_empty(&self) -> bool {
        self.numel() == 0
    }

    /// Flat row-major offset of `(row, col)`, or `None` when out of bounds.
    pub fn offset(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.rows && col < self.cols {
            Some(row * self.cols + col)
        } else {
            None
        }
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} x {}]", self.rows, self.cols)
    }
}

impl From<(usize, usize)> for Dims {
    fn from((rows, cols): (usize, usize)) -> Self {
        Dims::new(rows, cols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numel() {
        let d = Dims::new(3, 4);
        assert_eq!(d.numel(), 12);
        assert!(!d.is_empty());
        assert!(Dims::new(0, 4).is_empty());
        assert_eq!(d.checked_numel(), Some(12));
        assert_eq!(Dims::new(usize::MAX, 2).checked_numel(), None);
    }

    #[test]
    fn test_offset() {
        let d = Dims::new(2, 3);
        assert_eq!(d.offset(0, 0), Some(0));
        assert_eq!(d.offset(1, 2), Some(5));
        assert_eq!(d.offset(2, 0), None);
        assert_eq!(d.offset(0, 3), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Dims::new(100, 7).to_string(), "[100 x 7]");
    }

    #[test]
    fn test_from_tuple() {
        let d: Dims = (5, 6).into();
        assert_eq!(d, Dims::new(5, 6));
    }
}
