use std::fmt;

use bmm_matrix::{cpu, BlockSize, Dims, MatmulError, Matrix, Result};

/// `|a - b| < tolerance`. NaN never matches.
pub fn values_match(a: f32, b: f32, tolerance: f32) -> bool {
    (a - b).abs() < tolerance
}

/// How the verifier recomputes the expected product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Reference {
    /// Unblocked triple loop.
    #[default]
    Naive,
    /// Sequential blocked loop nest with the given block size.
    Blocked(BlockSize),
}

/// One cell whose result disagrees with the reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mismatch {
    pub row: usize,
    pub col: usize,
    pub expected: f32,
    pub actual: f32,
}

/// Outcome of a verification run.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    /// Number of cells compared.
    pub checked: usize,
    /// Total number of cells outside tolerance.
    pub mismatch_count: usize,
    /// The first mismatches in row-major order, at most `max_reported`.
    pub mismatches: Vec<Mismatch>,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.mismatch_count == 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for m in &self.mismatches {
            writeln!(
                f,
                "Fail - The result is incorrect for element: [{}, {}], expected: {}, but found: {}",
                m.row, m.col, m.expected, m.actual
            )?;
        }
        if self.passed() {
            write!(f, "Success - The results are correct!")
        } else {
            write!(
                f,
                "Fail - The results mismatch! ({} of {} elements)",
                self.mismatch_count, self.checked
            )
        }
    }
}

/// Recomputes products sequentially and compares them element by element.
#[derive(Debug, Clone)]
pub struct Verifier {
    tolerance: f32,
    max_reported: usize,
    reference: Reference,
}

impl Default for Verifier {
    fn default() -> Self {
        Self {
            tolerance: f32::EPSILON,
            max_reported: 5,
            reference: Reference::Naive,
        }
    }
}

impl Verifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute tolerance for `values_match`.
    pub fn with_tolerance(mut self, tolerance: f32) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// How many mismatches to itemize in the report.
    pub fn with_max_reported(mut self, max_reported: usize) -> Self {
        self.max_reported = max_reported;
        self
    }

    pub fn with_reference(mut self, reference: Reference) -> Self {
        self.reference = reference;
        self
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// Sequentially recompute `a @ b` with the configured reference.
    ///
    /// # Errors
    /// - `InvalidDimensions` if `a.cols() != b.rows()`
    /// - `TooLarge` if the product's element count overflows `usize`
    pub fn expected(&self, a: &Matrix, b: &Matrix) -> Result<Matrix> {
        let (m, n, p) = (a.rows(), a.cols(), b.cols());
        if n != b.rows() {
            return Err(MatmulError::InvalidDimensions {
                m,
                n,
                n2: b.rows(),
                p,
            });
        }
        let out = Dims::new(m, p);
        if out.checked_numel().is_none() {
            return Err(MatmulError::TooLarge(out));
        }
        let data = match self.reference {
            Reference::Naive => cpu::naive(a.as_slice(), b.as_slice(), m, n, p),
            Reference::Blocked(block) => {
                let mut c = vec![0.0; m * p];
                cpu::blocked(a.as_slice(), b.as_slice(), &mut c, m, n, p, block);
                c
            }
        };
        Matrix::new(m, p, data)
    }

    /// Check `actual` against a freshly computed reference product.
    pub fn verify(&self, a: &Matrix, b: &Matrix, actual: &Matrix) -> Result<Report> {
        let expected = self.expected(a, b)?;
        self.compare(&expected, actual)
    }

    /// Compare two matrices cell by cell.
    ///
    /// # Errors
    /// Returns `ShapeMismatch` if the dimensions differ; that is a usage
    /// error, not a verification outcome.
    pub fn compare(&self, expected: &Matrix, actual: &Matrix) -> Result<Report> {
        if expected.dims() != actual.dims() {
            return Err(MatmulError::ShapeMismatch {
                expected: expected.dims(),
                got: actual.dims(),
            });
        }

        let cols = expected.cols();
        let mut report = Report {
            checked: 0,
            mismatch_count: 0,
            mismatches: Vec::new(),
        };
        for (idx, (&e, &a)) in expected.as_slice().iter().zip(actual.as_slice()).enumerate() {
            report.checked += 1;
            if values_match(e, a, self.tolerance) {
                continue;
            }
            report.mismatch_count += 1;
            if report.mismatches.len() < self.max_reported {
                report.mismatches.push(Mismatch {
                    row: idx / cols,
                    col: idx % cols,
                    expected: e,
                    actual: a,
                });
            }
        }
        Ok(report)
    }
}
