use bmm_matrix::Matrix;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Every element is 1.
pub fn ones(rows: usize, cols: usize) -> Matrix {
    Matrix::ones(rows, cols)
}

/// Every element is `value`.
pub fn filled(rows: usize, cols: usize, value: f32) -> Matrix {
    Matrix::filled(rows, cols, value)
}

/// Each column is the sequence `1, 2, ..., rows`: element `(k, j)` is `k + 1`.
///
/// Multiplying an all-ones `[m, n]` matrix by `column_sequence(n, p)` gives
/// `closed_form_sum(n)` in every cell.
pub fn column_sequence(rows: usize, cols: usize) -> Matrix {
    Matrix::from_fn(rows, cols, |k, _| (k + 1) as f32)
}

/// `1 + 2 + ... + n`, the value of every cell of `ones @ column_sequence`.
pub fn closed_form_sum(n: usize) -> f32 {
    (n * (n + 1) / 2) as f32
}

/// Uniform values in `[-1, 1)` from a seeded generator.
pub fn random(rows: usize, cols: usize, seed: u64) -> Matrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::new(-1.0f32, 1.0);
    Matrix::from_fn(rows, cols, |_, _| dist.sample(&mut rng))
}

/// Integers in `[-max, max]` stored as f32. `max` is clamped to `i32::MAX`.
///
/// As long as `n * max^2` stays below 2^24 every partial sum is exact, so
/// products of these matrices compare equal regardless of summation order.
pub fn random_integers(rows: usize, cols: usize, seed: u64, max: u32) -> Matrix {
    let mut rng = StdRng::seed_from_u64(seed);
    let max = i32::try_from(max).unwrap_or(i32::MAX);
    let dist = Uniform::new_inclusive(-max, max);
    Matrix::from_fn(rows, cols, |_, _| dist.sample(&mut rng) as f32)
}
