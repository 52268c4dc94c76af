pub mod matmul;

pub use matmul::{accumulate_block, blocked, blocked_rows, OutTile};

/// Unblocked triple-loop product of row-major `a` [m, n] and `b` [n, p].
///
/// Each cell starts at zero and adds its k terms left to right, the same
/// order the blocked kernel uses, so both produce identical bits. Intended
/// as a reference, not for performance.
pub fn naive(a: &[f32], b: &[f32], m: usize, n: usize, p: usize) -> Vec<f32> {
    let mut c = vec![0.0f32; m * p];
    for i in 0..m {
        for j in 0..p {
            let mut sum = 0.0f32;
            for k in 0..n {
                sum += a[i * n + k] * b[k * p + j];
            }
            c[i * p + j] = sum;
        }
    }
    c
}
