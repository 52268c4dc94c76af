mod context;
mod error;
mod types;

pub use context::*;
pub use error::*;
pub use types::*;

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};

use bmm_matrix::Matrix;
use bmm_verify::Verifier;

/// Execute a closure that returns a `BmmStatus`, catching any panics
/// and converting them into `BmmStatus::ErrorInternal`.
fn catch_panic<F: FnOnce() -> BmmStatus>(f: F) -> BmmStatus {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(status) => status,
        Err(_) => {
            set_last_error("internal panic".to_string());
            BmmStatus::ErrorInternal
        }
    }
}

/// Borrow `rows * cols` elements starting at `ptr` as a matrix.
///
/// # Safety
/// `ptr` must be valid for reads of `rows * cols` f32 values.
unsafe fn read_matrix(ptr: *const f32, rows: usize, cols: usize) -> Result<Matrix, BmmStatus> {
    let Some(len) = rows.checked_mul(cols) else {
        set_last_error(format!("matrix [{} x {}] overflows usize", rows, cols));
        return Err(BmmStatus::ErrorInvalidDimensions);
    };
    let data = std::slice::from_raw_parts(ptr, len).to_vec();
    Matrix::new(rows, cols, data).map_err(report)
}

/// Create a new multiply context.
///
/// On success, writes a heap-allocated `BmmContext` pointer into `*ctx_out`
/// and returns `BmmStatus::Ok`. The caller must later call
/// `bmm_context_destroy` to free the context.
#[no_mangle]
pub extern "C" fn bmm_context_create(
    kind: BmmExecutorKind,
    params: BmmParams,
    ctx_out: *mut *mut BmmContext,
) -> BmmStatus {
    catch_panic(|| {
        if ctx_out.is_null() {
            set_last_error("ctx_out is null".to_string());
            return BmmStatus::ErrorInvalidArgument;
        }
        let ctx = match BmmContext::new(kind, &params) {
            Ok(ctx) => Box::new(ctx),
            Err(e) => return report(e),
        };
        unsafe {
            *ctx_out = Box::into_raw(ctx);
        }
        BmmStatus::Ok
    })
}

/// Destroy a context previously created by `bmm_context_create`.
///
/// Passing a null pointer is a no-op and returns `BmmStatus::Ok`.
#[no_mangle]
pub unsafe extern "C" fn bmm_context_destroy(ctx: *mut BmmContext) -> BmmStatus {
    if ctx.is_null() {
        return BmmStatus::Ok;
    }
    drop(Box::from_raw(ctx));
    BmmStatus::Ok
}

/// Compute `C = A @ B` into the caller's buffer.
///
/// `a` holds `m * n` and `b` holds `n2 * p` row-major values; `c_out` must
/// have room for `c_len >= m * p` values. Nothing is written to `c_out`
/// unless the call returns `BmmStatus::Ok`.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn bmm_multiply(
    ctx: *mut BmmContext,
    a: *const f32,
    m: usize,
    n: usize,
    b: *const f32,
    n2: usize,
    p: usize,
    c_out: *mut f32,
    c_len: usize,
) -> BmmStatus {
    catch_panic(|| {
        if ctx.is_null() || a.is_null() || b.is_null() || c_out.is_null() {
            set_last_error("null argument".to_string());
            return BmmStatus::ErrorInvalidArgument;
        }
        let ctx = unsafe { &mut *ctx };
        let (a, b) = match unsafe { (read_matrix(a, m, n), read_matrix(b, n2, p)) } {
            (Ok(a), Ok(b)) => (a, b),
            (Err(status), _) | (_, Err(status)) => return status,
        };
        match m.checked_mul(p) {
            Some(needed) if needed <= c_len => {}
            _ => {
                set_last_error(format!(
                    "output buffer holds {} values, [{} x {}] needed",
                    c_len, m, p
                ));
                return BmmStatus::ErrorInvalidArgument;
            }
        }

        let product = match ctx.multiplier.multiply_timed(&a, &b) {
            Ok(product) => product,
            Err(e) => return report(e),
        };
        ctx.last_elapsed_ns = u64::try_from(product.elapsed.as_nanos()).unwrap_or(u64::MAX);
        let out = unsafe { std::slice::from_raw_parts_mut(c_out, m * p) };
        out.copy_from_slice(product.matrix.as_slice());
        BmmStatus::Ok
    })
}

/// Compute-phase duration of the context's most recent successful multiply,
/// in nanoseconds. Returns 0 for a null context.
#[no_mangle]
pub unsafe extern "C" fn bmm_last_elapsed_ns(ctx: *const BmmContext) -> u64 {
    if ctx.is_null() {
        return 0;
    }
    (*ctx).last_elapsed_ns
}

/// Check `c` (`m * p` values) against a sequential reference of `a @ b`.
///
/// Returns `BmmStatus::Ok` when every element is within `tolerance`
/// (`tolerance <= 0` selects `f32::EPSILON`), `BmmStatus::ErrorMismatch`
/// otherwise. The mismatch count is written to `*mismatches_out` when it is
/// non-null.
#[no_mangle]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn bmm_verify(
    a: *const f32,
    m: usize,
    n: usize,
    b: *const f32,
    p: usize,
    c: *const f32,
    tolerance: f32,
    mismatches_out: *mut usize,
) -> BmmStatus {
    catch_panic(|| {
        if a.is_null() || b.is_null() || c.is_null() {
            set_last_error("null argument".to_string());
            return BmmStatus::ErrorInvalidArgument;
        }
        let inputs = unsafe {
            (
                read_matrix(a, m, n),
                read_matrix(b, n, p),
                read_matrix(c, m, p),
            )
        };
        let (a, b, c) = match inputs {
            (Ok(a), Ok(b), Ok(c)) => (a, b, c),
            (Err(status), _, _) | (_, Err(status), _) | (_, _, Err(status)) => return status,
        };

        let mut verifier = Verifier::new();
        if tolerance > 0.0 {
            verifier = verifier.with_tolerance(tolerance);
        }
        let outcome = match verifier.verify(&a, &b, &c) {
            Ok(outcome) => outcome,
            Err(e) => return report(e),
        };
        if !mismatches_out.is_null() {
            unsafe { *mismatches_out = outcome.mismatch_count };
        }
        if outcome.passed() {
            BmmStatus::Ok
        } else {
            set_last_error(outcome.to_string());
            BmmStatus::ErrorMismatch
        }
    })
}

/// Retrieve the last error message.
///
/// Returns a pointer to a C string describing the most recent error, or
/// null if no error has occurred. The caller must free the returned string
/// with `bmm_free_string`.
#[no_mangle]
pub extern "C" fn bmm_last_error() -> *const c_char {
    match error::take_last_error() {
        Some(e) => e.into_raw(),
        None => std::ptr::null(),
    }
}

/// Free a string previously returned by `bmm_last_error`.
#[no_mangle]
pub unsafe extern "C" fn bmm_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CStr;

    fn last_error() -> Option<String> {
        let ptr = bmm_last_error();
        if ptr.is_null() {
            return None;
        }
        let msg = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
        unsafe { bmm_free_string(ptr as *mut c_char) };
        Some(msg)
    }

    fn create(kind: BmmExecutorKind, params: BmmParams) -> *mut BmmContext {
        let mut ctx = std::ptr::null_mut();
        assert_eq!(bmm_context_create(kind, params, &mut ctx), BmmStatus::Ok);
        assert!(!ctx.is_null());
        ctx
    }

    #[test]
    fn test_multiply_and_verify() {
        let a = [1.0f32, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let b = [9.0f32, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0];
        let expected = [30.0f32, 24.0, 18.0, 84.0, 69.0, 54.0, 138.0, 114.0, 90.0];

        for kind in [
            BmmExecutorKind::Sequential,
            BmmExecutorKind::RayonPool,
            BmmExecutorKind::ScopedThreads,
        ] {
            let params = BmmParams {
                block_size: 2,
                partition: BmmPartition::Tiles,
                workers: 2,
            };
            let ctx = create(kind, params);
            let mut c = [0.0f32; 9];
            let status = unsafe {
                bmm_multiply(ctx, a.as_ptr(), 3, 3, b.as_ptr(), 3, 3, c.as_mut_ptr(), c.len())
            };
            assert_eq!(status, BmmStatus::Ok);
            assert_eq!(c, expected);

            let mut mismatches = usize::MAX;
            let status = unsafe {
                bmm_verify(a.as_ptr(), 3, 3, b.as_ptr(), 3, c.as_ptr(), 0.0, &mut mismatches)
            };
            assert_eq!(status, BmmStatus::Ok);
            assert_eq!(mismatches, 0);
            assert_eq!(unsafe { bmm_context_destroy(ctx) }, BmmStatus::Ok);
        }
    }

    #[test]
    fn test_dimension_mismatch_leaves_output_untouched() {
        let ctx = create(BmmExecutorKind::Sequential, BmmParams::default());
        let a = [1.0f32; 6];
        let b = [1.0f32; 6];
        let mut c = [-1.0f32; 6];
        let status = unsafe {
            bmm_multiply(ctx, a.as_ptr(), 2, 3, b.as_ptr(), 2, 3, c.as_mut_ptr(), c.len())
        };
        assert_eq!(status, BmmStatus::ErrorInvalidDimensions);
        assert_eq!(c, [-1.0; 6]);
        assert!(last_error().unwrap().contains("dimension mismatch"));
        unsafe { bmm_context_destroy(ctx) };
    }

    #[test]
    fn test_short_output_buffer() {
        let ctx = create(BmmExecutorKind::Sequential, BmmParams::default());
        let a = [1.0f32; 4];
        let mut c = [0.0f32; 3];
        let status = unsafe {
            bmm_multiply(ctx, a.as_ptr(), 2, 2, a.as_ptr(), 2, 2, c.as_mut_ptr(), c.len())
        };
        assert_eq!(status, BmmStatus::ErrorInvalidArgument);
        unsafe { bmm_context_destroy(ctx) };
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let mut ctx = std::ptr::null_mut();
        let params = BmmParams {
            block_size: 0,
            ..BmmParams::default()
        };
        let status = bmm_context_create(BmmExecutorKind::Sequential, params, &mut ctx);
        assert_eq!(status, BmmStatus::ErrorInvalidArgument);
        assert!(ctx.is_null());
        assert!(last_error().unwrap().contains("block size"));
    }

    #[test]
    fn test_null_arguments() {
        assert_eq!(
            bmm_context_create(
                BmmExecutorKind::Sequential,
                BmmParams::default(),
                std::ptr::null_mut()
            ),
            BmmStatus::ErrorInvalidArgument
        );
        assert_eq!(unsafe { bmm_context_destroy(std::ptr::null_mut()) }, BmmStatus::Ok);
        assert_eq!(unsafe { bmm_last_elapsed_ns(std::ptr::null()) }, 0);
        let c = [0.0f32; 1];
        let status = unsafe {
            let null = std::ptr::null();
            bmm_verify(null, 1, 1, c.as_ptr(), 1, c.as_ptr(), 0.0, std::ptr::null_mut())
        };
        assert_eq!(status, BmmStatus::ErrorInvalidArgument);
    }

    #[test]
    fn test_verify_reports_mismatch() {
        let a = [1.0f32; 4];
        let c = [2.0f32, 2.0, 2.0, 5.0];
        let mut mismatches = 0;
        let status = unsafe {
            bmm_verify(a.as_ptr(), 2, 2, a.as_ptr(), 2, c.as_ptr(), 0.0, &mut mismatches)
        };
        assert_eq!(status, BmmStatus::ErrorMismatch);
        assert_eq!(mismatches, 1);
        let msg = last_error().unwrap();
        assert!(msg.contains("element: [1, 1], expected: 2, but found: 5"));
    }

    #[test]
    fn test_last_error_is_taken() {
        set_last_error("boom".to_string());
        assert_eq!(last_error().as_deref(), Some("boom"));
        assert!(last_error().is_none());
    }
}
