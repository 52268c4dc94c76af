use std::cell::RefCell;
use std::ffi::CString;

use bmm_matrix::MatmulError;

use crate::types::BmmStatus;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Store an error message for later retrieval via `bmm_last_error`.
pub fn set_last_error(msg: String) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Take the last error message, leaving `None` in its place.
pub fn take_last_error() -> Option<CString> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Record `err` as the last error and map it to a status code.
pub fn report(err: MatmulError) -> BmmStatus {
    let status = match err {
        MatmulError::InvalidDimensions { .. }
        | MatmulError::BufferLength { .. }
        | MatmulError::ShapeMismatch { .. }
        | MatmulError::TooLarge(_) => BmmStatus::ErrorInvalidDimensions,
        MatmulError::InvalidBlockSize(_) => BmmStatus::ErrorInvalidArgument,
        MatmulError::ExecutionFailure(_) => BmmStatus::ErrorExecution,
    };
    set_last_error(err.to_string());
    status
}
