use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

use serframe_frame::FrameError;

use crate::types::SfResult;

thread_local! {
    static LAST_ERROR: RefCell<CString> = RefCell::new(CString::default());
}

pub(crate) fn clear_error_state() {
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::default();
    });
}

pub(crate) fn set_error_message(message: impl Into<String>) {
    let message = message.into();
    let sanitized = message.replace('\0', "?");
    LAST_ERROR.with(|state| {
        *state.borrow_mut() = CString::new(sanitized).unwrap_or_default();
    });
}

pub(crate) fn set_invalid_argument(message: impl Into<String>) -> SfResult {
    set_error_message(message);
    SfResult::InvalidArgument
}

pub(crate) fn set_panic_error() {
    set_error_message("panic across FFI boundary");
}

pub(crate) fn map_frame_error(err: &FrameError) -> SfResult {
    set_error_message(err.to_string());
    match err {
        FrameError::IllegalLength { .. } => SfResult::IllegalLength,
        FrameError::NullPayload { .. } => SfResult::NullPayload,
        FrameError::TruncatedPayload { .. } | FrameError::Malformed(_) => {
            SfResult::InvalidArgument
        }
        FrameError::Io(_) | FrameError::ConnectionClosed => SfResult::Internal,
    }
}

pub(crate) fn last_error_ptr() -> *const c_char {
    LAST_ERROR.with(|state| state.borrow().as_ptr())
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    fn last_error() -> String {
        // SAFETY: Points at the thread-local CString, valid until the next update.
        unsafe { CStr::from_ptr(last_error_ptr()) }
            .to_string_lossy()
            .into_owned()
    }

    #[test]
    fn maps_length_errors_to_dedicated_codes() {
        let illegal = FrameError::IllegalLength { length: 300, max: 256 };
        assert_eq!(map_frame_error(&illegal), SfResult::IllegalLength);
        assert!(last_error().contains("300"));

        let null = FrameError::NullPayload { length: 4 };
        assert_eq!(map_frame_error(&null), SfResult::NullPayload);
    }

    #[test]
    fn interior_nul_is_sanitized() {
        set_error_message("bad\0byte");
        assert_eq!(last_error(), "bad?byte");
        clear_error_state();
        assert!(last_error().is_empty());
    }
}
