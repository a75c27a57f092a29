//! serframe-ffi: C-ABI exports for the serframe protocol core.
//!
//! One opaque handle wraps a protocol instance. Outgoing frames and accepted
//! incoming frames are delivered through C callbacks; transport is up to the
//! caller.

mod args;
mod error;
mod protocol;
mod types;

use std::ffi::CString;
use std::os::raw::c_char;
use std::panic::AssertUnwindSafe;
use std::sync::OnceLock;

pub use protocol::{
    sf_crc16, sf_feed, sf_protocol_free, sf_protocol_new, sf_send, sf_set_broadcast_address,
    sf_set_own_address,
};
pub use types::{
    SfFrameCallback, SfProtocolHandle, SfResult, SF_ERR_ILLEGAL_LENGTH, SF_ERR_INTERNAL,
    SF_ERR_INVALID_ARGUMENT, SF_ERR_NULL_PAYLOAD, SF_OK,
};

fn ffi_boundary<T>(on_panic: T, f: impl FnOnce() -> T) -> T {
    match std::panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => value,
        Err(_) => {
            error::set_panic_error();
            on_panic
        }
    }
}

/// Protocol version as a static `vMMM.mmm.rrr` C string.
#[no_mangle]
pub extern "C" fn sf_version() -> *const c_char {
    static VERSION: OnceLock<CString> = OnceLock::new();
    ffi_boundary(std::ptr::null(), || {
        VERSION
            .get_or_init(|| CString::new(serframe_frame::protocol_version()).unwrap_or_default())
            .as_ptr()
    })
}

/// Message for the last failed call on this thread. Empty after success.
#[no_mangle]
pub extern "C" fn sf_last_error() -> *const c_char {
    ffi_boundary(std::ptr::null(), error::last_error_ptr)
}
