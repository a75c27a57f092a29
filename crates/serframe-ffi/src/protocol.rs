use std::ffi::c_void;

use serframe_frame::{FrameConfig, Protocol};

use crate::args;
use crate::error;
use crate::types::{
    CallbackSlot, ProtocolHandle, SfFrameCallback, SfProtocolHandle, SfResult, Sink, Transmit,
};

fn with_protocol_mut<T>(
    handle: SfProtocolHandle,
    on_error: T,
    f: impl FnOnce(&mut ProtocolHandle) -> T,
) -> T {
    if handle.is_null() {
        let _ = error::set_invalid_argument("protocol handle cannot be null");
        return on_error;
    }

    let protocol_handle = {
        // SAFETY: Pointer validity is guaranteed by the caller.
        unsafe { &mut *(handle as *mut ProtocolHandle) }
    };

    f(protocol_handle)
}

/// Create a protocol instance.
///
/// `tx_cb` receives every frame built by `sf_send`; `rx_cb` receives every
/// frame accepted by `sf_feed`. Both get `user_data` as their first argument.
/// Returns null if either callback is missing.
///
/// # Safety
/// The callbacks must be safe to call with `user_data` until the handle is
/// freed. They must not call back into the same handle.
#[no_mangle]
pub unsafe extern "C" fn sf_protocol_new(
    max_payload: u16,
    tx_cb: SfFrameCallback,
    rx_cb: SfFrameCallback,
    user_data: *mut c_void,
) -> SfProtocolHandle {
    crate::ffi_boundary(std::ptr::null_mut(), || {
        error::clear_error_state();

        let (Some(tx), Some(rx)) = (tx_cb, rx_cb) else {
            let _ = error::set_invalid_argument("tx_cb and rx_cb are required");
            return std::ptr::null_mut();
        };

        let protocol = Protocol::new(
            FrameConfig::with_max_payload(max_payload),
            Transmit(CallbackSlot {
                callback: tx,
                user_data,
            }),
            Sink(CallbackSlot {
                callback: rx,
                user_data,
            }),
        );
        Box::into_raw(Box::new(ProtocolHandle { protocol })) as SfProtocolHandle
    })
}

/// Free a protocol handle.
///
/// # Safety
/// `handle` must be null or a handle returned by `sf_protocol_new`.
#[no_mangle]
pub unsafe extern "C" fn sf_protocol_free(handle: SfProtocolHandle) {
    crate::ffi_boundary((), || {
        if handle.is_null() {
            return;
        }

        // SAFETY: Caller guarantees this handle was allocated by sf_protocol_new.
        unsafe {
            drop(Box::from_raw(handle as *mut ProtocolHandle));
        }
    });
}

/// Set the address whose frames are delivered.
///
/// # Safety
/// `handle` must be a valid protocol handle.
#[no_mangle]
pub unsafe extern "C" fn sf_set_own_address(handle: SfProtocolHandle, addr: u8) -> SfResult {
    crate::ffi_boundary(SfResult::Internal, || {
        error::clear_error_state();
        with_protocol_mut(handle, SfResult::InvalidArgument, |h| {
            h.protocol.set_own_address(addr);
            SfResult::Ok
        })
    })
}

/// Set the address every node accepts.
///
/// # Safety
/// `handle` must be a valid protocol handle.
#[no_mangle]
pub unsafe extern "C" fn sf_set_broadcast_address(handle: SfProtocolHandle, addr: u8) -> SfResult {
    crate::ffi_boundary(SfResult::Internal, || {
        error::clear_error_state();
        with_protocol_mut(handle, SfResult::InvalidArgument, |h| {
            h.protocol.set_broadcast_address(addr);
            SfResult::Ok
        })
    })
}

/// Feed received bytes to the protocol. Accepted frames go to `rx_cb`.
///
/// # Safety
/// `handle` must be a valid protocol handle. If `len > 0`, `bytes` must be
/// readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn sf_feed(handle: SfProtocolHandle, bytes: *const u8, len: usize) -> SfResult {
    crate::ffi_boundary(SfResult::Internal, || {
        error::clear_error_state();
        with_protocol_mut(handle, SfResult::InvalidArgument, |h| {
            // SAFETY: Caller contract above.
            let Some(bytes) = (unsafe { args::bytes_arg(bytes, len, "bytes") }) else {
                return SfResult::InvalidArgument;
            };
            h.protocol.feed_buffer(bytes);
            SfResult::Ok
        })
    })
}

/// Build a frame and hand it to `tx_cb`.
///
/// A null `payload` is only valid with `len == 0`.
///
/// # Safety
/// `handle` must be a valid protocol handle. If `payload` is non-null it must
/// be readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn sf_send(
    handle: SfProtocolHandle,
    destination: u8,
    msg_type: u8,
    payload: *const u8,
    len: usize,
) -> SfResult {
    crate::ffi_boundary(SfResult::Internal, || {
        error::clear_error_state();
        with_protocol_mut(handle, SfResult::InvalidArgument, |h| {
            let max = usize::from(h.protocol.config().max_payload_size);
            let payload = if payload.is_null() || len > max {
                None
            } else {
                // SAFETY: Non-null and readable for `len` bytes per caller contract.
                Some(unsafe { std::slice::from_raw_parts(payload, len) })
            };

            match h
                .protocol
                .send_with_length(destination, msg_type, payload, len)
            {
                Ok(()) => SfResult::Ok,
                Err(err) => error::map_frame_error(&err),
            }
        })
    })
}

/// CRC16 over `len` bytes. Returns the initial value `0xFFFF` for empty input.
///
/// # Safety
/// If `len > 0`, `bytes` must be readable for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn sf_crc16(bytes: *const u8, len: usize) -> u16 {
    crate::ffi_boundary(serframe_frame::crc::CRC16_INIT, || {
        // SAFETY: Caller contract above.
        match unsafe { args::bytes_arg(bytes, len, "bytes") } {
            Some(data) => serframe_frame::crc16(data),
            None => serframe_frame::crc::CRC16_INIT,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorded {
        sent: Vec<Vec<u8>>,
        received: Vec<Vec<u8>>,
    }

    unsafe extern "C" fn record_sent(user_data: *mut c_void, bytes: *const u8, len: usize) {
        // SAFETY: Tests pass a live `Recorded` and valid frame bytes.
        let recorded = unsafe { &mut *(user_data as *mut Recorded) };
        recorded
            .sent
            .push(unsafe { std::slice::from_raw_parts(bytes, len) }.to_vec());
    }

    unsafe extern "C" fn record_received(user_data: *mut c_void, bytes: *const u8, len: usize) {
        // SAFETY: Tests pass a live `Recorded` and valid frame bytes.
        let recorded = unsafe { &mut *(user_data as *mut Recorded) };
        recorded
            .received
            .push(unsafe { std::slice::from_raw_parts(bytes, len) }.to_vec());
    }

    fn new_handle(recorded: &mut Recorded, max_payload: u16) -> SfProtocolHandle {
        // SAFETY: `recorded` outlives the handle in every test.
        unsafe {
            sf_protocol_new(
                max_payload,
                Some(record_sent),
                Some(record_received),
                recorded as *mut Recorded as *mut c_void,
            )
        }
    }

    #[test]
    fn send_then_feed_loops_back() {
        let mut recorded = Recorded::default();
        let handle = new_handle(&mut recorded, 256);
        assert!(!handle.is_null());

        let payload = b"hello";
        // SAFETY: Valid handle and payload.
        let result = unsafe { sf_send(handle, 0, 0x10, payload.as_ptr(), payload.len()) };
        assert_eq!(result, SfResult::Ok);
        assert_eq!(recorded.sent.len(), 1);

        let frame = recorded.sent[0].clone();
        // SAFETY: Valid handle and frame bytes.
        let result = unsafe { sf_feed(handle, frame.as_ptr(), frame.len()) };
        assert_eq!(result, SfResult::Ok);
        assert_eq!(recorded.received, vec![frame]);

        // SAFETY: Handle came from sf_protocol_new.
        unsafe { sf_protocol_free(handle) };
    }

    #[test]
    fn send_reports_length_errors() {
        let mut recorded = Recorded::default();
        let handle = new_handle(&mut recorded, 4);
        let payload = [0u8; 8];

        // SAFETY: Valid handle; payload readable for its length.
        unsafe {
            assert_eq!(
                sf_send(handle, 0, 0, payload.as_ptr(), payload.len()),
                SfResult::IllegalLength
            );
            assert_eq!(sf_send(handle, 0, 0, std::ptr::null(), 2), SfResult::NullPayload);
            assert_eq!(sf_send(handle, 0, 0, std::ptr::null(), 0), SfResult::Ok);
            sf_protocol_free(handle);
        }
        assert_eq!(recorded.sent.len(), 1);
    }

    #[test]
    fn address_filter_applies_to_feed() {
        let mut recorded = Recorded::default();
        let handle = new_handle(&mut recorded, 256);

        // SAFETY: Valid handle throughout.
        unsafe {
            assert_eq!(sf_send(handle, 0x07, 1, std::ptr::null(), 0), SfResult::Ok);
            let frame = recorded.sent[0].clone();

            sf_feed(handle, frame.as_ptr(), frame.len());
            assert!(recorded.received.is_empty());

            assert_eq!(sf_set_own_address(handle, 0x07), SfResult::Ok);
            sf_feed(handle, frame.as_ptr(), frame.len());
            assert_eq!(recorded.received.len(), 1);

            assert_eq!(sf_set_own_address(handle, 0x01), SfResult::Ok);
            assert_eq!(sf_set_broadcast_address(handle, 0x07), SfResult::Ok);
            sf_feed(handle, frame.as_ptr(), frame.len());
            assert_eq!(recorded.received.len(), 2);

            sf_protocol_free(handle);
        }
    }

    #[test]
    fn null_handles_and_callbacks_are_rejected() {
        // SAFETY: Null inputs are checked before use.
        unsafe {
            assert!(sf_protocol_new(256, None, Some(record_received), std::ptr::null_mut()).is_null());
            assert_eq!(sf_set_own_address(std::ptr::null_mut(), 1), SfResult::InvalidArgument);
            assert_eq!(sf_feed(std::ptr::null_mut(), std::ptr::null(), 0), SfResult::InvalidArgument);
            sf_protocol_free(std::ptr::null_mut());
        }
    }

    #[test]
    fn feed_rejects_null_bytes_with_length() {
        let mut recorded = Recorded::default();
        let handle = new_handle(&mut recorded, 256);

        // SAFETY: Valid handle; null bytes are rejected before reading.
        unsafe {
            assert_eq!(sf_feed(handle, std::ptr::null(), 3), SfResult::InvalidArgument);
            sf_protocol_free(handle);
        }
    }

    #[test]
    fn crc16_matches_check_value() {
        let data = b"123456789";
        // SAFETY: `data` is readable for its length.
        assert_eq!(unsafe { sf_crc16(data.as_ptr(), data.len()) }, 0x4B37);
        assert_eq!(unsafe { sf_crc16(std::ptr::null(), 0) }, 0xFFFF);
    }
}
