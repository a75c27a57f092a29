use std::ffi::c_void;

use serframe_frame::{FrameSink, FrameTransmit, Protocol};

#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SfResult {
    Ok = 0,
    InvalidArgument = 1,
    IllegalLength = 2,
    NullPayload = 3,
    Internal = 99,
}

#[allow(dead_code)]
pub const SF_OK: SfResult = SfResult::Ok;
#[allow(dead_code)]
pub const SF_ERR_INVALID_ARGUMENT: SfResult = SfResult::InvalidArgument;
#[allow(dead_code)]
pub const SF_ERR_ILLEGAL_LENGTH: SfResult = SfResult::IllegalLength;
#[allow(dead_code)]
pub const SF_ERR_NULL_PAYLOAD: SfResult = SfResult::NullPayload;
#[allow(dead_code)]
pub const SF_ERR_INTERNAL: SfResult = SfResult::Internal;

/// Called with a complete frame: `(user_data, bytes, len)`.
///
/// The bytes are only valid for the duration of the call.
pub type SfFrameCallback = Option<unsafe extern "C" fn(*mut c_void, *const u8, usize)>;

pub type SfProtocolHandle = *mut c_void;

/// Forwards frames to a C callback together with the caller's context pointer.
pub(crate) struct CallbackSlot {
    pub(crate) callback: unsafe extern "C" fn(*mut c_void, *const u8, usize),
    pub(crate) user_data: *mut c_void,
}

impl CallbackSlot {
    fn invoke(&mut self, frame: &[u8]) {
        // SAFETY: The callback and user_data were supplied together by the
        // caller of `sf_protocol_new`; `frame` outlives the call.
        unsafe { (self.callback)(self.user_data, frame.as_ptr(), frame.len()) }
    }
}

pub(crate) struct Transmit(pub(crate) CallbackSlot);
pub(crate) struct Sink(pub(crate) CallbackSlot);

impl FrameTransmit for Transmit {
    fn on_frame_to_transmit(&mut self, frame: &[u8]) {
        self.0.invoke(frame);
    }
}

impl FrameSink for Sink {
    fn on_frame_received(&mut self, frame: &[u8]) {
        self.0.invoke(frame);
    }
}

pub(crate) struct ProtocolHandle {
    pub(crate) protocol: Protocol<Transmit, Sink>,
}
