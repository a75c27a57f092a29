//! Addressed, CRC16-checked message framing for serial byte streams.
//!
//! This is the core layer of serframe. Every message is framed with:
//! - A 3-byte preamble (`AA 55 FF` by default) for stream synchronization
//! - Source, target and message-type bytes
//! - A 2-byte big-endian payload length
//! - A 2-byte big-endian CRC16 over everything before it
//!
//! The receiver resynchronizes on line noise, drops corrupt or foreign
//! frames silently, and delivers complete frames through a callback. Sending
//! and receiving share nothing, so one [`Protocol`] can be driven from a
//! byte-at-a-time interrupt path and a send path alike.

pub mod address;
pub mod codec;
pub mod crc;
pub mod error;
pub mod protocol;
pub mod queue;
pub mod reader;
pub mod receiver;
pub mod serializer;
#[cfg(feature = "async")]
pub mod tokio_codec;
pub mod writer;

pub use address::AddressConfig;
pub use codec::{
    encode_frame, Frame, FrameConfig, DEFAULT_MAX_PAYLOAD, DEFAULT_PREAMBLE, HEADER_SIZE,
    OVERHEAD,
};
pub use crc::{crc16, crc16_update};
pub use error::{FrameError, Result};
pub use protocol::Protocol;
pub use queue::FrameQueue;
pub use reader::FrameReader;
pub use receiver::{FrameReceiver, FrameSink, ReceiverStats, RxState};
pub use serializer::{FrameSerializer, FrameTransmit};
#[cfg(feature = "async")]
pub use tokio_codec::{OutboundFrame, SerialCodec};
pub use writer::FrameWriter;

/// Protocol library version as `vMMM.mmm.rrr`.
pub fn protocol_version() -> String {
    let part = |s: &str| s.parse::<u32>().unwrap_or(0);
    format!(
        "v{:03}.{:03}.{:03}",
        part(env!("CARGO_PKG_VERSION_MAJOR")),
        part(env!("CARGO_PKG_VERSION_MINOR")),
        part(env!("CARGO_PKG_VERSION_PATCH")),
    )
}
