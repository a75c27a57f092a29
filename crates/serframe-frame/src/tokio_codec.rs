use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::address::AddressConfig;
use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::queue::FrameQueue;
use crate::receiver::FrameReceiver;

/// A frame to send through [`SerialCodec`].
///
/// The source byte is taken from the codec's own address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    pub target: u8,
    pub msg_type: u8,
    pub payload: Bytes,
}

impl OutboundFrame {
    pub fn new(target: u8, msg_type: u8, payload: impl Into<Bytes>) -> Self {
        Self {
            target,
            msg_type,
            payload: payload.into(),
        }
    }
}

/// `tokio_util` codec for use with `Framed`, `FramedRead` and `FramedWrite`.
///
/// Decoding applies the same resynchronization and address filtering as
/// [`FrameReceiver`]. Input bytes are consumed as soon as they are seen, so
/// the codec keeps its own partial-frame state across calls.
#[derive(Debug)]
pub struct SerialCodec {
    config: FrameConfig,
    addresses: AddressConfig,
    receiver: FrameReceiver,
    ready: FrameQueue,
}

impl SerialCodec {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            config,
            addresses: AddressConfig::default(),
            receiver: FrameReceiver::new(config),
            ready: FrameQueue::new(config),
        }
    }

    /// Codec that accepts frames for `own` and `broadcast`.
    pub fn with_addresses(config: FrameConfig, own: u8, broadcast: u8) -> Self {
        Self {
            addresses: AddressConfig::new(own, broadcast),
            ..Self::new(config)
        }
    }

    pub fn addresses(&self) -> &AddressConfig {
        &self.addresses
    }

    pub fn addresses_mut(&mut self) -> &mut AddressConfig {
        &mut self.addresses
    }

    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

impl Default for SerialCodec {
    fn default() -> Self {
        Self::new(FrameConfig::default())
    }
}

impl Decoder for SerialCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        if let Some(frame) = self.ready.pop() {
            return Ok(Some(frame));
        }

        self.receiver
            .feed(&src[..], &self.addresses, &mut self.ready);
        src.advance(src.len());
        Ok(self.ready.pop())
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if self.receiver.pending_len() == 0 => Ok(None),
            None => {
                self.receiver.reset();
                Err(FrameError::ConnectionClosed)
            }
        }
    }
}

impl Encoder<OutboundFrame> for SerialCodec {
    type Error = FrameError;

    fn encode(&mut self, item: OutboundFrame, dst: &mut BytesMut) -> Result<()> {
        encode_frame(
            &self.config,
            self.addresses.own_address(),
            item.target,
            item.msg_type,
            item.payload.as_ref(),
            dst,
        )?;
        Ok(())
    }
}
