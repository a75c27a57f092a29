use bytes::BytesMut;
use tracing::debug;

use crate::codec::{encode_frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Receives complete frames that are ready to be placed on the bus.
///
/// Called synchronously, exactly once per successful send, with the exact
/// frame bytes. The outcome of the physical write is not reported back.
pub trait FrameTransmit {
    fn on_frame_to_transmit(&mut self, frame: &[u8]);
}

impl<F: FnMut(&[u8])> FrameTransmit for F {
    fn on_frame_to_transmit(&mut self, frame: &[u8]) {
        self(frame)
    }
}

/// Builds wire frames in a bounded, reusable buffer.
///
/// The buffer is sized once for the largest frame allowed by the
/// configuration and never grows past it.
#[derive(Debug)]
pub struct FrameSerializer {
    config: FrameConfig,
    buf: BytesMut,
}

impl FrameSerializer {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            buf: BytesMut::with_capacity(config.max_frame_size()),
            config,
        }
    }

    /// Build a frame and return its bytes.
    ///
    /// `length` is the declared payload length. Exactly `length` bytes of
    /// `payload` are copied; extra bytes are ignored.
    ///
    /// # Errors
    /// - [`FrameError::IllegalLength`] if `length` exceeds the configured maximum.
    /// - [`FrameError::NullPayload`] if `length > 0` and `payload` is `None`.
    /// - [`FrameError::TruncatedPayload`] if `payload` is shorter than `length`.
    pub fn build(
        &mut self,
        source: u8,
        destination: u8,
        msg_type: u8,
        payload: Option<&[u8]>,
        length: usize,
    ) -> Result<&[u8]> {
        let max = usize::from(self.config.max_payload_size);
        if length > max {
            return Err(FrameError::IllegalLength { length, max });
        }

        let body = match payload {
            _ if length == 0 => &[][..],
            None => return Err(FrameError::NullPayload { length }),
            Some(bytes) if bytes.len() < length => {
                return Err(FrameError::TruncatedPayload {
                    declared: length,
                    available: bytes.len(),
                })
            }
            Some(bytes) => &bytes[..length],
        };

        self.buf.clear();
        encode_frame(
            &self.config,
            source,
            destination,
            msg_type,
            body,
            &mut self.buf,
        )?;
        Ok(&self.buf[..])
    }

    /// Build a frame and hand it to `tx`.
    ///
    /// Nothing is transmitted when building fails.
    pub fn send<T: FrameTransmit + ?Sized>(
        &mut self,
        source: u8,
        destination: u8,
        msg_type: u8,
        payload: Option<&[u8]>,
        length: usize,
        tx: &mut T,
    ) -> Result<()> {
        let frame = self.build(source, destination, msg_type, payload, length)?;
        debug!(
            source,
            destination,
            msg_type,
            payload_len = length,
            "transmitting frame"
        );
        tx.on_frame_to_transmit(frame);
        Ok(())
    }

    /// Configuration used to build frames.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
