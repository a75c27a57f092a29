use std::io::{ErrorKind, Write};

use tracing::debug;

use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::serializer::FrameSerializer;

/// Writes addressed frames to any `Write` stream.
///
/// Every frame carries this writer's own address as its source.
pub struct FrameWriter<T> {
    inner: T,
    serializer: FrameSerializer,
    own_address: u8,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            serializer: FrameSerializer::new(config),
            own_address: 0,
        }
    }

    /// Encode and send a payload to `destination` (blocking).
    pub fn send(&mut self, destination: u8, msg_type: u8, payload: &[u8]) -> Result<()> {
        self.send_with_length(destination, msg_type, Some(payload), payload.len())
    }

    /// Encode and send `length` bytes of `payload`.
    ///
    /// Follows the same validation as [`FrameSerializer::build`]; nothing is
    /// written when it fails.
    pub fn send_with_length(
        &mut self,
        destination: u8,
        msg_type: u8,
        payload: Option<&[u8]>,
        length: usize,
    ) -> Result<()> {
        let frame =
            self.serializer
                .build(self.own_address, destination, msg_type, payload, length)?;
        write_all(&mut self.inner, frame)?;
        debug!(
            source = self.own_address,
            destination,
            msg_type,
            payload_len = length,
            "wrote frame"
        );
        self.flush()
    }

    /// Re-send a parsed frame, keeping its type and payload.
    ///
    /// The source byte is replaced by this writer's own address.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.target, frame.msg_type, frame.payload.as_ref())
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Set the source address stamped on outgoing frames.
    pub fn set_own_address(&mut self, addr: u8) {
        self.own_address = addr;
    }

    pub fn own_address(&self) -> u8 {
        self.own_address
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        self.serializer.config()
    }
}

fn write_all<T: Write>(inner: &mut T, bytes: &[u8]) -> Result<()> {
    let mut offset = 0usize;
    while offset < bytes.len() {
        match inner.write(&bytes[offset..]) {
            Ok(0) => return Err(FrameError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
            Err(err) => return Err(FrameError::Io(err)),
        }
    }
    Ok(())
}
