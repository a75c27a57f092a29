use std::io::{ErrorKind, Read};

use serframe_transport::SerialStream;

use crate::address::AddressConfig;
use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::queue::FrameQueue;
use crate::receiver::{FrameReceiver, ReceiverStats};

const READ_CHUNK_SIZE: usize = 1024;

/// Reads addressed frames from any `Read` stream.
///
/// Bytes are run through a [`FrameReceiver`]; corrupt frames, foreign
/// addresses and line noise are skipped. Callers only ever see frames
/// addressed to this node or to the broadcast address.
pub struct FrameReader<T> {
    inner: T,
    receiver: FrameReceiver,
    addresses: AddressConfig,
    queue: FrameQueue,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            receiver: FrameReceiver::new(config),
            addresses: AddressConfig::default(),
            queue: FrameQueue::new(config),
        }
    }

    /// Read the next accepted frame (blocking).
    ///
    /// Returns `Err(FrameError::ConnectionClosed)` when EOF is reached. A
    /// partially received frame stays buffered and is completed by a later
    /// call if the stream resumes.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            if let Some(frame) = self.queue.pop() {
                return Ok(frame);
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::ConnectionClosed);
            }

            self.receiver
                .feed(&chunk[..read], &self.addresses, &mut self.queue);
        }
    }

    /// Set the address whose frames are accepted.
    pub fn set_own_address(&mut self, addr: u8) {
        self.addresses.set_own_address(addr);
    }

    /// Set the address every node accepts.
    pub fn set_broadcast_address(&mut self, addr: u8) {
        self.addresses.set_broadcast_address(addr);
    }

    pub fn addresses(&self) -> &AddressConfig {
        &self.addresses
    }

    /// Drop any partially received frame.
    pub fn reset(&mut self) {
        self.receiver.reset();
    }

    /// Receive-side counters.
    pub fn stats(&self) -> &ReceiverStats {
        self.receiver.stats()
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        self.receiver.config()
    }
}

impl FrameReader<SerialStream> {
    /// Create a frame reader for a `SerialStream` and apply the read timeout
    /// from config.
    pub fn with_config_serial(mut inner: SerialStream, config: FrameConfig) -> Result<Self> {
        inner
            .set_read_timeout(config.read_timeout)
            .map_err(transport_to_frame_error)?;
        Ok(Self::with_config(inner, config))
    }
}

pub(crate) fn transport_to_frame_error(err: serframe_transport::TransportError) -> FrameError {
    match err {
        serframe_transport::TransportError::Io(io) => FrameError::Io(io),
        serframe_transport::TransportError::Open { source, .. }
        | serframe_transport::TransportError::Configure { source, .. } => FrameError::Io(source),
        other => FrameError::Io(std::io::Error::other(other.to_string())),
    }
}
