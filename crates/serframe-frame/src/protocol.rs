use crate::address::AddressConfig;
use crate::codec::FrameConfig;
use crate::error::Result;
use crate::receiver::{FrameReceiver, FrameSink, ReceiverStats};
use crate::serializer::{FrameSerializer, FrameTransmit};

/// One protocol endpoint: addressing, receive state and send buffer.
///
/// Each instance is independent, so several serial ports can be served from
/// one process. An instance is not internally synchronized; feed it from a
/// single ingestion path and send from a single path, or wrap it in a mutex.
///
/// ```
/// use serframe_frame::{FrameConfig, Protocol};
///
/// let mut wire = Vec::new();
/// let mut tx = Protocol::new(
///     FrameConfig::default(),
///     |f: &[u8]| wire.extend_from_slice(f),
///     |_: &[u8]| {},
/// );
/// tx.set_own_address(0xEE);
/// tx.send(0x00, 1, &[]).unwrap();
/// drop(tx);
///
/// let mut received = Vec::new();
/// let mut rx = Protocol::new(
///     FrameConfig::default(),
///     |_: &[u8]| {},
///     |f: &[u8]| received.push(f.to_vec()),
/// );
/// rx.feed_buffer(&wire);
/// drop(rx);
/// assert_eq!(received, vec![wire]);
/// ```
#[derive(Debug)]
pub struct Protocol<T, S> {
    addresses: AddressConfig,
    receiver: FrameReceiver,
    serializer: FrameSerializer,
    transmit: T,
    sink: S,
}

impl<T: FrameTransmit, S: FrameSink> Protocol<T, S> {
    /// Create an endpoint. `transmit` gets outbound frames, `sink` gets
    /// validated inbound frames.
    pub fn new(config: FrameConfig, transmit: T, sink: S) -> Self {
        Self {
            addresses: AddressConfig::default(),
            receiver: FrameReceiver::new(config),
            serializer: FrameSerializer::new(config),
            transmit,
            sink,
        }
    }

    pub fn set_own_address(&mut self, addr: u8) {
        self.addresses.set_own_address(addr);
    }

    pub fn set_broadcast_address(&mut self, addr: u8) {
        self.addresses.set_broadcast_address(addr);
    }

    pub fn addresses(&self) -> &AddressConfig {
        &self.addresses
    }

    /// Feed one received byte. Returns true if a frame was delivered.
    pub fn feed_byte(&mut self, byte: u8) -> bool {
        self.receiver.feed_byte(byte, &self.addresses, &mut self.sink)
    }

    /// Feed received bytes. Returns the number of frames delivered.
    pub fn feed_buffer(&mut self, bytes: &[u8]) -> usize {
        self.receiver.feed(bytes, &self.addresses, &mut self.sink)
    }

    /// Send `payload` to `destination`.
    pub fn send(&mut self, destination: u8, msg_type: u8, payload: &[u8]) -> Result<()> {
        self.send_with_length(destination, msg_type, Some(payload), payload.len())
    }

    /// Send with an explicit declared length.
    ///
    /// See [`FrameSerializer::build`] for the error conditions. Nothing is
    /// handed to the transmit collaborator on error.
    pub fn send_with_length(
        &mut self,
        destination: u8,
        msg_type: u8,
        payload: Option<&[u8]>,
        length: usize,
    ) -> Result<()> {
        self.serializer.send(
            self.addresses.own_address(),
            destination,
            msg_type,
            payload,
            length,
            &mut self.transmit,
        )
    }

    /// Drop any partially received frame.
    pub fn reset_receiver(&mut self) {
        self.receiver.reset();
    }

    pub fn stats(&self) -> &ReceiverStats {
        self.receiver.stats()
    }

    pub fn config(&self) -> &FrameConfig {
        self.receiver.config()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn transmit_mut(&mut self) -> &mut T {
        &mut self.transmit
    }

    /// Consume the endpoint and return its collaborators.
    pub fn into_parts(self) -> (T, S) {
        (self.transmit, self.sink)
    }
}
