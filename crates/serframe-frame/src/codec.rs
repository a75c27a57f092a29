use bytes::{BufMut, Bytes, BytesMut};

use crate::address::AddressConfig;
use crate::crc::crc16;
use crate::error::{FrameError, Result};

/// Byte positions of the fixed header fields.
pub const PREAMBLE_0_POS: usize = 0;
pub const PREAMBLE_1_POS: usize = 1;
pub const PREAMBLE_2_POS: usize = 2;
pub const SOURCE_POS: usize = 3;
pub const TARGET_POS: usize = 4;
pub const MSG_TYPE_POS: usize = 5;
pub const LENGTH_HIGH_POS: usize = 6;
pub const LENGTH_LOW_POS: usize = 7;
pub const PAYLOAD_POS: usize = 8;

/// Header: preamble (3) + source (1) + target (1) + type (1) + length (2) = 8 bytes.
pub const HEADER_SIZE: usize = PAYLOAD_POS;

/// Trailing CRC16, big-endian.
pub const CRC_SIZE: usize = 2;

/// Non-payload bytes in every frame.
pub const OVERHEAD: usize = HEADER_SIZE + CRC_SIZE;

/// Default preamble bytes.
pub const DEFAULT_PREAMBLE: [u8; 3] = [0xAA, 0x55, 0xFF];

/// Default maximum payload size.
pub const DEFAULT_MAX_PAYLOAD: u16 = 256;

/// Protocol configuration shared by the serializer and the receiver.
///
/// Both ends of a link must agree on `preamble`; `max_payload_size` only has
/// to be large enough on the receiving side for the frames it must accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameConfig {
    /// Three bytes that open every frame.
    pub preamble: [u8; 3],
    /// Largest payload accepted or produced. The wire format caps it at 65535.
    pub max_payload_size: u16,
    /// Receiver scratch buffer size. Default: twice the largest frame.
    pub scratch_capacity: Option<usize>,
    /// Read timeout for blocking stream readers.
    pub read_timeout: Option<std::time::Duration>,
}

impl FrameConfig {
    /// Configuration with the given maximum payload and default preamble.
    pub fn with_max_payload(max_payload_size: u16) -> Self {
        Self {
            max_payload_size,
            ..Self::default()
        }
    }

    /// Largest possible frame on the wire for this configuration.
    pub fn max_frame_size(&self) -> usize {
        usize::from(self.max_payload_size) + OVERHEAD
    }

    /// Size of the receiver's circular scratch buffer.
    ///
    /// Never smaller than one frame header plus CRC.
    pub fn scratch_capacity(&self) -> usize {
        self.scratch_capacity
            .unwrap_or_else(|| self.max_frame_size() * 2)
            .max(OVERHEAD)
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            preamble: DEFAULT_PREAMBLE,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            scratch_capacity: None,
            read_timeout: None,
        }
    }
}

/// Encode a complete frame into `dst`.
///
/// Wire format:
/// ```text
/// ┌──────────┬─────┬─────┬──────┬───────────┬──────────┬───────────┐
/// │ Preamble │ Src │ Tgt │ Type │ Length    │ Payload  │ CRC16     │
/// │ (3B)     │(1B) │(1B) │ (1B) │ (2B BE)   │ (Length) │ (2B BE)   │
/// └──────────┴─────┴─────┴──────┴───────────┴──────────┴───────────┘
/// ```
///
/// The CRC covers every byte from the first preamble byte through the last
/// payload byte. Returns the number of bytes appended.
pub fn encode_frame(
    config: &FrameConfig,
    source: u8,
    target: u8,
    msg_type: u8,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<usize> {
    let max = usize::from(config.max_payload_size);
    if payload.len() > max {
        return Err(FrameError::IllegalLength {
            length: payload.len(),
            max,
        });
    }

    let start = dst.len();
    dst.reserve(OVERHEAD + payload.len());
    dst.put_slice(&config.preamble);
    dst.put_u8(source);
    dst.put_u8(target);
    dst.put_u8(msg_type);
    // Bounded by `max_payload_size: u16` above.
    dst.put_u16(payload.len() as u16);
    dst.put_slice(payload);
    let crc = crc16(&dst[start..]);
    dst.put_u16(crc);

    Ok(dst.len() - start)
}

/// A validated frame, split into its fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sender's address.
    pub source: u8,
    /// Destination (or broadcast) address.
    pub target: u8,
    /// Opaque message type.
    pub msg_type: u8,
    /// Message payload.
    pub payload: Bytes,
    /// CRC16 carried by the frame.
    pub crc: u16,
}

impl Frame {
    /// Parse and fully validate a complete frame.
    ///
    /// Checks preamble, declared length against `config`, total size and CRC.
    /// Addressing is not checked.
    pub fn parse(bytes: &[u8], config: &FrameConfig) -> Result<Self> {
        if bytes.len() < OVERHEAD {
            return Err(FrameError::Malformed("shorter than frame overhead"));
        }
        if bytes[PREAMBLE_0_POS..SOURCE_POS] != config.preamble {
            return Err(FrameError::Malformed("preamble mismatch"));
        }

        let declared = usize::from(u16::from_be_bytes([
            bytes[LENGTH_HIGH_POS],
            bytes[LENGTH_LOW_POS],
        ]));
        let max = usize::from(config.max_payload_size);
        if declared > max {
            return Err(FrameError::IllegalLength {
                length: declared,
                max,
            });
        }
        if bytes.len() != declared + OVERHEAD {
            return Err(FrameError::Malformed("length field disagrees with frame size"));
        }

        let crc_pos = PAYLOAD_POS + declared;
        let crc = u16::from_be_bytes([bytes[crc_pos], bytes[crc_pos + 1]]);
        if crc != crc16(&bytes[..crc_pos]) {
            return Err(FrameError::Malformed("crc mismatch"));
        }

        Ok(Self {
            source: bytes[SOURCE_POS],
            target: bytes[TARGET_POS],
            msg_type: bytes[MSG_TYPE_POS],
            payload: Bytes::copy_from_slice(&bytes[PAYLOAD_POS..crc_pos]),
            crc,
        })
    }

    /// Serialize back to wire form with the given preamble.
    ///
    /// The stored `crc` is written as-is; frames produced by [`Frame::parse`]
    /// reproduce their original bytes exactly.
    pub fn to_bytes(&self, preamble: [u8; 3]) -> Bytes {
        let mut out = BytesMut::with_capacity(self.wire_size());
        out.put_slice(&self.header(preamble));
        out.put_slice(&self.payload);
        out.put_u16(self.crc);
        out.freeze()
    }

    /// The total wire size of this frame (overhead + payload).
    pub fn wire_size(&self) -> usize {
        OVERHEAD + self.payload.len()
    }

    /// True if the frame targets the broadcast address of `addresses`.
    pub fn is_broadcast(&self, addresses: &AddressConfig) -> bool {
        self.target == addresses.broadcast_address()
    }

    fn header(&self, preamble: [u8; 3]) -> [u8; HEADER_SIZE] {
        let len = (self.payload.len() as u16).to_be_bytes();
        [
            preamble[0],
            preamble[1],
            preamble[2],
            self.source,
            self.target,
            self.msg_type,
            len[0],
            len[1],
        ]
    }
}
