/// Errors that can occur while building, parsing or streaming frames.
///
/// Receive-side rejections (bad preamble, CRC mismatch, foreign address,
/// oversized length) are never surfaced through this type by the receiver
/// state machine; they are silent drops. `Malformed` is only produced by
/// explicit parsing of a complete frame via [`crate::Frame::parse`].
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The declared payload length exceeds the configured maximum.
    #[error("illegal payload length ({length} bytes, max {max})")]
    IllegalLength { length: usize, max: usize },

    /// A non-zero payload length was declared but no payload was given.
    #[error("payload of {length} bytes declared but no payload provided")]
    NullPayload { length: usize },

    /// The payload slice holds fewer bytes than the declared length.
    #[error("payload truncated ({available} bytes available, {declared} declared)")]
    TruncatedPayload { declared: usize, available: usize },

    /// A byte sequence handed to the parser is not a valid frame.
    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream reached EOF before another frame was delivered.
    #[error("connection closed (no complete frame)")]
    ConnectionClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
