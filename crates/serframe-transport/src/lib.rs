//! Byte-stream transport for serial links.
//!
//! Provides one stream type over the places frame bytes come from:
//! - Serial character devices (configured raw 8N1 on Unix)
//! - Plain files, e.g. captured traffic
//! - In-process socket pairs for loopback
//!
//! This is the lowest layer of serframe. Framing builds on top of the
//! [`SerialStream`] type provided here.

pub mod error;
pub mod port;
pub mod stream;

#[cfg(unix)]
mod tty;

pub use error::{Result, TransportError};
pub use port::{PortConfig, DEFAULT_BAUD_RATE, SUPPORTED_BAUD_RATES};
pub use stream::SerialStream;
