//! Addressed, CRC16-checked messaging over serial links.
//!
//! serframe frames small typed messages between nodes sharing a UART or
//! RS-485 bus. Each frame carries source and target addresses, a message
//! type and up to 65535 bytes of payload, guarded by a CRC16.
//!
//! # Crate Structure
//!
//! - [`transport`]: serial device, file and loopback byte streams
//! - [`frame`]: framing, CRC16, the receive state machine and stream adapters

/// Re-export transport types.
pub mod transport {
    pub use serframe_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serframe_frame::*;
}
