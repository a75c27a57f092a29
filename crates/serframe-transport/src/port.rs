use std::time::Duration;

use crate::error::{Result, TransportError};

/// Default line speed.
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Line speeds accepted by [`PortConfig::validate`].
pub const SUPPORTED_BAUD_RATES: &[u32] = &[
    1200, 2400, 4800, 9600, 19200, 38400, 57600, 115200, 230400,
];

/// Line settings for opening a serial device.
///
/// Devices are always configured raw, 8 data bits, no parity, one stop bit.
/// Settings are ignored for plain files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortConfig {
    /// Line speed in bits per second.
    pub baud_rate: u32,
    /// Read timeout. `None` blocks until at least one byte arrives.
    pub read_timeout: Option<Duration>,
}

impl PortConfig {
    pub fn new(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }

    /// Check that the baud rate is one the transport can apply.
    pub fn validate(&self) -> Result<()> {
        if SUPPORTED_BAUD_RATES.contains(&self.baud_rate) {
            Ok(())
        } else {
            Err(TransportError::UnsupportedBaud(self.baud_rate))
        }
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout: None,
        }
    }
}
