//! Node addressing.
//!
//! A receiver accepts frames whose target is either its own address or the
//! broadcast address. Any byte value is valid for either, and both may be
//! equal. Both default to `0x00`.

/// Own and broadcast address of one protocol instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressConfig {
    own: u8,
    broadcast: u8,
}

impl AddressConfig {
    /// Create an address configuration.
    pub fn new(own: u8, broadcast: u8) -> Self {
        Self { own, broadcast }
    }

    /// This node's address, used as the source of sent frames.
    pub fn own_address(&self) -> u8 {
        self.own
    }

    /// The address every node accepts in addition to its own.
    pub fn broadcast_address(&self) -> u8 {
        self.broadcast
    }

    pub fn set_own_address(&mut self, addr: u8) {
        self.own = addr;
    }

    pub fn set_broadcast_address(&mut self, addr: u8) {
        self.broadcast = addr;
    }

    /// Returns true if a frame targeting `target` is meant for this node.
    pub fn accepts(&self, target: u8) -> bool {
        target == self.own || target == self.broadcast
    }
}
