//! Harp register protocol stack for the laser driver controller.
//!
//! harpwire reconstructs the device's binary register protocol as a layered
//! stack: byte channels, checksummed framing, a typed register map, and a
//! command/reply transport with event delivery.
//!
//! # Crate Structure
//!
//! - [`channel`] — Byte-duplex channel abstraction and in-memory loopback
//! - [`frame`] — Typed payload codec and checksummed message framing
//! - [`registers`] — Register map, access policies and dispatch
//! - [`device`] — Command/reply transport, identity handshake, data logging

/// Re-export channel types.
pub mod channel {
    pub use harpwire_channel::*;
}

/// Re-export frame types.
pub mod frame {
    pub use harpwire_frame::*;
}

/// Re-export register types.
pub mod registers {
    pub use harpwire_registers::*;
}

/// Re-export device types.
pub mod device {
    pub use harpwire_device::*;
}
