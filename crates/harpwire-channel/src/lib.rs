//! Byte-duplex channel abstraction for device links.
//!
//! A device speaks its register protocol over some byte-duplex endpoint —
//! a serial port, a socket bridge, a USB CDC node. This crate defines the
//! small contract the rest of the stack needs ([`ChannelStream`]) without
//! implementing any concrete endpoint, plus an in-memory [`Loopback`] pair
//! used by tests and simulated devices.

pub mod error;
pub mod loopback;
pub mod traits;

pub use error::{ChannelError, Result};
pub use loopback::Loopback;
pub use traits::ChannelStream;
