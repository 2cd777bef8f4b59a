//! Command/reply transport for the laser driver controller.
//!
//! [`Device::connect`] takes any [`ChannelStream`](harpwire_channel::ChannelStream),
//! verifies the endpoint's identity through its who-am-i register, and then
//! mediates all traffic: commands go out through validated register
//! dispatch, replies come back matched FIFO per address, and everything
//! unsolicited (events, stray replies) is surfaced on an event receiver.
//! The [`datalog`] module persists captured traffic to disk.

pub mod datalog;
pub mod device;
pub mod error;
mod pending;

pub use datalog::DeviceDataWriter;
pub use device::{Device, DeviceConfig, RequestHandle};
pub use error::{DeviceError, Result};
