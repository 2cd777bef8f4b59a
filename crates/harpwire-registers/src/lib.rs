//! Register map and frame dispatch for the laser driver controller.
//!
//! Every mapped address resolves to exactly one static [`RegisterDescriptor`]
//! carrying the register's payload type, arity and access policy. Dispatch
//! rejects unmapped addresses, enforces access policy before a command is
//! serialized, and partitions frame sequences per register for downstream
//! consumers.

pub mod descriptor;
pub mod error;
pub mod group;
pub mod map;

pub use descriptor::{AccessPolicy, RegisterDescriptor};
pub use error::{RegisterError, Result};
pub use group::{group_by_register, RegisterGroup};
pub use map::{
    addr, register_map, resolve, Bncs, DeviceEvents, DigitalOutputs, FrequencySelect, Signals,
    DEVICE_NAME, WHO_AM_I,
};
