use harpwire_frame::{MessageType, PayloadType};

use crate::descriptor::AccessPolicy;

/// Errors raised by register resolution and dispatch.
#[derive(Debug, thiserror::Error)]
pub enum RegisterError {
    /// The address is not in the device register map.
    #[error("unknown register address {address}")]
    UnknownRegister { address: u8 },

    /// The command is not legal for the register's access policy.
    #[error("{message_type} not permitted on {register} (address {address}, {access})")]
    AccessViolation {
        register: &'static str,
        address: u8,
        access: AccessPolicy,
        message_type: MessageType,
    },

    /// A decoded payload does not match the register's descriptor.
    #[error(
        "malformed payload for {register}: expected {expected_len} x {expected}, \
         got {found_len} x {found}"
    )]
    MalformedPayload {
        register: &'static str,
        expected: PayloadType,
        expected_len: usize,
        found: PayloadType,
        found_len: usize,
    },

    /// A value to be written does not match the register's descriptor.
    #[error(
        "invalid value for {register}: expected {expected_len} x {expected}, \
         got {found_len} x {found}"
    )]
    InvalidValue {
        register: &'static str,
        expected: PayloadType,
        expected_len: usize,
        found: PayloadType,
        found_len: usize,
    },
}

pub type Result<T> = std::result::Result<T, RegisterError>;
