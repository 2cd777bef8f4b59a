use harpwire_frame::{Frame, MessageType, Payload, PayloadType};

use crate::error::{RegisterError, Result};

/// What host commands a register accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPolicy {
    /// Readable only.
    ReadOnly,
    /// Writable only.
    WriteOnly,
    /// Readable and writable.
    ReadWrite,
    /// Only ever observed through unsolicited events.
    EventOnly,
}

impl AccessPolicy {
    pub fn allows_read(self) -> bool {
        matches!(self, Self::ReadOnly | Self::ReadWrite)
    }

    pub fn allows_write(self) -> bool {
        matches!(self, Self::WriteOnly | Self::ReadWrite)
    }
}

impl std::fmt::Display for AccessPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::ReadOnly => "read-only",
            Self::WriteOnly => "write-only",
            Self::ReadWrite => "read-write",
            Self::EventOnly => "event-only",
        };
        f.write_str(name)
    }
}

/// Static description of one device register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub address: u8,
    pub name: &'static str,
    pub payload_type: PayloadType,
    /// Element count of the register payload.
    pub len: usize,
    pub access: AccessPolicy,
}

impl RegisterDescriptor {
    /// Check that a command of the given type is legal for this register.
    pub fn check_access(&self, message_type: MessageType) -> Result<()> {
        let allowed = match message_type {
            MessageType::Read => self.access.allows_read(),
            MessageType::Write => self.access.allows_write(),
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            Err(RegisterError::AccessViolation {
                register: self.name,
                address: self.address,
                access: self.access,
                message_type,
            })
        }
    }

    /// Check an inbound payload against this register's type and arity.
    pub fn check_payload(&self, payload: &Payload) -> Result<()> {
        if payload.payload_type() == self.payload_type && payload.len() == self.len {
            Ok(())
        } else {
            Err(RegisterError::MalformedPayload {
                register: self.name,
                expected: self.payload_type,
                expected_len: self.len,
                found: payload.payload_type(),
                found_len: payload.len(),
            })
        }
    }

    /// Check an outbound payload against this register's type and arity.
    pub fn check_value(&self, payload: &Payload) -> Result<()> {
        if payload.payload_type() == self.payload_type && payload.len() == self.len {
            Ok(())
        } else {
            Err(RegisterError::InvalidValue {
                register: self.name,
                expected: self.payload_type,
                expected_len: self.len,
                found: payload.payload_type(),
                found_len: payload.len(),
            })
        }
    }

    /// Build the read command for this register.
    ///
    /// Read commands carry a zeroed payload of the register's arity so the
    /// frame still satisfies the one-element wire minimum.
    pub fn read_command(&self) -> Result<Frame> {
        self.check_access(MessageType::Read)?;
        Ok(Frame::new(
            MessageType::Read,
            self.address,
            Payload::zeroed(self.payload_type, self.len),
        ))
    }

    /// Build the write command carrying `payload` to this register.
    pub fn write_command(&self, payload: Payload) -> Result<Frame> {
        self.check_access(MessageType::Write)?;
        self.check_value(&payload)?;
        Ok(Frame::new(MessageType::Write, self.address, payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_REG: RegisterDescriptor = RegisterDescriptor {
        address: 32,
        name: "SpadSwitch",
        payload_type: PayloadType::U8,
        len: 1,
        access: AccessPolicy::ReadWrite,
    };

    #[test]
    fn read_command_carries_zeroed_payload() {
        let frame = TEST_REG.read_command().unwrap();
        assert_eq!(frame.message_type, MessageType::Read);
        assert_eq!(frame.address, 32);
        assert_eq!(frame.payload, Payload::U8(vec![0]));
    }

    #[test]
    fn write_command_checks_value_shape() {
        let frame = TEST_REG.write_command(Payload::U8(vec![1])).unwrap();
        assert_eq!(frame.message_type, MessageType::Write);
        assert_eq!(frame.payload, Payload::U8(vec![1]));

        let err = TEST_REG.write_command(Payload::U16(vec![1])).unwrap_err();
        assert!(matches!(err, RegisterError::InvalidValue { .. }));

        let err = TEST_REG.write_command(Payload::U8(vec![1, 2])).unwrap_err();
        assert!(matches!(
            err,
            RegisterError::InvalidValue {
                expected_len: 1,
                found_len: 2,
                ..
            }
        ));
    }

    #[test]
    fn access_policy_enforced() {
        let read_only = RegisterDescriptor {
            access: AccessPolicy::ReadOnly,
            ..TEST_REG
        };
        assert!(read_only.read_command().is_ok());
        let err = read_only.write_command(Payload::U8(vec![1])).unwrap_err();
        assert!(matches!(
            err,
            RegisterError::AccessViolation {
                message_type: MessageType::Write,
                ..
            }
        ));

        let event_only = RegisterDescriptor {
            access: AccessPolicy::EventOnly,
            ..TEST_REG
        };
        assert!(event_only.read_command().is_err());
        assert!(event_only.write_command(Payload::U8(vec![0])).is_err());
    }

    #[test]
    fn inbound_payload_validation() {
        assert!(TEST_REG.check_payload(&Payload::U8(vec![3])).is_ok());
        let err = TEST_REG
            .check_payload(&Payload::S8(vec![3]))
            .unwrap_err();
        assert!(matches!(err, RegisterError::MalformedPayload { .. }));
    }
}
