//! The laser driver controller register table and its value types.

use bitflags::bitflags;
use harpwire_frame::PayloadType;

use crate::descriptor::{AccessPolicy, RegisterDescriptor};
use crate::error::{RegisterError, Result};

/// Device identity reported by the WhoAmI register.
pub const WHO_AM_I: u16 = 1298;

/// Human-readable device name for logs and listings.
pub const DEVICE_NAME: &str = "LaserDriverController";

/// Register addresses by name.
pub mod addr {
    pub const WHO_AM_I: u8 = 0;
    pub const SPAD_SWITCH: u8 = 32;
    pub const LASER_STATE: u8 = 33;
    pub const LASER_FREQUENCY_SELECT: u8 = 38;
    pub const LASER_INTENSITY: u8 = 39;
    pub const OUTPUT_SET: u8 = 40;
    pub const OUTPUT_CLEAR: u8 = 41;
    pub const OUTPUT_TOGGLE: u8 = 42;
    pub const OUTPUT_STATE: u8 = 43;
    pub const BNCS_STATE: u8 = 44;
    pub const SIGNAL_STATE: u8 = 45;
    pub const BNC1_ON: u8 = 46;
    pub const BNC1_OFF: u8 = 47;
    pub const BNC1_PULSES: u8 = 48;
    pub const BNC1_TAIL: u8 = 49;
    pub const BNC2_ON: u8 = 50;
    pub const BNC2_OFF: u8 = 51;
    pub const BNC2_PULSES: u8 = 52;
    pub const BNC2_TAIL: u8 = 53;
    pub const SIGNAL_A_ON: u8 = 54;
    pub const SIGNAL_A_OFF: u8 = 55;
    pub const SIGNAL_A_PULSES: u8 = 56;
    pub const SIGNAL_A_TAIL: u8 = 57;
    pub const SIGNAL_B_ON: u8 = 58;
    pub const SIGNAL_B_OFF: u8 = 59;
    pub const SIGNAL_B_PULSES: u8 = 60;
    pub const SIGNAL_B_TAIL: u8 = 61;
    pub const EVENT_ENABLE: u8 = 62;
}

const fn scalar_u8(address: u8, name: &'static str) -> RegisterDescriptor {
    RegisterDescriptor {
        address,
        name,
        payload_type: PayloadType::U8,
        len: 1,
        access: AccessPolicy::ReadWrite,
    }
}

const fn scalar_u16(address: u8, name: &'static str) -> RegisterDescriptor {
    RegisterDescriptor {
        address,
        name,
        payload_type: PayloadType::U16,
        len: 1,
        access: AccessPolicy::ReadWrite,
    }
}

/// Every register the device exposes, in address order.
///
/// Addresses 34 through 37 are reserved by the firmware and deliberately
/// absent: commands to them fail with [`RegisterError::UnknownRegister`].
static REGISTER_MAP: &[RegisterDescriptor] = &[
    RegisterDescriptor {
        address: addr::WHO_AM_I,
        name: "WhoAmI",
        payload_type: PayloadType::U16,
        len: 1,
        access: AccessPolicy::ReadOnly,
    },
    scalar_u8(addr::SPAD_SWITCH, "SpadSwitch"),
    scalar_u8(addr::LASER_STATE, "LaserState"),
    scalar_u8(addr::LASER_FREQUENCY_SELECT, "LaserFrequencySelect"),
    scalar_u8(addr::LASER_INTENSITY, "LaserIntensity"),
    scalar_u8(addr::OUTPUT_SET, "OutputSet"),
    scalar_u8(addr::OUTPUT_CLEAR, "OutputClear"),
    scalar_u8(addr::OUTPUT_TOGGLE, "OutputToggle"),
    scalar_u8(addr::OUTPUT_STATE, "OutputState"),
    scalar_u8(addr::BNCS_STATE, "BncsState"),
    scalar_u8(addr::SIGNAL_STATE, "SignalState"),
    scalar_u16(addr::BNC1_ON, "Bnc1On"),
    scalar_u16(addr::BNC1_OFF, "Bnc1Off"),
    scalar_u16(addr::BNC1_PULSES, "Bnc1Pulses"),
    scalar_u16(addr::BNC1_TAIL, "Bnc1Tail"),
    scalar_u16(addr::BNC2_ON, "Bnc2On"),
    scalar_u16(addr::BNC2_OFF, "Bnc2Off"),
    scalar_u16(addr::BNC2_PULSES, "Bnc2Pulses"),
    scalar_u16(addr::BNC2_TAIL, "Bnc2Tail"),
    scalar_u16(addr::SIGNAL_A_ON, "SignalAOn"),
    scalar_u16(addr::SIGNAL_A_OFF, "SignalAOff"),
    scalar_u16(addr::SIGNAL_A_PULSES, "SignalAPulses"),
    scalar_u16(addr::SIGNAL_A_TAIL, "SignalATail"),
    scalar_u16(addr::SIGNAL_B_ON, "SignalBOn"),
    scalar_u16(addr::SIGNAL_B_OFF, "SignalBOff"),
    scalar_u16(addr::SIGNAL_B_PULSES, "SignalBPulses"),
    scalar_u16(addr::SIGNAL_B_TAIL, "SignalBTail"),
    scalar_u8(addr::EVENT_ENABLE, "EventEnable"),
];

/// The full register table, in address order.
pub fn register_map() -> &'static [RegisterDescriptor] {
    REGISTER_MAP
}

/// Look up a register descriptor by address.
pub fn resolve(address: u8) -> Result<&'static RegisterDescriptor> {
    REGISTER_MAP
        .iter()
        .find(|reg| reg.address == address)
        .ok_or(RegisterError::UnknownRegister { address })
}

bitflags! {
    /// Digital output lines addressed by the Output* registers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DigitalOutputs: u8 {
        const DO1 = 0x01;
        const DO2 = 0x02;
    }
}

bitflags! {
    /// BNC channels addressed by BncsState.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Bncs: u8 {
        const BNC1 = 0x01;
        const BNC2 = 0x02;
    }
}

bitflags! {
    /// Signal channels addressed by SignalState.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Signals: u8 {
        const SIGNAL_A = 0x01;
        const SIGNAL_B = 0x02;
    }
}

bitflags! {
    /// Event sources gated by EventEnable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DeviceEvents: u8 {
        const SPAD_SWITCH = 0x01;
        const LASER_STATE = 0x02;
    }
}

/// Laser modulation frequency selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum FrequencySelect {
    #[default]
    None = 0,
    F1 = 1,
    F2 = 2,
    F3 = 4,
    Cw = 8,
}

impl FrequencySelect {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::F1),
            2 => Some(Self::F2),
            4 => Some(Self::F3),
            8 => Some(Self::Cw),
            _ => None,
        }
    }
}
