use std::path::PathBuf;
use std::time::Duration;

use harpwire_frame::MessageType;

/// Errors that can occur while talking to a device.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// Channel-level error.
    #[error("channel error: {0}")]
    Channel(#[from] harpwire_channel::ChannelError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] harpwire_frame::FrameError),

    /// Register dispatch error.
    #[error("register error: {0}")]
    Register(#[from] harpwire_registers::RegisterError),

    /// The endpoint answered the identity handshake with the wrong device id.
    #[error("unexpected device on {endpoint}: who-am-i {found} (expected {expected})")]
    UnexpectedDevice {
        endpoint: String,
        expected: u16,
        found: u16,
    },

    /// The device rejected a command with an error reply.
    #[error("device rejected {message_type} command for address {address}")]
    CommandFailed {
        message_type: MessageType,
        address: u8,
    },

    /// No reply arrived within the wait deadline.
    #[error("request timed out after {0:?}")]
    TimedOut(Duration),

    /// The channel closed while the request was outstanding.
    #[error("channel closed")]
    ChannelClosed,

    /// Device metadata already written to the data log directory.
    #[error("device metadata already exists: {}", .0.display())]
    MetadataExists(PathBuf),

    /// Filesystem error from the data log.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DeviceError>;
