use std::fmt;
use std::io;

use harpwire_frame::FrameError;
use harpwire_registers::RegisterError;

pub const SUCCESS: i32 = 0;
pub const FAILURE: i32 = 1;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::NotFound => USAGE,
        _ => INTERNAL,
    };
    CliError::new(code, format!("{context}: {err}"))
}

pub fn frame_error(context: &str, err: FrameError) -> CliError {
    match err {
        FrameError::Io(source) => io_error(context, source),
        FrameError::ChecksumMismatch { .. }
        | FrameError::TruncatedFrame { .. }
        | FrameError::FrameTooLarge { .. }
        | FrameError::UnknownPayloadType { .. }
        | FrameError::UnknownMessageType { .. }
        | FrameError::MalformedPayload { .. }
        | FrameError::InvalidValue { .. } => CliError::new(DATA_INVALID, format!("{context}: {err}")),
        FrameError::ChannelClosed => CliError::new(FAILURE, format!("{context}: {err}")),
    }
}

pub fn register_error(context: &str, err: RegisterError) -> CliError {
    match err {
        RegisterError::UnknownRegister { .. } | RegisterError::AccessViolation { .. } => {
            CliError::new(USAGE, format!("{context}: {err}"))
        }
        RegisterError::MalformedPayload { .. } | RegisterError::InvalidValue { .. } => {
            CliError::new(DATA_INVALID, format!("{context}: {err}"))
        }
    }
}
