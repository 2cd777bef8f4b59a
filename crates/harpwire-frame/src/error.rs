use crate::payload::PayloadType;

/// Errors that can occur while encoding or decoding frames and payloads.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The computed checksum does not match the transmitted one.
    #[error("checksum mismatch (computed 0x{computed:02x}, received 0x{received:02x})")]
    ChecksumMismatch { computed: u8, received: u8 },

    /// The declared frame length cannot hold a complete frame, or the
    /// stream ended before the frame did.
    #[error("truncated frame (declared body length {declared})")]
    TruncatedFrame { declared: usize },

    /// The declared frame length exceeds the configured maximum.
    #[error("frame too large (declared body length {declared}, max {max})")]
    FrameTooLarge { declared: usize, max: usize },

    /// The payload-type tag does not name a known element type.
    #[error("unknown payload type tag 0x{tag:02x}")]
    UnknownPayloadType { tag: u8 },

    /// The message-type byte does not name a known message type.
    #[error("unknown message type 0x{value:02x}")]
    UnknownMessageType { value: u8 },

    /// The payload byte count does not fit the declared element type.
    #[error("malformed {payload_type} payload ({len} bytes)")]
    MalformedPayload { payload_type: PayloadType, len: usize },

    /// A value cannot be represented in the target element width.
    #[error("value {value} out of range for {payload_type}")]
    InvalidValue { payload_type: PayloadType, value: i64 },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The channel was closed before a complete frame was received.
    #[error("channel closed")]
    ChannelClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
