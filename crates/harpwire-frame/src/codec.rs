use bytes::{Buf, BufMut, BytesMut};
use tracing::trace;

use crate::error::{FrameError, Result};
use crate::payload::{DeviceTimestamp, Payload, PayloadType};

/// Fixed header bytes before the (timestamp +) payload:
/// length, type, address, port, payload tag.
pub const HEADER_SIZE: usize = 5;

/// Smallest valid body length: type + address + port + tag + one payload byte.
pub const MIN_BODY_LEN: usize = 5;

/// Largest body length expressible in the one-byte length prefix.
pub const MAX_BODY_LEN: usize = 255;

/// Message direction/outcome discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Read command, or the data-carrying reply to one.
    Read = 0x00,
    /// Write command, or the acknowledging reply to one.
    Write = 0x01,
    /// Unsolicited device notification.
    Event = 0x02,
    /// Failed read reply.
    ReadError = 0x08,
    /// Failed write reply.
    WriteError = 0x09,
}

impl MessageType {
    /// Decode a wire message-type byte.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Read),
            0x01 => Some(Self::Write),
            0x02 => Some(Self::Event),
            0x08 => Some(Self::ReadError),
            0x09 => Some(Self::WriteError),
            _ => None,
        }
    }

    /// True for the error-reply types.
    pub fn is_error(self) -> bool {
        matches!(self, Self::ReadError | Self::WriteError)
    }

    /// True when a frame of this type resolves a command of type `command`.
    pub fn is_reply_to(self, command: Self) -> bool {
        match command {
            Self::Read => matches!(self, Self::Read | Self::ReadError),
            Self::Write => matches!(self, Self::Write | Self::WriteError),
            _ => false,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Read => "Read",
            Self::Write => "Write",
            Self::Event => "Event",
            Self::ReadError => "ReadError",
            Self::WriteError => "WriteError",
        };
        f.write_str(name)
    }
}

/// One complete protocol message.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Message direction/outcome.
    pub message_type: MessageType,
    /// Register address.
    pub address: u8,
    /// Port byte (0 when unused).
    pub port: u8,
    /// Typed payload elements.
    pub payload: Payload,
    /// Device capture time, for timestamp-tagged frames.
    pub timestamp: Option<DeviceTimestamp>,
}

impl Frame {
    /// Create an untimestamped frame.
    pub fn new(message_type: MessageType, address: u8, payload: Payload) -> Self {
        Self {
            message_type,
            address,
            port: 0,
            payload,
            timestamp: None,
        }
    }

    /// Create a timestamped frame.
    pub fn with_timestamp(
        message_type: MessageType,
        address: u8,
        payload: Payload,
        timestamp: DeviceTimestamp,
    ) -> Self {
        Self {
            message_type,
            address,
            port: 0,
            payload,
            timestamp: Some(timestamp),
        }
    }

    /// Body length as carried in the length prefix (everything after the
    /// length byte, checksum excluded).
    pub fn body_len(&self) -> usize {
        let timestamp = if self.timestamp.is_some() {
            DeviceTimestamp::WIRE_SIZE
        } else {
            0
        };
        HEADER_SIZE - 1 + timestamp + self.payload.byte_len()
    }

    /// Total wire size of this frame, length byte and checksum included.
    pub fn wire_size(&self) -> usize {
        self.body_len() + 2
    }
}

/// Configuration for the frame codec.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum accepted body length. Default: [`MAX_BODY_LEN`].
    pub max_body_len: usize,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_body_len: MAX_BODY_LEN,
        }
    }
}

/// Outcome of one incremental parse attempt.
#[derive(Debug)]
pub enum ParseStep {
    /// A complete, valid frame was consumed from the buffer.
    Frame(Frame),
    /// The buffer does not yet hold a complete frame; nothing was consumed.
    NeedMore,
    /// A corrupt or malformed frame was consumed; parsing can resume at the
    /// next boundary.
    Fault(ParseFault),
}

/// A recoverable parse failure, with the register address when the frame
/// header survived checksum validation.
#[derive(Debug)]
pub struct ParseFault {
    pub address: Option<u8>,
    pub error: FrameError,
}

/// Encode a frame into the wire format, appending to `dst`.
///
/// Layout: length byte, message type, address, port, payload tag,
/// optional 8-byte timestamp, little-endian payload elements, and an 8-bit
/// additive checksum over every preceding byte.
pub fn encode_frame(frame: &Frame, dst: &mut BytesMut) -> Result<()> {
    let body_len = frame.body_len();
    if body_len > MAX_BODY_LEN {
        return Err(FrameError::FrameTooLarge {
            declared: body_len,
            max: MAX_BODY_LEN,
        });
    }
    if frame.payload.is_empty() {
        return Err(FrameError::MalformedPayload {
            payload_type: frame.payload.payload_type(),
            len: 0,
        });
    }

    let start = dst.len();
    dst.reserve(body_len + 2);
    dst.put_u8(body_len as u8);
    dst.put_u8(frame.message_type as u8);
    dst.put_u8(frame.address);
    dst.put_u8(frame.port);
    dst.put_u8(frame.payload.payload_type().tag(frame.timestamp.is_some()));
    if let Some(ts) = frame.timestamp {
        ts.encode(dst);
    }
    frame.payload.encode(dst);
    dst.put_u8(checksum(&dst[start..]));
    Ok(())
}

/// Attempt to parse one frame from the front of `src`.
///
/// Valid and malformed frames are both consumed exactly to their declared
/// boundary; an implausible length byte consumes a single byte so the
/// parser can hunt for the next boundary.
pub fn parse_step(src: &mut BytesMut, config: &FrameConfig) -> ParseStep {
    if src.is_empty() {
        return ParseStep::NeedMore;
    }

    let declared = src[0] as usize;
    if declared < MIN_BODY_LEN {
        src.advance(1);
        return ParseStep::Fault(ParseFault {
            address: None,
            error: FrameError::TruncatedFrame { declared },
        });
    }
    if declared > config.max_body_len {
        src.advance(1);
        return ParseStep::Fault(ParseFault {
            address: None,
            error: FrameError::FrameTooLarge {
                declared,
                max: config.max_body_len,
            },
        });
    }

    let total = declared + 2;
    if src.len() < total {
        return ParseStep::NeedMore;
    }

    // Checksum before any field interpretation: a corrupt frame must
    // surface as a checksum failure, never as a misdecoded frame.
    let computed = checksum(&src[..=declared]);
    let received = src[declared + 1];
    if computed != received {
        src.advance(total);
        return ParseStep::Fault(ParseFault {
            address: None,
            error: FrameError::ChecksumMismatch { computed, received },
        });
    }

    let type_byte = src[1];
    let address = src[2];
    let port = src[3];
    let tag = src[4];

    let fault = |src: &mut BytesMut, error: FrameError| {
        src.advance(total);
        ParseStep::Fault(ParseFault {
            address: Some(address),
            error,
        })
    };

    let Some(message_type) = MessageType::from_u8(type_byte) else {
        return fault(src, FrameError::UnknownMessageType { value: type_byte });
    };
    let Some((payload_type, timestamped)) = PayloadType::from_tag(tag) else {
        return fault(src, FrameError::UnknownPayloadType { tag });
    };

    let body = &src[HEADER_SIZE..=declared];
    let (timestamp, payload_bytes) = if timestamped {
        if body.len() <= DeviceTimestamp::WIRE_SIZE {
            let len = body.len().saturating_sub(DeviceTimestamp::WIRE_SIZE);
            return fault(src, FrameError::MalformedPayload { payload_type, len });
        }
        let mut raw = [0u8; DeviceTimestamp::WIRE_SIZE];
        raw.copy_from_slice(&body[..DeviceTimestamp::WIRE_SIZE]);
        (
            Some(DeviceTimestamp::decode(&raw)),
            &body[DeviceTimestamp::WIRE_SIZE..],
        )
    } else {
        (None, body)
    };

    let payload = match Payload::decode(payload_type, payload_bytes) {
        Ok(payload) => payload,
        Err(error) => return fault(src, error),
    };

    src.advance(total);
    trace!(%message_type, address, "decoded frame");
    ParseStep::Frame(Frame {
        message_type,
        address,
        port,
        payload,
        timestamp,
    })
}

/// Decode a frame from a buffer.
///
/// Returns `Ok(None)` if the buffer doesn't contain a complete frame yet.
/// Corrupt frames are consumed and surfaced as errors; parsing resumes at
/// the next boundary on the following call.
pub fn decode_frame(src: &mut BytesMut, config: &FrameConfig) -> Result<Option<Frame>> {
    match parse_step(src, config) {
        ParseStep::Frame(frame) => Ok(Some(frame)),
        ParseStep::NeedMore => Ok(None),
        ParseStep::Fault(fault) => Err(fault.error),
    }
}

fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}
