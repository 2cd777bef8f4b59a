//! Typed payload codec and checksummed message framing.
//!
//! This is the wire layer of harpwire. Every message is framed with:
//! - A 1-byte length prefix covering the frame body
//! - Message type, register address and port bytes
//! - A payload-type tag (element width, signedness, float, timestamp bit)
//! - An optional 8-byte device timestamp followed by the payload elements
//! - A trailing 8-bit additive checksum
//!
//! Parsing is incremental and self-resynchronizing: corrupt frames are
//! reported and skipped at the declared frame boundary, never wedging the
//! stream.

pub mod codec;
pub mod error;
pub mod payload;
pub mod reader;
pub mod writer;

pub use codec::{
    decode_frame, encode_frame, parse_step, Frame, FrameConfig, MessageType, ParseFault, ParseStep,
    MAX_BODY_LEN, MIN_BODY_LEN,
};
pub use error::{FrameError, Result};
pub use payload::{DeviceTimestamp, Payload, PayloadType};
pub use reader::{FrameReader, ReadStep};
pub use writer::FrameWriter;
