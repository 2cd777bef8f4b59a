use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};

/// Tag bit marking a timestamped payload.
const TAG_TIMESTAMPED: u8 = 0x10;
/// Tag bit marking a float element type.
const TAG_FLOAT: u8 = 0x40;
/// Tag bit marking a signed element type.
const TAG_SIGNED: u8 = 0x80;
/// Tag bits holding the element width in bytes.
const TAG_WIDTH: u8 = 0x0F;

/// Element type of a register payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    U8,
    S8,
    U16,
    S16,
    U32,
    S32,
    U64,
    S64,
    F32,
}

impl PayloadType {
    /// Element width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::U8 | Self::S8 => 1,
            Self::U16 | Self::S16 => 2,
            Self::U32 | Self::S32 | Self::F32 => 4,
            Self::U64 | Self::S64 => 8,
        }
    }

    /// Wire tag for this element type, with the timestamp bit when requested.
    pub fn tag(self, timestamped: bool) -> u8 {
        let mut tag = self.width() as u8;
        match self {
            Self::S8 | Self::S16 | Self::S32 | Self::S64 => tag |= TAG_SIGNED,
            Self::F32 => tag |= TAG_FLOAT,
            _ => {}
        }
        if timestamped {
            tag |= TAG_TIMESTAMPED;
        }
        tag
    }

    /// Decode a wire tag into an element type and its timestamp bit.
    ///
    /// Returns `None` for tags that name no known element type.
    pub fn from_tag(tag: u8) -> Option<(Self, bool)> {
        let timestamped = tag & TAG_TIMESTAMPED != 0;
        let ty = match (tag & !TAG_TIMESTAMPED, tag & TAG_WIDTH) {
            (t, 1) if t & TAG_SIGNED != 0 => Self::S8,
            (t, 2) if t & TAG_SIGNED != 0 => Self::S16,
            (t, 4) if t & TAG_SIGNED != 0 => Self::S32,
            (t, 8) if t & TAG_SIGNED != 0 => Self::S64,
            (t, 4) if t & TAG_FLOAT != 0 => Self::F32,
            (t, 1) if t == 1 => Self::U8,
            (t, 2) if t == 2 => Self::U16,
            (t, 4) if t == 4 => Self::U32,
            (t, 8) if t == 8 => Self::U64,
            _ => return None,
        };
        // Reject tags with stray bits (e.g. signed and float together).
        if ty.tag(timestamped) != tag {
            return None;
        }
        Some((ty, timestamped))
    }
}

impl std::fmt::Display for PayloadType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::U8 => "U8",
            Self::S8 => "S8",
            Self::U16 => "U16",
            Self::S16 => "S16",
            Self::U32 => "U32",
            Self::S32 => "S32",
            Self::U64 => "U64",
            Self::S64 => "S64",
            Self::F32 => "Float32",
        };
        f.write_str(name)
    }
}

/// Device-clock capture time: whole seconds plus microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceTimestamp {
    pub seconds: u32,
    pub micros: u32,
}

impl DeviceTimestamp {
    /// Encoded size on the wire.
    pub const WIRE_SIZE: usize = 8;

    /// Build a timestamp, carrying microsecond overflow into seconds.
    pub fn new(seconds: u32, micros: u32) -> Self {
        Self {
            seconds: seconds.wrapping_add(micros / 1_000_000),
            micros: micros % 1_000_000,
        }
    }

    /// Convert to fractional seconds.
    pub fn to_secs_f64(self) -> f64 {
        f64::from(self.seconds) + f64::from(self.micros) / 1e6
    }

    /// Build from fractional seconds. Negative inputs clamp to zero.
    pub fn from_secs_f64(secs: f64) -> Self {
        let secs = secs.max(0.0);
        let whole = secs.floor();
        let micros = ((secs - whole) * 1e6).round() as u32;
        Self::new(whole as u32, micros)
    }

    pub(crate) fn decode(bytes: &[u8; 8]) -> Self {
        let seconds = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let micros = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        Self::new(seconds, micros)
    }

    pub(crate) fn encode(self, dst: &mut BytesMut) {
        dst.put_u32_le(self.seconds);
        dst.put_u32_le(self.micros);
    }
}

/// A decoded register payload: one or more fixed-width elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    U8(Vec<u8>),
    S8(Vec<i8>),
    U16(Vec<u16>),
    S16(Vec<i16>),
    U32(Vec<u32>),
    S32(Vec<i32>),
    U64(Vec<u64>),
    S64(Vec<i64>),
    F32(Vec<f32>),
}

impl Payload {
    /// The element type of this payload.
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Self::U8(_) => PayloadType::U8,
            Self::S8(_) => PayloadType::S8,
            Self::U16(_) => PayloadType::U16,
            Self::S16(_) => PayloadType::S16,
            Self::U32(_) => PayloadType::U32,
            Self::S32(_) => PayloadType::S32,
            Self::U64(_) => PayloadType::U64,
            Self::S64(_) => PayloadType::S64,
            Self::F32(_) => PayloadType::F32,
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Self::U8(v) => v.len(),
            Self::S8(v) => v.len(),
            Self::U16(v) => v.len(),
            Self::S16(v) => v.len(),
            Self::U32(v) => v.len(),
            Self::S32(v) => v.len(),
            Self::U64(v) => v.len(),
            Self::S64(v) => v.len(),
            Self::F32(v) => v.len(),
        }
    }

    /// True when the payload holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Encoded payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.len() * self.payload_type().width()
    }

    /// A zeroed payload of the given type and arity (read-command filler).
    pub fn zeroed(ty: PayloadType, len: usize) -> Self {
        match ty {
            PayloadType::U8 => Self::U8(vec![0; len]),
            PayloadType::S8 => Self::S8(vec![0; len]),
            PayloadType::U16 => Self::U16(vec![0; len]),
            PayloadType::S16 => Self::S16(vec![0; len]),
            PayloadType::U32 => Self::U32(vec![0; len]),
            PayloadType::S32 => Self::S32(vec![0; len]),
            PayloadType::U64 => Self::U64(vec![0; len]),
            PayloadType::S64 => Self::S64(vec![0; len]),
            PayloadType::F32 => Self::F32(vec![0.0; len]),
        }
    }

    /// Decode little-endian payload bytes into typed elements.
    ///
    /// Fails with [`FrameError::MalformedPayload`] when the byte count is
    /// zero or not an exact multiple of the element width.
    pub fn decode(ty: PayloadType, bytes: &[u8]) -> Result<Self> {
        let width = ty.width();
        if bytes.is_empty() || bytes.len() % width != 0 {
            return Err(FrameError::MalformedPayload {
                payload_type: ty,
                len: bytes.len(),
            });
        }
        let chunks = bytes.chunks_exact(width);
        let payload = match ty {
            PayloadType::U8 => Self::U8(bytes.to_vec()),
            PayloadType::S8 => Self::S8(bytes.iter().map(|&b| b as i8).collect()),
            PayloadType::U16 => Self::U16(
                chunks
                    .map(|c| u16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            PayloadType::S16 => Self::S16(
                chunks
                    .map(|c| i16::from_le_bytes([c[0], c[1]]))
                    .collect(),
            ),
            PayloadType::U32 => Self::U32(
                chunks
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            PayloadType::S32 => Self::S32(
                chunks
                    .map(|c| i32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            PayloadType::U64 => Self::U64(
                chunks
                    .map(|c| {
                        u64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                    })
                    .collect(),
            ),
            PayloadType::S64 => Self::S64(
                chunks
                    .map(|c| {
                        i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
                    })
                    .collect(),
            ),
            PayloadType::F32 => Self::F32(
                chunks
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
        };
        Ok(payload)
    }

    /// Encode the payload elements as little-endian bytes.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.reserve(self.byte_len());
        match self {
            Self::U8(v) => dst.put_slice(v),
            Self::S8(v) => {
                for &x in v {
                    dst.put_i8(x);
                }
            }
            Self::U16(v) => {
                for &x in v {
                    dst.put_u16_le(x);
                }
            }
            Self::S16(v) => {
                for &x in v {
                    dst.put_i16_le(x);
                }
            }
            Self::U32(v) => {
                for &x in v {
                    dst.put_u32_le(x);
                }
            }
            Self::S32(v) => {
                for &x in v {
                    dst.put_i32_le(x);
                }
            }
            Self::U64(v) => {
                for &x in v {
                    dst.put_u64_le(x);
                }
            }
            Self::S64(v) => {
                for &x in v {
                    dst.put_i64_le(x);
                }
            }
            Self::F32(v) => {
                for &x in v {
                    dst.put_f32_le(x);
                }
            }
        }
    }

    /// Build an integer payload of the given type, range-checking each value.
    pub fn from_ints(ty: PayloadType, values: &[i64]) -> Result<Self> {
        fn convert<T: TryFrom<i64>>(ty: PayloadType, values: &[i64]) -> Result<Vec<T>> {
            values
                .iter()
                .map(|&value| {
                    T::try_from(value).map_err(|_| FrameError::InvalidValue {
                        payload_type: ty,
                        value,
                    })
                })
                .collect()
        }

        Ok(match ty {
            PayloadType::U8 => Self::U8(convert(ty, values)?),
            PayloadType::S8 => Self::S8(convert(ty, values)?),
            PayloadType::U16 => Self::U16(convert(ty, values)?),
            PayloadType::S16 => Self::S16(convert(ty, values)?),
            PayloadType::U32 => Self::U32(convert(ty, values)?),
            PayloadType::S32 => Self::S32(convert(ty, values)?),
            PayloadType::U64 => Self::U64(convert(ty, values)?),
            PayloadType::S64 => Self::S64(values.to_vec()),
            PayloadType::F32 => Self::F32(values.iter().map(|&v| v as f32).collect()),
        })
    }

    /// The single `u8` element, when this is a scalar U8 payload.
    pub fn scalar_u8(&self) -> Option<u8> {
        match self {
            Self::U8(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// The single `u16` element, when this is a scalar U16 payload.
    pub fn scalar_u16(&self) -> Option<u16> {
        match self {
            Self::U16(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip_all_types() {
        let types = [
            PayloadType::U8,
            PayloadType::S8,
            PayloadType::U16,
            PayloadType::S16,
            PayloadType::U32,
            PayloadType::S32,
            PayloadType::U64,
            PayloadType::S64,
            PayloadType::F32,
        ];
        for ty in types {
            for timestamped in [false, true] {
                let tag = ty.tag(timestamped);
                assert_eq!(PayloadType::from_tag(tag), Some((ty, timestamped)));
            }
        }
    }

    #[test]
    fn known_tag_values() {
        assert_eq!(PayloadType::U8.tag(false), 0x01);
        assert_eq!(PayloadType::U16.tag(false), 0x02);
        assert_eq!(PayloadType::S8.tag(false), 0x81);
        assert_eq!(PayloadType::F32.tag(false), 0x44);
        assert_eq!(PayloadType::U8.tag(true), 0x11);
    }

    #[test]
    fn rejects_unknown_tags() {
        assert_eq!(PayloadType::from_tag(0x00), None);
        assert_eq!(PayloadType::from_tag(0x03), None);
        assert_eq!(PayloadType::from_tag(0xC4), None); // signed float
        assert_eq!(PayloadType::from_tag(0x48), None); // float with width 8
    }

    #[test]
    fn decode_rejects_width_mismatch() {
        let err = Payload::decode(PayloadType::U16, &[1, 2, 3]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::MalformedPayload {
                payload_type: PayloadType::U16,
                len: 3
            }
        ));
    }

    #[test]
    fn decode_rejects_empty() {
        let err = Payload::decode(PayloadType::U8, &[]).unwrap_err();
        assert!(matches!(err, FrameError::MalformedPayload { len: 0, .. }));
    }

    #[test]
    fn decode_little_endian() {
        let payload = Payload::decode(PayloadType::U16, &[0x34, 0x12, 0x78, 0x56]).unwrap();
        assert_eq!(payload, Payload::U16(vec![0x1234, 0x5678]));

        let payload = Payload::decode(PayloadType::S32, &[0xFF, 0xFF, 0xFF, 0xFF]).unwrap();
        assert_eq!(payload, Payload::S32(vec![-1]));
    }

    #[test]
    fn encode_decode_roundtrip() {
        let cases = [
            Payload::U8(vec![1, 2, 3]),
            Payload::S16(vec![-300, 300]),
            Payload::U32(vec![0xDEAD_BEEF]),
            Payload::S64(vec![i64::MIN, i64::MAX]),
            Payload::F32(vec![1.5, -0.25]),
        ];
        for payload in cases {
            let mut buf = BytesMut::new();
            payload.encode(&mut buf);
            assert_eq!(buf.len(), payload.byte_len());
            let decoded = Payload::decode(payload.payload_type(), &buf).unwrap();
            assert_eq!(decoded, payload);
        }
    }

    #[test]
    fn from_ints_range_checks() {
        assert_eq!(
            Payload::from_ints(PayloadType::U8, &[0, 255]).unwrap(),
            Payload::U8(vec![0, 255])
        );
        let err = Payload::from_ints(PayloadType::U8, &[256]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidValue {
                payload_type: PayloadType::U8,
                value: 256
            }
        ));
        let err = Payload::from_ints(PayloadType::U16, &[-1]).unwrap_err();
        assert!(matches!(err, FrameError::InvalidValue { value: -1, .. }));
    }

    #[test]
    fn timestamp_seconds_conversion() {
        let ts = DeviceTimestamp::new(10, 250_000);
        assert_eq!(ts.to_secs_f64(), 10.25);
        assert_eq!(DeviceTimestamp::from_secs_f64(10.25), ts);
    }

    #[test]
    fn timestamp_micros_overflow_carries() {
        let ts = DeviceTimestamp::new(1, 2_500_000);
        assert_eq!(ts, DeviceTimestamp::new(3, 500_000));
    }

    #[test]
    fn timestamp_wire_roundtrip() {
        let ts = DeviceTimestamp::new(0x0102_0304, 999_999);
        let mut buf = BytesMut::new();
        ts.encode(&mut buf);
        assert_eq!(buf.len(), DeviceTimestamp::WIRE_SIZE);
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&buf);
        assert_eq!(DeviceTimestamp::decode(&raw), ts);
    }
}
