use std::io::{ErrorKind, Read};

use bytes::BytesMut;

use crate::codec::{parse_step, Frame, FrameConfig, ParseFault, ParseStep};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 512;
const READ_CHUNK_SIZE: usize = 512;

/// One item pulled from the stream: a frame, or a recoverable parse fault
/// with its [`ParseFault`] envelope intact.
#[derive(Debug)]
pub enum ReadStep {
    Frame(Frame),
    Fault(ParseFault),
}

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally. Recoverable parse failures (checksum
/// mismatch, malformed frame) are returned as errors in stream order; the
/// next call resumes at the following frame boundary.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Read> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::ChannelClosed)` at a clean end of stream and
    /// `Err(FrameError::TruncatedFrame)` when the stream ends mid-frame.
    pub fn read_frame(&mut self) -> Result<Frame> {
        match self.read_step()? {
            ReadStep::Frame(frame) => Ok(frame),
            ReadStep::Fault(fault) => Err(fault.error),
        }
    }

    /// Read the next frame or recoverable parse fault (blocking).
    ///
    /// Unlike [`read_frame`](Self::read_frame), faults keep their address so
    /// a caller tracking in-flight commands can attribute them.
    pub fn read_step(&mut self) -> Result<ReadStep> {
        loop {
            match parse_step(&mut self.buf, &self.config) {
                ParseStep::Frame(frame) => return Ok(ReadStep::Frame(frame)),
                ParseStep::Fault(fault) => return Ok(ReadStep::Fault(fault)),
                ParseStep::NeedMore => {}
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                if self.buf.is_empty() {
                    return Err(FrameError::ChannelClosed);
                }
                let declared = self.buf[0] as usize;
                self.buf.clear();
                return Err(FrameError::TruncatedFrame { declared });
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{encode_frame, MessageType};
    use crate::payload::Payload;

    fn wire(frames: &[Frame]) -> Vec<u8> {
        let mut buf = BytesMut::new();
        for frame in frames {
            encode_frame(frame, &mut buf).unwrap();
        }
        buf.to_vec()
    }

    #[test]
    fn read_single_frame() {
        let frame = Frame::new(MessageType::Write, 32, Payload::U8(vec![1]));
        let mut reader = FrameReader::new(Cursor::new(wire(&[frame.clone()])));
        assert_eq!(reader.read_frame().unwrap(), frame);
    }

    #[test]
    fn read_multiple_frames() {
        let frames = [
            Frame::new(MessageType::Write, 32, Payload::U8(vec![1])),
            Frame::new(MessageType::Read, 46, Payload::U16(vec![0])),
            Frame::new(MessageType::Event, 33, Payload::U8(vec![0])),
        ];
        let mut reader = FrameReader::new(Cursor::new(wire(&frames)));
        for frame in &frames {
            assert_eq!(&reader.read_frame().unwrap(), frame);
        }
    }

    #[test]
    fn byte_by_byte_reads_accumulate() {
        let frame = Frame::new(MessageType::Write, 44, Payload::U16(vec![0xBEEF]));
        let mut reader = FrameReader::new(ByteByByteReader {
            bytes: wire(&[frame.clone()]),
            pos: 0,
        });
        assert_eq!(reader.read_frame().unwrap(), frame);
    }

    #[test]
    fn channel_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ChannelClosed
        ));
    }

    #[test]
    fn eof_mid_frame_is_truncated() {
        let frame = Frame::new(MessageType::Write, 40, Payload::U8(vec![2]));
        let mut bytes = wire(&[frame]);
        bytes.truncate(3);
        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::TruncatedFrame { declared: 5 }
        ));
        // Stream is drained afterwards.
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ChannelClosed
        ));
    }

    #[test]
    fn resynchronizes_after_corrupt_frame() {
        let a = Frame::new(MessageType::Write, 32, Payload::U8(vec![1]));
        let b = Frame::new(MessageType::Write, 33, Payload::U8(vec![0]));
        let mut bytes = wire(&[a.clone()]);
        let mut corrupt = wire(&[Frame::new(MessageType::Write, 38, Payload::U8(vec![4]))]);
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;
        bytes.extend_from_slice(&corrupt);
        bytes.extend_from_slice(&wire(&[b.clone()]));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        assert_eq!(reader.read_frame().unwrap(), a);
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::ChecksumMismatch { .. }
        ));
        assert_eq!(reader.read_frame().unwrap(), b);
    }

    #[test]
    fn read_step_keeps_fault_address() {
        let mut bytes = wire(&[Frame::new(MessageType::Write, 41, Payload::U8(vec![2]))]);
        // Patch the type byte to an unknown value and fix the checksum up.
        bytes[1] = 0x07;
        let last = bytes.len() - 1;
        bytes[last] = bytes[..last].iter().fold(0u8, |s, &b| s.wrapping_add(b));

        let mut reader = FrameReader::new(Cursor::new(bytes));
        match reader.read_step().unwrap() {
            crate::reader::ReadStep::Fault(fault) => {
                assert_eq!(fault.address, Some(41));
                assert!(matches!(
                    fault.error,
                    FrameError::UnknownMessageType { value: 0x07 }
                ));
            }
            other => panic!("expected fault, got {other:?}"),
        }
    }

    #[test]
    fn interrupted_read_retries() {
        let frame = Frame::new(MessageType::Read, 62, Payload::U8(vec![0]));
        let mut reader = FrameReader::new(InterruptedThenData {
            interrupted: false,
            bytes: wire(&[frame.clone()]),
            pos: 0,
        });
        assert_eq!(reader.read_frame().unwrap(), frame);
    }

    #[test]
    fn io_error_propagates() {
        struct FailingReader;
        impl Read for FailingReader {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::from(ErrorKind::ConnectionReset))
            }
        }
        let mut reader = FrameReader::new(FailingReader);
        assert!(matches!(
            reader.read_frame().unwrap_err(),
            FrameError::Io(e) if e.kind() == ErrorKind::ConnectionReset
        ));
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            let remaining = self.bytes.len() - self.pos;
            let n = remaining.min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
