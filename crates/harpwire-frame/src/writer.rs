use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 512;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
}

impl<T: Write> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            config,
        }
    }

    /// Serialize and write a complete frame (blocking), then flush.
    pub fn send(&mut self, frame: &Frame) -> Result<()> {
        if frame.body_len() > self.config.max_body_len {
            return Err(FrameError::FrameTooLarge {
                declared: frame.body_len(),
                max: self.config.max_body_len,
            });
        }

        self.buf.clear();
        encode_frame(frame, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ChannelClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
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

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::{decode_frame, MessageType};
    use crate::payload::Payload;
    use crate::reader::FrameReader;

    #[test]
    fn written_bytes_decode() {
        let frame = Frame::new(MessageType::Write, 39, Payload::U8(vec![128]));
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(&frame).unwrap();

        let mut wire = BytesMut::from(writer.into_inner().into_inner().as_slice());
        let decoded = decode_frame(&mut wire, &FrameConfig::default())
            .unwrap()
            .unwrap();
        assert_eq!(decoded, frame);
        assert!(wire.is_empty());
    }

    #[test]
    fn oversized_frame_rejected_before_write() {
        let config = FrameConfig { max_body_len: 8 };
        let mut writer = FrameWriter::with_config(Cursor::new(Vec::<u8>::new()), config);
        let frame = Frame::new(MessageType::Write, 40, Payload::U32(vec![0; 4]));
        let err = writer.send(&frame).unwrap_err();
        assert!(matches!(err, FrameError::FrameTooLarge { .. }));
        assert!(writer.get_ref().get_ref().is_empty());
    }

    #[test]
    fn zero_length_write_is_channel_closed() {
        struct ZeroWriter;
        impl Write for ZeroWriter {
            fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
                Ok(0)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut writer = FrameWriter::new(ZeroWriter);
        let frame = Frame::new(MessageType::Read, 32, Payload::U8(vec![0]));
        assert!(matches!(
            writer.send(&frame).unwrap_err(),
            FrameError::ChannelClosed
        ));
    }

    #[test]
    fn interrupted_write_retries() {
        struct InterruptedOnce {
            tripped: bool,
            data: Vec<u8>,
        }
        impl Write for InterruptedOnce {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                if !self.tripped {
                    self.tripped = true;
                    return Err(std::io::Error::from(ErrorKind::Interrupted));
                }
                self.data.extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let frame = Frame::new(MessageType::Write, 43, Payload::U8(vec![3]));
        let mut writer = FrameWriter::new(InterruptedOnce {
            tripped: false,
            data: Vec::new(),
        });
        writer.send(&frame).unwrap();
        assert_eq!(writer.get_ref().data.len(), frame.wire_size());
    }

    #[cfg(unix)]
    #[test]
    fn roundtrip_over_pipe() {
        let (left, right) = std::os::unix::net::UnixStream::pair().unwrap();
        let mut writer = FrameWriter::new(left);
        let mut reader = FrameReader::new(right);

        let frame = Frame::new(MessageType::Event, 33, Payload::U8(vec![1]));
        writer.send(&frame).unwrap();
        assert_eq!(reader.read_frame().unwrap(), frame);
    }
}
