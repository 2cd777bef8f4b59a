use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use tracing::debug;

use crate::error::Result;
use crate::traits::ChannelStream;

/// In-memory byte-duplex pair.
///
/// Stands in for a real device link in tests and simulations: bytes written
/// on one end become readable on the other, reads block until data arrives,
/// and dropping the last handle of one end closes it so the peer observes
/// end-of-stream.
pub struct Loopback {
    rx: Arc<Pipe>,
    tx: Arc<Pipe>,
    handles: Arc<AtomicUsize>,
}

struct Pipe {
    state: Mutex<PipeState>,
    readable: Condvar,
}

struct PipeState {
    data: VecDeque<u8>,
    closed: bool,
}

impl Pipe {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(PipeState {
                data: VecDeque::new(),
                closed: false,
            }),
            readable: Condvar::new(),
        })
    }

    fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        loop {
            if !state.data.is_empty() {
                let n = buf.len().min(state.data.len());
                for slot in buf.iter_mut().take(n) {
                    // non-empty checked above; n is bounded by data.len()
                    if let Some(byte) = state.data.pop_front() {
                        *slot = byte;
                    }
                }
                return Ok(n);
            }
            if state.closed {
                return Ok(0);
            }
            state = self
                .readable
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn write(&self, buf: &[u8]) -> std::io::Result<usize> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        }
        state.data.extend(buf.iter().copied());
        self.readable.notify_all();
        Ok(buf.len())
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        self.readable.notify_all();
    }
}

impl Loopback {
    /// Create a connected pair of loopback streams.
    pub fn pair() -> (Self, Self) {
        let a = Pipe::new();
        let b = Pipe::new();
        let left = Self {
            rx: Arc::clone(&a),
            tx: Arc::clone(&b),
            handles: Arc::new(AtomicUsize::new(1)),
        };
        let right = Self {
            rx: b,
            tx: a,
            handles: Arc::new(AtomicUsize::new(1)),
        };
        (left, right)
    }
}

impl Read for Loopback {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.rx.read(buf)
    }
}

impl Write for Loopback {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.tx.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl ChannelStream for Loopback {
    fn try_clone(&self) -> Result<Self> {
        self.handles.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            rx: Arc::clone(&self.rx),
            tx: Arc::clone(&self.tx),
            handles: Arc::clone(&self.handles),
        })
    }

    fn shutdown(&self) -> Result<()> {
        debug!("loopback shutdown");
        self.tx.close();
        self.rx.close();
        Ok(())
    }
}

impl Drop for Loopback {
    fn drop(&mut self) {
        if self.handles.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.tx.close();
            self.rx.close();
        }
    }
}

impl std::fmt::Debug for Loopback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Loopback")
            .field("handles", &self.handles.load(Ordering::SeqCst))
            .finish()
    }
}
