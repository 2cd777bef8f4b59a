use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use harpwire_channel::ChannelStream;
use harpwire_frame::{
    Frame, FrameConfig, FrameError, FrameReader, FrameWriter, MessageType, Payload, ReadStep,
};
use harpwire_registers::{addr, resolve};
use tracing::{debug, info, warn};

use crate::error::{DeviceError, Result};
use crate::pending::{PendingSlot, PendingTable};

/// Configuration for a device connection.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Default deadline for [`RequestHandle::wait`].
    pub reply_timeout: Duration,
    /// Framing limits applied to both directions.
    pub frame: FrameConfig,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            reply_timeout: Duration::from_secs(1),
            frame: FrameConfig::default(),
        }
    }
}

/// A connected register-protocol device.
///
/// One reader thread is the sole consumer of the inbound stream. Replies are
/// matched to outstanding commands through a per-address FIFO; everything
/// else (events, unmatched replies) is delivered on [`Device::events`].
pub struct Device<S: ChannelStream> {
    endpoint: String,
    config: DeviceConfig,
    writer: Mutex<FrameWriter<S>>,
    control: S,
    pending: Arc<PendingTable>,
    events: mpsc::Receiver<Frame>,
    closed: Arc<AtomicBool>,
    reader: Option<JoinHandle<()>>,
}

impl<S: ChannelStream> Device<S> {
    /// Connect over `stream` and verify the endpoint's identity.
    ///
    /// Spawns the reader thread, then reads the who-am-i register; a
    /// mismatch against `expected_device` tears the connection down and
    /// fails with [`DeviceError::UnexpectedDevice`].
    pub fn connect(
        stream: S,
        endpoint: impl Into<String>,
        expected_device: u16,
        config: DeviceConfig,
    ) -> Result<Self> {
        let endpoint = endpoint.into();
        let reader_stream = stream.try_clone()?;
        let control = stream.try_clone()?;

        let reader = FrameReader::with_config(reader_stream, config.frame.clone());
        let writer = FrameWriter::with_config(stream, config.frame.clone());
        let pending = Arc::new(PendingTable::default());
        let closed = Arc::new(AtomicBool::new(false));
        let (event_tx, event_rx) = mpsc::channel();

        let reader_pending = Arc::clone(&pending);
        let reader_closed = Arc::clone(&closed);
        let handle = thread::Builder::new()
            .name("harpwire-reader".to_string())
            .spawn(move || run_reader(reader, reader_pending, event_tx, reader_closed))?;

        let mut device = Self {
            endpoint,
            config,
            writer: Mutex::new(writer),
            control,
            pending,
            events: event_rx,
            closed,
            reader: Some(handle),
        };

        if let Err(err) = device.identity_handshake(expected_device) {
            device.close();
            return Err(err);
        }
        Ok(device)
    }

    fn identity_handshake(&self, expected: u16) -> Result<()> {
        let reply = self.read(addr::WHO_AM_I)?.wait()?;
        resolve(addr::WHO_AM_I)?.check_payload(&reply.payload)?;
        let found = reply.payload.scalar_u16().unwrap_or_default();
        if found != expected {
            return Err(DeviceError::UnexpectedDevice {
                endpoint: self.endpoint.clone(),
                expected,
                found,
            });
        }
        info!(endpoint = %self.endpoint, who_am_i = found, "device identity verified");
        Ok(())
    }

    /// Issue a read command for the register at `address`.
    ///
    /// Register resolution and access checks happen before anything touches
    /// the channel.
    pub fn read(&self, address: u8) -> Result<RequestHandle> {
        let frame = resolve(address)?.read_command()?;
        self.submit(frame)
    }

    /// Issue a write command carrying `payload` to the register at `address`.
    pub fn write(&self, address: u8, payload: Payload) -> Result<RequestHandle> {
        let frame = resolve(address)?.write_command(payload)?;
        self.submit(frame)
    }

    fn submit(&self, frame: Frame) -> Result<RequestHandle> {
        if self.closed.load(Ordering::Acquire) {
            return Err(DeviceError::ChannelClosed);
        }

        let slot = self.pending.register(frame.address, frame.message_type);
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(err) = writer.send(&frame) {
            self.pending.remove(frame.address, slot.id);
            return Err(map_send_error(err));
        }
        debug!(
            message_type = %frame.message_type,
            address = frame.address,
            id = slot.id,
            "command sent"
        );
        Ok(RequestHandle::new(
            frame.address,
            slot,
            Arc::clone(&self.pending),
            self.config.reply_timeout,
        ))
    }

    /// Receiver for event frames and unmatched replies, in arrival order.
    pub fn events(&self) -> &mpsc::Receiver<Frame> {
        &self.events
    }

    /// The endpoint description given at connect time.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// True once the channel has failed or been shut down.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Tear the connection down and wait for the reader thread to exit.
    /// Outstanding requests fail with [`DeviceError::ChannelClosed`].
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        if let Err(err) = self.control.shutdown() {
            debug!(error = %err, "channel shutdown");
        }
        if let Some(handle) = self.reader.take() {
            if handle.join().is_err() {
                warn!(endpoint = %self.endpoint, "reader thread panicked");
            }
        }
    }
}

impl<S: ChannelStream> Drop for Device<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: ChannelStream> std::fmt::Debug for Device<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Device")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// An in-flight command awaiting its reply.
pub struct RequestHandle {
    address: u8,
    id: u64,
    rx: mpsc::Receiver<Result<Frame>>,
    cancelled: Arc<AtomicBool>,
    pending: Arc<PendingTable>,
    timeout: Duration,
}

impl RequestHandle {
    fn new(address: u8, slot: PendingSlot, pending: Arc<PendingTable>, timeout: Duration) -> Self {
        Self {
            address,
            id: slot.id,
            rx: slot.rx,
            cancelled: slot.cancelled,
            pending,
            timeout,
        }
    }

    /// The register address this request targets.
    pub fn address(&self) -> u8 {
        self.address
    }

    /// Block until the reply arrives, up to the configured default deadline.
    pub fn wait(self) -> Result<Frame> {
        let timeout = self.timeout;
        self.wait_timeout(timeout)
    }

    /// Block until the reply arrives, up to `timeout`. On timeout the FIFO
    /// slot is freed so a late reply can never match this request.
    pub fn wait_timeout(self, timeout: Duration) -> Result<Frame> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                self.pending.remove(self.address, self.id);
                debug!(address = self.address, id = self.id, "request timed out");
                Err(DeviceError::TimedOut(timeout))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(DeviceError::ChannelClosed),
        }
    }

    /// Abandon the request. A cancelled request can never match a reply.
    pub fn cancel(self) {
        self.cancelled.store(true, Ordering::Release);
        self.pending.remove(self.address, self.id);
        debug!(address = self.address, id = self.id, "request cancelled");
    }
}

impl std::fmt::Debug for RequestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestHandle")
            .field("address", &self.address)
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

fn map_send_error(err: FrameError) -> DeviceError {
    match err {
        FrameError::ChannelClosed => DeviceError::ChannelClosed,
        other => DeviceError::Frame(other),
    }
}

/// A checksum-valid frame must still belong to a mapped register and carry
/// the payload shape that register's descriptor declares.
fn check_inbound(frame: &Frame) -> Result<()> {
    let descriptor = resolve(frame.address)?;
    descriptor.check_payload(&frame.payload)?;
    Ok(())
}

fn run_reader<S: ChannelStream>(
    mut reader: FrameReader<S>,
    pending: Arc<PendingTable>,
    events: mpsc::Sender<Frame>,
    closed: Arc<AtomicBool>,
) {
    loop {
        match reader.read_step() {
            Ok(ReadStep::Frame(frame)) => {
                if let Err(err) = check_inbound(&frame) {
                    warn!(address = frame.address, error = %err, "inbound frame rejected");
                    pending.fail_oldest(frame.address, err);
                    continue;
                }
                if let Some(unmatched) = pending.resolve(frame) {
                    if unmatched.message_type != MessageType::Event {
                        debug!(
                            message_type = %unmatched.message_type,
                            address = unmatched.address,
                            "unsolicited reply"
                        );
                    }
                    if events.send(unmatched).is_err() {
                        debug!("event subscriber gone; frame dropped");
                    }
                }
            }
            Ok(ReadStep::Fault(fault)) => {
                warn!(address = ?fault.address, error = %fault.error, "corrupt frame skipped");
                if let Some(address) = fault.address {
                    pending.fail_oldest(address, DeviceError::Frame(fault.error));
                }
            }
            Err(FrameError::ChannelClosed) => {
                debug!("channel reached end of stream");
                break;
            }
            Err(FrameError::Io(err)) => {
                warn!(error = %err, "channel read failed");
                break;
            }
            Err(err) => {
                // Stream ended mid-frame; the next read observes the close.
                warn!(error = %err, "stream error");
            }
        }
    }
    closed.store(true, Ordering::Release);
    pending.fail_all(|| DeviceError::ChannelClosed);
}
