use std::io::{Read, Write};

use crate::error::Result;

/// A connected byte-duplex device link.
///
/// One clone feeds the inbound parse loop while another serializes outgoing
/// command frames, so implementations must support cloning the underlying
/// handle (serial ports and sockets all do). `shutdown` must unblock any
/// reader parked on the stream; after it, reads observe end-of-stream and
/// writes fail.
pub trait ChannelStream: Read + Write + Send + 'static {
    /// Clone this stream into a second independent handle.
    fn try_clone(&self) -> Result<Self>
    where
        Self: Sized;

    /// Tear the link down, waking any blocked reader.
    fn shutdown(&self) -> Result<()>;
}
