//! FIFO correlation of outstanding commands with device replies.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, PoisonError};

use harpwire_frame::{Frame, MessageType};
use tracing::debug;

use crate::error::DeviceError;

type ReplyResult = std::result::Result<Frame, DeviceError>;

struct PendingRequest {
    id: u64,
    command: MessageType,
    tx: mpsc::Sender<ReplyResult>,
    cancelled: Arc<AtomicBool>,
}

#[derive(Default)]
struct PendingState {
    by_address: HashMap<u8, VecDeque<PendingRequest>>,
    next_id: u64,
}

/// One registered request: the reply receiver plus the bookkeeping the
/// request handle needs to cancel or abandon its slot.
pub(crate) struct PendingSlot {
    pub id: u64,
    pub rx: mpsc::Receiver<ReplyResult>,
    pub cancelled: Arc<AtomicBool>,
}

/// Per-address FIFO queues of requests awaiting a reply.
///
/// The protocol has no sequence numbers: replies carry only the register
/// address and a message type, so the oldest compatible pending request for
/// that address is the one a reply resolves.
#[derive(Default)]
pub(crate) struct PendingTable {
    state: Mutex<PendingState>,
}

impl PendingTable {
    fn lock(&self) -> std::sync::MutexGuard<'_, PendingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Enqueue a request for `address` issued as a `command` frame.
    pub fn register(&self, address: u8, command: MessageType) -> PendingSlot {
        let (tx, rx) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state
            .by_address
            .entry(address)
            .or_default()
            .push_back(PendingRequest {
                id,
                command,
                tx,
                cancelled: Arc::clone(&cancelled),
            });
        PendingSlot { id, rx, cancelled }
    }

    /// Deliver a reply to the oldest compatible pending request for its
    /// address. Cancelled requests are skipped and dropped. Returns the
    /// frame back when nothing matches, so the caller can treat it as
    /// unsolicited.
    pub fn resolve(&self, frame: Frame) -> Option<Frame> {
        let mut state = self.lock();
        let Some(queue) = state.by_address.get_mut(&frame.address) else {
            return Some(frame);
        };

        queue.retain(|req| !req.cancelled.load(Ordering::Acquire));

        let matched = queue
            .iter()
            .position(|req| frame.message_type.is_reply_to(req.command));
        let Some(index) = matched else {
            return Some(frame);
        };
        let Some(request) = queue.remove(index) else {
            return Some(frame);
        };

        let result = if frame.message_type.is_error() {
            Err(DeviceError::CommandFailed {
                message_type: frame.message_type,
                address: frame.address,
            })
        } else {
            Ok(frame)
        };
        if request.tx.send(result).is_err() {
            debug!(id = request.id, "reply receiver already gone");
        }
        None
    }

    /// Attach a recoverable parse fault to the oldest pending request for
    /// `address`. Returns false when nothing was pending there.
    pub fn fail_oldest(&self, address: u8, error: DeviceError) -> bool {
        let mut state = self.lock();
        let Some(queue) = state.by_address.get_mut(&address) else {
            return false;
        };
        queue.retain(|req| !req.cancelled.load(Ordering::Acquire));
        match queue.pop_front() {
            Some(request) => {
                let _ = request.tx.send(Err(error));
                true
            }
            None => false,
        }
    }

    /// Drop the slot for a request that timed out or was cancelled, so a
    /// later reply can never match it.
    pub fn remove(&self, address: u8, id: u64) {
        let mut state = self.lock();
        if let Some(queue) = state.by_address.get_mut(&address) {
            queue.retain(|req| req.id != id);
        }
    }

    /// Fail every outstanding request; used when the channel dies.
    pub fn fail_all(&self, make_error: impl Fn() -> DeviceError) {
        let mut state = self.lock();
        for (_, queue) in state.by_address.drain() {
            for request in queue {
                let _ = request.tx.send(Err(make_error()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harpwire_frame::Payload;

    fn reply(address: u8, value: u8) -> Frame {
        Frame::new(MessageType::Write, address, Payload::U8(vec![value]))
    }

    #[test]
    fn fifo_within_address() {
        let table = PendingTable::default();
        let first = table.register(40, MessageType::Write);
        let second = table.register(40, MessageType::Write);

        assert!(table.resolve(reply(40, 1)).is_none());
        assert!(table.resolve(reply(40, 2)).is_none());

        assert_eq!(
            first.rx.try_recv().unwrap().unwrap().payload,
            Payload::U8(vec![1])
        );
        assert_eq!(
            second.rx.try_recv().unwrap().unwrap().payload,
            Payload::U8(vec![2])
        );
    }

    #[test]
    fn addresses_do_not_cross_match() {
        let table = PendingTable::default();
        let slot = table.register(40, MessageType::Write);

        let stray = table.resolve(reply(41, 1));
        assert!(stray.is_some());
        assert!(slot.rx.try_recv().is_err());
    }

    #[test]
    fn reply_kind_must_match_command() {
        let table = PendingTable::default();
        let write = table.register(40, MessageType::Write);
        let read = table.register(40, MessageType::Read);

        // A read reply skips the older write request.
        let frame = Frame::new(MessageType::Read, 40, Payload::U8(vec![9]));
        assert!(table.resolve(frame).is_none());
        assert!(write.rx.try_recv().is_err());
        assert!(read.rx.try_recv().unwrap().is_ok());
    }

    #[test]
    fn error_reply_resolves_as_command_failed() {
        let table = PendingTable::default();
        let slot = table.register(33, MessageType::Write);

        let frame = Frame::new(MessageType::WriteError, 33, Payload::U8(vec![0]));
        assert!(table.resolve(frame).is_none());
        let err = slot.rx.try_recv().unwrap().unwrap_err();
        assert!(matches!(
            err,
            DeviceError::CommandFailed {
                message_type: MessageType::WriteError,
                address: 33
            }
        ));
    }

    #[test]
    fn cancelled_request_never_matches() {
        let table = PendingTable::default();
        let first = table.register(40, MessageType::Write);
        let second = table.register(40, MessageType::Write);

        first.cancelled.store(true, Ordering::Release);
        table.remove(40, first.id);

        assert!(table.resolve(reply(40, 7)).is_none());
        assert_eq!(
            second.rx.try_recv().unwrap().unwrap().payload,
            Payload::U8(vec![7])
        );
    }

    #[test]
    fn fail_all_reaches_every_request() {
        let table = PendingTable::default();
        let slots = [
            table.register(40, MessageType::Write),
            table.register(41, MessageType::Read),
            table.register(40, MessageType::Read),
        ];
        table.fail_all(|| DeviceError::ChannelClosed);
        for slot in slots {
            assert!(matches!(
                slot.rx.try_recv().unwrap().unwrap_err(),
                DeviceError::ChannelClosed
            ));
        }
    }

    #[test]
    fn fail_oldest_takes_queue_head() {
        let table = PendingTable::default();
        let first = table.register(40, MessageType::Read);
        let second = table.register(40, MessageType::Read);

        assert!(table.fail_oldest(40, DeviceError::ChannelClosed));
        assert!(first.rx.try_recv().unwrap().is_err());
        assert!(second.rx.try_recv().is_err());

        assert!(!table.fail_oldest(99, DeviceError::ChannelClosed));
    }
}
