//! # Inbound Message Queue
//!
//! The only kernel entry point that may be used from other threads.
//!
//! ```text
//! ┌──────────────┐                 ┌──────────────┐
//! │ network I/O  │──┐              │              │
//! └──────────────┘  │  crossbeam   │   Kernel     │
//! ┌──────────────┐  ├────────────> │ (tick thread)│
//! │ asset loader │──┘   channel    │              │
//! └──────────────┘                 └──────────────┘
//! ```
//!
//! Senders only enqueue. The kernel drains the channel at the start of each
//! tick, so a message sent from any thread is dispatched in the next tick.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TryRecvError, TrySendError};

use chronicle_core::Message;

use crate::error::{KernelError, KernelResult};

/// Cloneable, thread-safe handle for queueing messages into a kernel.
#[derive(Clone, Debug)]
pub struct MessageSender {
    sender: Sender<Message>,
}

impl MessageSender {
    /// Queues a message without blocking.
    ///
    /// Returns `false` if the queue is full or the kernel is gone.
    #[inline]
    pub fn try_send(&self, message: Message) -> bool {
        match self.sender.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!("Inbound message queue full, message dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Queues a message, waiting for room if the queue is bounded and full.
    ///
    /// # Errors
    ///
    /// Returns `QueueClosed` if the kernel was dropped.
    pub fn send(&self, message: Message) -> KernelResult<()> {
        self.sender.send(message).map_err(|_| KernelError::QueueClosed)
    }

    /// Messages waiting for the next tick.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.sender.len()
    }
}

/// Kernel side of the queue.
#[derive(Debug)]
pub(crate) struct InboundQueue {
    receiver: Receiver<Message>,
    sender: Sender<Message>,
}

impl InboundQueue {
    /// Creates a queue. A capacity of 0 means unbounded.
    pub(crate) fn new(capacity: usize) -> Self {
        let (sender, receiver) = if capacity == 0 {
            unbounded()
        } else {
            bounded(capacity)
        };
        Self { receiver, sender }
    }

    pub(crate) fn handle(&self) -> MessageSender {
        MessageSender {
            sender: self.sender.clone(),
        }
    }

    /// Moves everything currently queued into `out`, in arrival order.
    pub(crate) fn drain_into(&self, out: &mut impl Extend<Message>) -> usize {
        let mut count = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(message) => {
                    out.extend(std::iter::once(message));
                    count += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::types::INFO_ACTOR_UPDATED;
    use std::collections::VecDeque;

    #[test]
    fn test_cross_thread_send_arrives_in_order() {
        let queue = InboundQueue::new(0);
        let handle = queue.handle();

        let worker = std::thread::spawn(move || {
            for i in 0..100 {
                handle.send(Message::new(INFO_ACTOR_UPDATED).with("i", i)).unwrap();
            }
        });
        worker.join().unwrap();

        let mut out = VecDeque::new();
        assert_eq!(queue.drain_into(&mut out), 100);
        for (expected, msg) in out.iter().enumerate() {
            assert_eq!(msg.param("i").and_then(|v| v.as_i64()), Some(expected as i64));
        }
    }

    #[test]
    fn test_bounded_queue_reports_full() {
        let queue = InboundQueue::new(1);
        let handle = queue.handle();
        assert!(handle.try_send(Message::new(INFO_ACTOR_UPDATED)));
        assert!(!handle.try_send(Message::new(INFO_ACTOR_UPDATED)));
        assert_eq!(handle.pending_count(), 1);
    }
}
