//! # Network Publishing
//!
//! Mirrors local actor changes onto an outbound channel for an external
//! transport (DIS/HLA bridge, socket writer) to drain on its own thread.
//!
//! ```text
//! ┌──────────┐  INFO_ACTOR_*   ┌──────────────────┐  Sender<Message>  ┌───────────┐
//! │  Kernel  │ ──────────────> │ NetworkPublishing│ ────────────────> │ transport │
//! │ dispatch │  network queue  │    Component     │                   │  thread   │
//! └──────────┘ ──────────────> └──────────────────┘                   └─────┬─────┘
//!      ^                                                                    │
//!      └──────────────────── MessageSender (inbound) ───────────────────────┘
//! ```
//!
//! Messages that came from the network are never echoed back.

use std::collections::HashSet;

use chronicle_core::{types, ActorId, Message};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};

use crate::component::Component;
use crate::context::KernelContext;
use crate::error::{ComponentError, KernelError};

/// Name under which the publisher registers.
pub const NETWORK_PUBLISHER: &str = "network_publisher";

/// Forwards local actor state to an outbound channel.
#[derive(Debug)]
pub struct NetworkPublishingComponent {
    outbound: Sender<Message>,
    published: HashSet<ActorId>,
    forwarded: u64,
    dropped: u64,
}

impl NetworkPublishingComponent {
    /// Creates a publisher and the receiving end of its channel.
    /// A capacity of 0 means unbounded.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, Receiver<Message>) {
        let (tx, rx) = if capacity == 0 { unbounded() } else { bounded(capacity) };
        (Self::with_sender(tx), rx)
    }

    /// Creates a publisher writing into an existing channel.
    #[must_use]
    pub fn with_sender(outbound: Sender<Message>) -> Self {
        Self {
            outbound,
            published: HashSet::new(),
            forwarded: 0,
            dropped: 0,
        }
    }

    /// Messages handed to the transport.
    #[inline]
    #[must_use]
    pub const fn forwarded(&self) -> u64 {
        self.forwarded
    }

    /// Messages lost to a full channel.
    #[inline]
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped
    }

    fn forward(&mut self, message: &Message) -> Result<(), ComponentError> {
        match self.outbound.try_send(message.clone()) {
            Ok(()) => {
                self.forwarded += 1;
                Ok(())
            }
            Err(TrySendError::Full(_)) => {
                self.dropped += 1;
                Err(ComponentError::Failed("outbound network channel full".into()))
            }
            Err(TrySendError::Disconnected(_)) => Err(KernelError::QueueClosed.into()),
        }
    }
}

impl Component for NetworkPublishingComponent {
    fn name(&self) -> &str {
        NETWORK_PUBLISHER
    }

    fn process_message(&mut self, ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
        if ctx.is_network_origin(message) {
            return Ok(());
        }
        let Some(id) = message.about_actor else {
            return Ok(());
        };

        let t = message.message_type();
        if t == types::INFO_ACTOR_CREATED || t == types::INFO_ACTOR_UPDATED || t == types::INFO_ACTOR_PUBLISHED {
            if ctx.actors().get(id).is_some_and(|a| !a.is_remote()) {
                self.published.insert(id);
                return self.forward(message);
            }
        } else if t == types::INFO_ACTOR_DELETED && self.published.remove(&id) {
            return self.forward(message);
        }
        Ok(())
    }

    fn dispatch_network_message(&mut self, ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
        if ctx.is_network_origin(message) {
            return Ok(());
        }
        self.forward(message)
    }

    fn on_removed_from_kernel(&mut self, _ctx: &mut KernelContext) {
        tracing::info!(
            forwarded = self.forwarded,
            dropped = self.dropped,
            "Network publisher detached"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentPriority;
    use crate::kernel::Kernel;
    use chronicle_core::{ActorType, MessageType, Ownership};

    const CHAT: MessageType = MessageType::new(types::USER_DEFINED_START, "Chat", "Test");

    fn setup(capacity: usize) -> (Kernel, Receiver<Message>) {
        let (publisher, rx) = NetworkPublishingComponent::new(capacity);
        let mut kernel = Kernel::new();
        kernel.add_component(publisher, ComponentPriority::Lowest).unwrap();
        (kernel, rx)
    }

    #[test]
    fn test_local_actor_changes_published() {
        let (mut kernel, rx) = setup(0);
        let id = kernel
            .create_actor(ActorType::new("vehicle", "tank"), Ownership::Local)
            .unwrap();
        kernel.publish_actor(id).unwrap();
        kernel.tick(0.1, 0.1);

        let sent: Vec<MessageType> = rx.try_iter().map(|m| m.message_type()).collect();
        assert_eq!(
            sent,
            vec![types::INFO_ACTOR_CREATED, types::INFO_ACTOR_PUBLISHED, types::INFO_ACTOR_UPDATED]
        );

        kernel.delete_actor(id).unwrap();
        kernel.tick(0.1, 0.1);
        assert_eq!(rx.try_recv().unwrap().message_type(), types::INFO_ACTOR_DELETED);
    }

    #[test]
    fn test_network_origin_not_echoed() {
        let (mut kernel, rx) = setup(0);
        let mut msg = kernel
            .create_message(types::INFO_ACTOR_CREATED)
            .about(ActorId::generate());
        msg.source = Some(ActorId::generate());
        kernel.send_message(msg.clone());
        kernel.send_network_message(msg);
        kernel.tick(0.1, 0.1);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_network_queue_forwarded() {
        let (mut kernel, rx) = setup(0);
        let msg = kernel.create_message(CHAT).with("text", "hello");
        kernel.send_network_message(msg);
        let stats = kernel.tick(0.1, 0.1);

        assert_eq!(stats.network_messages, 1);
        let out = rx.try_recv().unwrap();
        assert_eq!(out.message_type(), CHAT);
        assert_eq!(out.param("text").and_then(chronicle_core::ParamValue::as_str), Some("hello"));
    }

    #[test]
    fn test_full_channel_reports_fault() {
        let (mut kernel, _rx) = setup(1);
        for _ in 0..2 {
            let msg = kernel.create_message(CHAT);
            kernel.send_network_message(msg);
        }
        let stats = kernel.tick(0.1, 0.1);
        assert_eq!(stats.component_faults, 1);
        assert_eq!(kernel.component::<NetworkPublishingComponent>().unwrap().dropped(), 1);
    }
}
