//! # Default Message Processor
//!
//! Applies actor info messages to the registry:
//!
//! ```text
//!                       │ actor is local     │ actor is remote │ actor unknown
//! ──────────────────────┼────────────────────┼─────────────────┼──────────────────
//! local origin          │ apply properties   │ ignore + warn   │ ignore + warn
//! network origin        │ reject + warn      │ apply           │ create mirror,
//!                       │                    │                 │ then apply
//! ```
//!
//! `INFO_ACTOR_DELETED` from the network retires the remote mirror.

use chronicle_core::{types, Actor, ActorId, ActorType, Message, Ownership};

use crate::component::Component;
use crate::context::KernelContext;
use crate::error::ComponentError;
use crate::params;

/// Name under which the processor registers.
pub const DEFAULT_MESSAGE_PROCESSOR: &str = "default_message_processor";

/// Counters kept by [`DefaultMessageProcessor`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessorStats {
    /// Updates applied to existing actors.
    pub applied: u64,
    /// Remote mirrors created from network traffic.
    pub mirrors_created: u64,
    /// Remote mirrors retired by network deletes.
    pub mirrors_retired: u64,
    /// Updates refused or ignored.
    pub rejected: u64,
}

/// Keeps the actor registry in step with actor info messages.
#[derive(Debug, Default)]
pub struct DefaultMessageProcessor {
    stats: ProcessorStats,
}

impl DefaultMessageProcessor {
    /// Creates a processor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters so far.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> ProcessorStats {
        self.stats
    }

    fn process_actor_update(&mut self, ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
        let Some(id) = message.about_actor else {
            tracing::warn!(
                message_type = message.message_type().name(),
                "Actor update without an actor id ignored"
            );
            self.stats.rejected += 1;
            return Ok(());
        };
        let network = ctx.is_network_origin(message);

        match (ctx.actors().get(id).map(Actor::is_remote), network) {
            (Some(false), false) | (Some(true), true) => {}
            (Some(false), true) => {
                tracing::warn!(actor = %id, "Network update for a local actor rejected");
                self.stats.rejected += 1;
                return Ok(());
            }
            (Some(true), false) => {
                tracing::warn!(actor = %id, "Local update for a remote actor ignored");
                self.stats.rejected += 1;
                return Ok(());
            }
            (None, true) => {
                ctx.registry_mut().insert(mirror_for(id, message))?;
                self.stats.mirrors_created += 1;
                tracing::debug!(actor = %id, "Remote actor mirrored");
            }
            (None, false) => {
                tracing::warn!(actor = %id, "Update for unknown actor ignored");
                self.stats.rejected += 1;
                return Ok(());
            }
        }

        if let Some(actor) = ctx.registry_mut().get_mut(id) {
            apply_update(actor, message);
            self.stats.applied += 1;
        }
        Ok(())
    }

    fn process_actor_delete(&mut self, ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
        if !ctx.is_network_origin(message) {
            return Ok(());
        }
        let Some(id) = message.about_actor else {
            return Ok(());
        };
        match ctx.actors().get(id).map(Actor::is_remote) {
            Some(true) => {
                // The inbound delete is the announcement; nothing new is sent.
                if ctx.registry_mut().mark_deleted(id)? {
                    self.stats.mirrors_retired += 1;
                    tracing::debug!(actor = %id, "Remote actor retired");
                }
            }
            Some(false) => {
                tracing::warn!(actor = %id, "Network delete for a local actor rejected");
                self.stats.rejected += 1;
            }
            None => {}
        }
        Ok(())
    }
}

impl Component for DefaultMessageProcessor {
    fn name(&self) -> &str {
        DEFAULT_MESSAGE_PROCESSOR
    }

    fn process_message(&mut self, ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
        let t = message.message_type();
        if t == types::INFO_ACTOR_CREATED || t == types::INFO_ACTOR_UPDATED {
            self.process_actor_update(ctx, message)
        } else if t == types::INFO_ACTOR_DELETED {
            self.process_actor_delete(ctx, message)
        } else {
            Ok(())
        }
    }
}

fn mirror_for(id: ActorId, message: &Message) -> Actor {
    let text = |name: &str| {
        message
            .param(name)
            .and_then(chronicle_core::ParamValue::as_str)
            .unwrap_or("unknown")
            .to_owned()
    };
    let actor_type = ActorType::new(text(params::ACTOR_CATEGORY), text(params::ACTOR_TYPE));
    Actor::with_id(id, actor_type, Ownership::Remote)
}

fn apply_update(actor: &mut Actor, message: &Message) {
    for (name, value) in message.params.iter() {
        if name == params::ACTOR_NAME {
            if let Some(n) = value.as_str() {
                actor.set_name(n);
            }
        } else if !params::is_actor_metadata(name) {
            actor.set(name, value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::ComponentPriority;
    use crate::kernel::Kernel;
    use chronicle_core::ParamValue;

    fn kernel() -> Kernel {
        let mut kernel = Kernel::new();
        kernel
            .add_component(DefaultMessageProcessor::new(), ComponentPriority::Normal)
            .unwrap();
        kernel
    }

    fn from_elsewhere(kernel: &mut Kernel, message_type: chronicle_core::MessageType, id: ActorId) -> Message {
        let mut msg = kernel.create_message(message_type).about(id);
        msg.source = Some(ActorId::generate());
        msg
    }

    #[test]
    fn test_local_update_applies_properties() {
        let mut kernel = kernel();
        let id = kernel
            .create_actor(ActorType::new("vehicle", "tank"), Ownership::Local)
            .unwrap();
        kernel.tick(0.1, 0.1);

        let update = kernel
            .create_message(types::INFO_ACTOR_UPDATED)
            .about(id)
            .with("x", 5_i32)
            .with(params::ACTOR_NAME, "alpha");
        kernel.send_message(update);
        kernel.tick(0.1, 0.1);

        let actor = kernel.find_actor(id).unwrap();
        assert_eq!(actor.get("x"), Some(&ParamValue::Int32(5)));
        assert_eq!(actor.name(), "alpha");
        assert!(actor.get(params::ACTOR_NAME).is_none());
    }

    #[test]
    fn test_network_update_creates_remote_mirror() {
        let mut kernel = kernel();
        let id = ActorId::generate();
        let msg = from_elsewhere(&mut kernel, types::INFO_ACTOR_CREATED, id)
            .with(params::ACTOR_CATEGORY, "vehicle")
            .with(params::ACTOR_TYPE, "truck")
            .with("speed", 12.5_f64);
        kernel.send_message(msg);
        kernel.tick(0.1, 0.1);

        let actor = kernel.find_actor(id).unwrap();
        assert!(actor.is_remote());
        assert_eq!(actor.actor_type().name, "truck");
        assert_eq!(actor.get("speed").and_then(ParamValue::as_f64), Some(12.5));
        assert!(actor.get(params::ACTOR_CATEGORY).is_none());
        assert_eq!(
            kernel.component::<DefaultMessageProcessor>().unwrap().stats().mirrors_created,
            1
        );
    }

    #[test]
    fn test_network_update_of_local_actor_rejected() {
        let mut kernel = kernel();
        let id = kernel
            .create_actor(ActorType::new("vehicle", "tank"), Ownership::Local)
            .unwrap();
        let msg = from_elsewhere(&mut kernel, types::INFO_ACTOR_UPDATED, id).with("x", 99_i32);
        kernel.send_message(msg);
        kernel.tick(0.1, 0.1);

        assert!(kernel.find_actor(id).unwrap().get("x").is_none());
        assert_eq!(kernel.component::<DefaultMessageProcessor>().unwrap().stats().rejected, 1);
    }

    #[test]
    fn test_local_update_of_unknown_actor_ignored() {
        let mut kernel = kernel();
        let id = ActorId::generate();
        let msg = kernel.create_message(types::INFO_ACTOR_UPDATED).about(id).with("x", 1_i32);
        kernel.send_message(msg);
        kernel.tick(0.1, 0.1);
        assert!(kernel.find_actor(id).is_err());
    }

    #[test]
    fn test_network_delete_retires_mirror() {
        let mut kernel = kernel();
        let id = ActorId::generate();
        let created = from_elsewhere(&mut kernel, types::INFO_ACTOR_CREATED, id);
        kernel.send_message(created);
        kernel.tick(0.1, 0.1);
        assert!(kernel.find_actor(id).is_ok());

        let deleted = from_elsewhere(&mut kernel, types::INFO_ACTOR_DELETED, id);
        kernel.send_message(deleted);
        kernel.tick(0.1, 0.1);
        assert!(kernel.find_actor(id).is_err());
    }
}
