//! # Kernel Context
//!
//! Everything a component may touch while handling a message: the actor
//! registry, the message queues, timers, and the clock. The kernel lends it
//! to components by `&mut`; components never see the kernel itself, so a
//! handler cannot re-enter `tick`.

use std::collections::VecDeque;

use chronicle_core::{
    types, Actor, ActorId, ActorSnapshot, ActorType, Invokable, Message, MessageFactory,
    MessageType, MessageTypeRegistry, Outbox, Ownership,
};

use crate::clock::{SimClock, TimerSchedule};
use crate::error::{KernelError, KernelResult};
use crate::listeners::{Listener, ListenerRegistry};
use crate::params;
use crate::registry::ActorRegistry;
use crate::sender::{InboundQueue, MessageSender};

/// Outcome of [`KernelContext::restore_actors`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Actors that did not exist and were created.
    pub created: Vec<ActorId>,
    /// Actors that existed and were overwritten.
    pub updated: usize,
}

/// Kernel state lent to components.
pub struct KernelContext {
    machine_id: ActorId,
    pub(crate) registry: ActorRegistry,
    pub(crate) listeners: ListenerRegistry,
    message_types: MessageTypeRegistry,
    pub(crate) factory: MessageFactory,
    pub(crate) clock: SimClock,
    pub(crate) timers: TimerSchedule,
    /// Delivered next tick, FIFO.
    pub(crate) pending: VecDeque<Message>,
    /// Delivered right after the message currently in dispatch.
    pub(crate) forward: VecDeque<Message>,
    /// Delivered to `dispatch_network_message` next tick.
    pub(crate) network: VecDeque<Message>,
    pub(crate) inbound: InboundQueue,
    pub(crate) removal_requests: Vec<String>,
    pub(crate) in_tick: bool,
}

impl KernelContext {
    pub(crate) fn new(pool_capacity: usize, inbound_capacity: usize, clock: SimClock) -> Self {
        let machine_id = ActorId::generate();
        Self {
            machine_id,
            registry: ActorRegistry::new(),
            listeners: ListenerRegistry::default(),
            message_types: MessageTypeRegistry::new(),
            factory: MessageFactory::new(machine_id, pool_capacity),
            clock,
            timers: TimerSchedule::default(),
            pending: VecDeque::new(),
            forward: VecDeque::new(),
            network: VecDeque::new(),
            inbound: InboundQueue::new(inbound_capacity),
            removal_requests: Vec::new(),
            in_tick: false,
        }
    }

    // =========================================================================
    // Time
    // =========================================================================

    /// Identity of this kernel as a message source.
    #[inline]
    #[must_use]
    pub const fn machine_id(&self) -> ActorId {
        self.machine_id
    }

    /// Current simulation time in seconds.
    #[inline]
    #[must_use]
    pub const fn sim_time(&self) -> f64 {
        self.clock.sim_time()
    }

    /// Current real time in microseconds since start.
    #[inline]
    #[must_use]
    pub const fn real_time_micros(&self) -> u64 {
        self.clock.real_time_micros()
    }

    /// Clock state.
    #[inline]
    #[must_use]
    pub const fn clock(&self) -> &SimClock {
        &self.clock
    }

    /// True while a tick is dispatching.
    #[inline]
    #[must_use]
    pub const fn is_in_tick(&self) -> bool {
        self.in_tick
    }

    /// Freezes or resumes simulation time from the next tick on.
    pub fn set_paused(&mut self, paused: bool) {
        tracing::info!(paused, "Simulation pause changed");
        self.clock.set_paused(paused);
    }

    /// Sets the simulation time multiplier from the next tick on.
    pub fn set_time_scale(&mut self, scale: f64) {
        tracing::info!(scale, "Simulation time scale changed");
        self.clock.set_time_scale(scale);
    }

    // =========================================================================
    // Messages
    // =========================================================================

    /// Registered message types.
    #[inline]
    #[must_use]
    pub const fn message_types(&self) -> &MessageTypeRegistry {
        &self.message_types
    }

    /// Registers an application message type.
    ///
    /// # Errors
    ///
    /// Fails if the id or name is taken.
    pub fn register_message_type(&mut self, message_type: MessageType) -> KernelResult<()> {
        self.message_types.register(message_type)?;
        Ok(())
    }

    /// Creates a pooled message stamped with this machine and the current
    /// time.
    pub fn create_message(&mut self, message_type: MessageType) -> Message {
        self.factory.create(message_type)
    }

    /// Queues a message for the next tick.
    pub fn send_message(&mut self, message: Message) {
        self.pending.push_back(message);
    }

    /// Queues a message for delivery right after the message currently being
    /// dispatched, inside the same tick. This overtakes everything queued
    /// with [`send_message`](Self::send_message).
    pub fn send_message_forward(&mut self, message: Message) {
        self.forward.push_back(message);
    }

    /// Queues a message for `dispatch_network_message` on the next tick.
    pub fn send_network_message(&mut self, message: Message) {
        self.network.push_back(message);
    }

    /// Thread-safe handle for queueing messages from other threads.
    #[must_use]
    pub fn sender(&self) -> MessageSender {
        self.inbound.handle()
    }

    /// Messages waiting for the next tick (cross-thread ones excluded).
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// True if the message came from another machine.
    #[must_use]
    pub fn is_network_origin(&self, message: &Message) -> bool {
        message.source.is_some_and(|s| s != self.machine_id)
    }

    /// Answers a request with `SERVER_REQUEST_REJECTED`.
    pub fn reject_message(&mut self, request: &Message, reason: &str) {
        tracing::warn!(
            request = request.message_type().name(),
            reason,
            "Request rejected"
        );
        let mut reply = self
            .create_message(types::SERVER_REQUEST_REJECTED)
            .with(params::REJECTED_TYPE, request.message_type().name())
            .with(params::REASON, reason);
        reply.about_actor = request.about_actor;
        reply.destination = request.source;
        self.send_message(reply);
    }

    // =========================================================================
    // Actors
    // =========================================================================

    /// All actors.
    #[inline]
    #[must_use]
    pub const fn actors(&self) -> &ActorRegistry {
        &self.registry
    }

    /// Creates a local actor and announces it with `INFO_ACTOR_CREATED`
    /// (delivered next tick). The actor is findable immediately.
    ///
    /// # Errors
    ///
    /// Returns `RemoteActorCreation` for `Ownership::Remote`: remote actors
    /// only appear through network updates.
    pub fn create_actor(&mut self, actor_type: ActorType, ownership: Ownership) -> KernelResult<ActorId> {
        if ownership == Ownership::Remote {
            return Err(KernelError::RemoteActorCreation);
        }
        let id = self.registry.insert(Actor::new(actor_type, ownership))?;
        let created = self.actor_info_message(types::INFO_ACTOR_CREATED, id)?;
        self.send_message(created);
        tracing::debug!(actor = %id, "Actor created");
        Ok(id)
    }

    /// Deletes a local actor at the end of the current (or next) tick.
    ///
    /// # Errors
    ///
    /// `NotFound` on a miss, `RemoteActorMutation` for remote actors.
    pub fn delete_actor(&mut self, id: ActorId) -> KernelResult<()> {
        if self.registry.find(id)?.is_remote() {
            return Err(KernelError::RemoteActorMutation(id));
        }
        self.retire(id)
    }

    /// Looks up an actor. Actors pending deletion are still found.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on a miss.
    pub fn find_actor(&self, id: ActorId) -> KernelResult<&Actor> {
        self.registry.find(id)
    }

    /// Mutable access to a local actor.
    ///
    /// # Errors
    ///
    /// `NotFound` on a miss, `RemoteActorMutation` for remote actors.
    pub fn actor_mut(&mut self, id: ActorId) -> KernelResult<&mut Actor> {
        self.registry.local_mut(id)
    }

    /// Builds an `INFO_ACTOR_UPDATED` carrying the actor's full state.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on a miss.
    pub fn actor_update_message(&mut self, id: ActorId) -> KernelResult<Message> {
        self.actor_info_message(types::INFO_ACTOR_UPDATED, id)
    }

    /// Announces a local actor to the network: `INFO_ACTOR_PUBLISHED`
    /// followed by a full `INFO_ACTOR_UPDATED`.
    ///
    /// # Errors
    ///
    /// `NotFound` on a miss, `RemoteActorMutation` for remote actors.
    pub fn publish_actor(&mut self, id: ActorId) -> KernelResult<()> {
        if self.registry.find(id)?.is_remote() {
            return Err(KernelError::RemoteActorMutation(id));
        }
        let published = self.create_message(types::INFO_ACTOR_PUBLISHED).about(id);
        self.send_message(published);
        let update = self.actor_update_message(id)?;
        self.send_message(update);
        Ok(())
    }

    fn actor_info_message(&mut self, message_type: MessageType, id: ActorId) -> KernelResult<Message> {
        let actor = self.registry.find(id)?;
        let mut msg = self.factory.create(message_type).about(id);
        msg.params.set(params::ACTOR_CATEGORY, actor.actor_type().category.as_str());
        msg.params.set(params::ACTOR_TYPE, actor.actor_type().name.as_str());
        msg.params.set(params::ACTOR_NAME, actor.name());
        if message_type != types::INFO_ACTOR_DELETED {
            msg.params.merge(actor.properties());
        }
        Ok(msg)
    }

    /// Flags an actor of any ownership for removal and announces it.
    pub(crate) fn retire(&mut self, id: ActorId) -> KernelResult<()> {
        let deleted = self.actor_info_message(types::INFO_ACTOR_DELETED, id)?;
        if self.registry.mark_deleted(id)? {
            self.send_message(deleted);
            tracing::debug!(actor = %id, "Actor marked for deletion");
        } else {
            self.factory.recycle(deleted);
        }
        Ok(())
    }

    pub(crate) fn registry_mut(&mut self) -> &mut ActorRegistry {
        &mut self.registry
    }

    // =========================================================================
    // Invokables and listeners
    // =========================================================================

    /// Adds an invokable to an actor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on a miss.
    pub fn add_invokable(&mut self, actor: ActorId, invokable: Invokable) -> KernelResult<()> {
        let slot = self
            .registry
            .slot_mut(actor)
            .ok_or_else(|| KernelError::actor_not_found(actor))?;
        slot.invokables.add(invokable);
        Ok(())
    }

    /// Maps messages of `message_type` about (or addressed to) `actor` to
    /// the actor's invokable `name`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on a miss.
    pub fn bind_invokable(&mut self, actor: ActorId, message_type: MessageType, name: &str) -> KernelResult<()> {
        let slot = self
            .registry
            .slot_mut(actor)
            .ok_or_else(|| KernelError::actor_not_found(actor))?;
        slot.invokables.bind(message_type, name);
        Ok(())
    }

    /// Calls `listener`'s invokable for every message of `message_type`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the listener does not exist.
    pub fn register_for_messages(&mut self, message_type: MessageType, listener: ActorId, invokable: &str) -> KernelResult<()> {
        self.registry.find(listener)?;
        self.listeners.register_global(
            message_type,
            Listener {
                actor: listener,
                invokable: invokable.to_owned(),
            },
        );
        Ok(())
    }

    /// Undoes [`register_for_messages`](Self::register_for_messages).
    pub fn unregister_for_messages(&mut self, message_type: MessageType, listener: ActorId, invokable: &str) {
        self.listeners.unregister_global(
            message_type,
            &Listener {
                actor: listener,
                invokable: invokable.to_owned(),
            },
        );
    }

    /// Calls `listener`'s invokable for every message of `message_type`
    /// about `about`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the listener does not exist.
    pub fn register_for_messages_about_actor(
        &mut self,
        message_type: MessageType,
        about: ActorId,
        listener: ActorId,
        invokable: &str,
    ) -> KernelResult<()> {
        self.registry.find(listener)?;
        self.listeners.register_about(
            message_type,
            about,
            Listener {
                actor: listener,
                invokable: invokable.to_owned(),
            },
        );
        Ok(())
    }

    /// Undoes [`register_for_messages_about_actor`](Self::register_for_messages_about_actor).
    pub fn unregister_for_messages_about_actor(
        &mut self,
        message_type: MessageType,
        about: ActorId,
        listener: ActorId,
        invokable: &str,
    ) {
        self.listeners.unregister_about(
            message_type,
            about,
            &Listener {
                actor: listener,
                invokable: invokable.to_owned(),
            },
        );
    }

    /// Runs the actor-side handlers for a message: global listeners, then
    /// the about actor's bindings, then the destination's, then listeners
    /// registered about the actor. Returns how many invokables ran.
    pub(crate) fn invoke_actor_handlers(&mut self, message: &Message) -> usize {
        let msg_type = message.message_type();
        let mut outbox = Outbox::new();
        let mut ran = 0;

        for listener in self.listeners.global_for(msg_type) {
            ran += self.invoke_named(&listener, message, &mut outbox);
        }
        if let Some(about) = message.about_actor {
            if let Some(slot) = self.registry.slot_mut(about) {
                ran += slot.invokables.invoke_bound(&mut slot.actor, message, &mut outbox);
            }
        }
        if let Some(dest) = message.destination.filter(|d| Some(*d) != message.about_actor) {
            if let Some(slot) = self.registry.slot_mut(dest) {
                ran += slot.invokables.invoke_bound(&mut slot.actor, message, &mut outbox);
            }
        }
        if let Some(about) = message.about_actor {
            for listener in self.listeners.about_for(msg_type, about) {
                ran += self.invoke_named(&listener, message, &mut outbox);
            }
        }

        self.pending.extend(outbox.drain());
        ran
    }

    fn invoke_named(&mut self, listener: &Listener, message: &Message, outbox: &mut Outbox) -> usize {
        let Some(slot) = self.registry.slot_mut(listener.actor) else {
            return 0;
        };
        match slot.invokables.get_mut(&listener.invokable) {
            Some(invokable) => {
                invokable.invoke(&mut slot.actor, message, outbox);
                1
            }
            None => 0,
        }
    }

    // =========================================================================
    // Timers
    // =========================================================================

    /// Schedules `INFO_TIMER_ELAPSED` after `interval` simulation seconds.
    /// Setting an existing timer (same name and actor) replaces it.
    pub fn set_timer(&mut self, name: &str, about: Option<ActorId>, interval: f64, repeating: bool) {
        self.timers
            .set(name, about, interval, repeating, self.clock.sim_time());
    }

    /// Cancels a timer. Returns false if none matched.
    pub fn clear_timer(&mut self, name: &str, about: Option<ActorId>) -> bool {
        self.timers.clear(name, about)
    }

    // =========================================================================
    // Replay support
    // =========================================================================

    /// Captures every actor accepted by `filter`, sorted by id. Actors
    /// pending deletion are skipped.
    pub fn snapshot_actors(&self, filter: impl Fn(&Actor) -> bool) -> Vec<ActorSnapshot> {
        let mut snapshots: Vec<ActorSnapshot> = self
            .registry
            .iter()
            .filter(|a| !self.registry.is_pending_delete(a.id()) && filter(*a))
            .map(Actor::snapshot)
            .collect();
        snapshots.sort_by_key(|s| s.id);
        snapshots
    }

    /// Resets actors to recorded state. Existing actors are overwritten in
    /// place (ownership unchanged, pending deletion cancelled); missing ones
    /// are created as remote mirrors since nothing here simulates them.
    /// No messages are sent.
    pub fn restore_actors(&mut self, snapshots: &[ActorSnapshot]) -> RestoreReport {
        let mut report = RestoreReport::default();
        for snap in snapshots {
            self.registry.unmark_deleted(snap.id);
            if let Some(actor) = self.registry.get_mut(snap.id) {
                actor.restore(snap);
                report.updated += 1;
                continue;
            }
            let mut actor = Actor::with_id(snap.id, snap.actor_type.clone(), Ownership::Remote);
            actor.restore(snap);
            match self.registry.insert(actor) {
                Ok(id) => report.created.push(id),
                Err(e) => tracing::warn!(error = %e, "Snapshot restore skipped an actor"),
            }
        }
        report
    }

    /// Flags actors of any ownership for removal. Returns how many were
    /// newly flagged.
    pub fn retire_actors(&mut self, ids: &[ActorId]) -> usize {
        let mut count = 0;
        for &id in ids {
            let already = self.registry.is_pending_delete(id);
            if self.retire(id).is_ok() && !already {
                count += 1;
            }
        }
        count
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Asks the kernel to remove a component at the end of the tick.
    pub fn request_component_removal(&mut self, name: &str) {
        self.removal_requests.push(name.to_owned());
    }
}
