//! # Invokables
//!
//! Named callbacks an actor exposes to the kernel, plus the actor's
//! `message type -> invokable name` bindings. A message type with no binding
//! simply means the actor is not interested in it.

use std::collections::HashMap;
use std::fmt;

use crate::actor::Actor;
use crate::message::types::MessageType;
use crate::message::Message;

/// Messages produced by a handler, queued by the kernel for the next tick.
#[derive(Debug, Default)]
pub struct Outbox {
    messages: Vec<Message>,
}

impl Outbox {
    /// Creates an empty outbox.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
        }
    }

    /// Queues a message.
    pub fn send(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Removes every queued message in send order.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Message> {
        self.messages.drain(..)
    }

    /// Number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

type InvokeFn = dyn FnMut(&mut Actor, &Message, &mut Outbox) + Send;

/// A named callback bound to one actor.
pub struct Invokable {
    name: String,
    callback: Box<InvokeFn>,
}

impl Invokable {
    /// Wraps a callback under `name`.
    pub fn new<F>(name: impl Into<String>, callback: F) -> Self
    where
        F: FnMut(&mut Actor, &Message, &mut Outbox) + Send + 'static,
    {
        Self {
            name: name.into(),
            callback: Box::new(callback),
        }
    }

    /// Invokable name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Runs the callback.
    pub fn invoke(&mut self, actor: &mut Actor, message: &Message, outbox: &mut Outbox) {
        (self.callback)(actor, message, outbox);
    }
}

impl fmt::Debug for Invokable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invokable").field("name", &self.name).finish()
    }
}

/// One actor's invokables and bindings.
#[derive(Debug, Default)]
pub struct InvokableTable {
    invokables: HashMap<String, Invokable>,
    bindings: HashMap<MessageType, Vec<String>>,
}

impl InvokableTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an invokable, replacing one with the same name.
    pub fn add(&mut self, invokable: Invokable) {
        self.invokables.insert(invokable.name.clone(), invokable);
    }

    /// Removes an invokable and every binding to it.
    pub fn remove(&mut self, name: &str) -> Option<Invokable> {
        for names in self.bindings.values_mut() {
            names.retain(|n| n != name);
        }
        self.invokables.remove(name)
    }

    /// Looks up an invokable.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Invokable> {
        self.invokables.get_mut(name)
    }

    /// Maps `msg_type` to the invokable `name`. Binding the same pair twice
    /// has no effect.
    pub fn bind(&mut self, msg_type: MessageType, name: impl Into<String>) {
        let name = name.into();
        let names = self.bindings.entry(msg_type).or_default();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    /// Removes a mapping.
    pub fn unbind(&mut self, msg_type: MessageType, name: &str) {
        if let Some(names) = self.bindings.get_mut(&msg_type) {
            names.retain(|n| n != name);
        }
    }

    /// Invokable names bound to `msg_type`, in binding order.
    #[must_use]
    pub fn bound(&self, msg_type: MessageType) -> &[String] {
        self.bindings.get(&msg_type).map_or(&[], Vec::as_slice)
    }

    /// Calls every invokable bound to the message's type on `actor`.
    /// Returns how many ran.
    pub fn invoke_bound(&mut self, actor: &mut Actor, message: &Message, outbox: &mut Outbox) -> usize {
        let Some(names) = self.bindings.get(&message.message_type()) else {
            return 0;
        };
        let mut ran = 0;
        for name in names {
            if let Some(invokable) = self.invokables.get_mut(name) {
                invokable.invoke(actor, message, outbox);
                ran += 1;
            }
        }
        ran
    }

    /// Number of invokables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.invokables.len()
    }

    /// Whether the table has no invokables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.invokables.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActorType, Ownership};
    use crate::message::types::{INFO_ACTOR_DELETED, INFO_ACTOR_UPDATED};

    fn actor() -> Actor {
        Actor::new(ActorType::new("test", "dummy"), Ownership::Local)
    }

    #[test]
    fn test_bound_invokable_runs() {
        let mut table = InvokableTable::new();
        table.add(Invokable::new("count", |actor, _msg, _out| {
            let n = actor.get("hits").and_then(|v| v.as_i64()).unwrap_or(0);
            actor.set("hits", n + 1);
        }));
        table.bind(INFO_ACTOR_UPDATED, "count");
        table.bind(INFO_ACTOR_UPDATED, "count");

        let mut a = actor();
        let mut out = Outbox::new();
        let ran = table.invoke_bound(&mut a, &Message::new(INFO_ACTOR_UPDATED), &mut out);
        assert_eq!(ran, 1);
        assert_eq!(a.get("hits").and_then(|v| v.as_i64()), Some(1));

        assert_eq!(table.invoke_bound(&mut a, &Message::new(INFO_ACTOR_DELETED), &mut out), 0);
    }

    #[test]
    fn test_remove_drops_bindings() {
        let mut table = InvokableTable::new();
        table.add(Invokable::new("echo", |_a, msg, out| out.send(msg.clone())));
        table.bind(INFO_ACTOR_UPDATED, "echo");
        assert_eq!(table.bound(INFO_ACTOR_UPDATED).len(), 1);

        table.remove("echo");
        assert!(table.bound(INFO_ACTOR_UPDATED).is_empty());
        assert!(table.is_empty());
    }

    #[test]
    fn test_outbox_collects_sends() {
        let mut table = InvokableTable::new();
        table.add(Invokable::new("echo", |_a, msg, out| out.send(msg.clone())));
        table.bind(INFO_ACTOR_UPDATED, "echo");

        let mut out = Outbox::new();
        table.invoke_bound(&mut actor(), &Message::new(INFO_ACTOR_UPDATED), &mut out);
        assert_eq!(out.len(), 1);
        assert_eq!(out.drain().count(), 1);
        assert!(out.is_empty());
    }
}
