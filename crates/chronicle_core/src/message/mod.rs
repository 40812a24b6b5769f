//! # Messages
//!
//! A message is a typed, parameterized event routed by the kernel. Once
//! handed to the kernel it is not mutated again; handlers see `&Message`.

pub mod codec;
pub mod factory;
pub mod types;

use crate::actor::ActorId;
use crate::value::{ParamValue, PropertySet};
use types::MessageType;

/// A routed event.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    msg_type: MessageType,
    /// Machine the message originated from. `None` means this machine.
    pub source: Option<ActorId>,
    /// Actor the message is about.
    pub about_actor: Option<ActorId>,
    /// Intended receiver. `None` means broadcast.
    pub destination: Option<ActorId>,
    /// Ordered named parameters.
    pub params: PropertySet,
    /// Simulation time in seconds when the message was created.
    pub sim_time: f64,
    /// Real time in microseconds since the kernel started.
    pub real_time_micros: u64,
}

impl Message {
    /// Creates a message of `msg_type` with no parameters and zero timestamps.
    ///
    /// Prefer [`factory::MessageFactory::create`], which stamps the time.
    #[must_use]
    pub fn new(msg_type: MessageType) -> Self {
        Self {
            msg_type,
            source: None,
            about_actor: None,
            destination: None,
            params: PropertySet::new(),
            sim_time: 0.0,
            real_time_micros: 0,
        }
    }

    /// Message type.
    #[inline]
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.msg_type
    }

    /// True if this message has type `t`.
    #[inline]
    #[must_use]
    pub fn is(&self, t: MessageType) -> bool {
        self.msg_type == t
    }

    /// Sets the about-actor, builder style.
    #[must_use]
    pub fn about(mut self, actor: ActorId) -> Self {
        self.about_actor = Some(actor);
        self
    }

    /// Sets the destination, builder style.
    #[must_use]
    pub fn to(mut self, actor: ActorId) -> Self {
        self.destination = Some(actor);
        self
    }

    /// Adds a parameter, builder style.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.set(name, value);
        self
    }

    /// Reads a parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// Resets the message for reuse by the pool.
    pub(crate) fn reset(&mut self, msg_type: MessageType) {
        self.msg_type = msg_type;
        self.source = None;
        self.about_actor = None;
        self.destination = None;
        self.params.clear();
        self.sim_time = 0.0;
        self.real_time_micros = 0;
    }
}
