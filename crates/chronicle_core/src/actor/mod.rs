//! # Actors
//!
//! An actor is a typed entity with identity and a property bag. Ownership
//! is fixed at creation: `Local` actors are simulated here, `Remote` actors
//! mirror state owned by another machine.

mod id;

pub use id::ActorId;

use crate::value::{ParamValue, PropertySet};

/// Who owns an actor's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Ownership {
    /// Simulated by this kernel.
    Local = 0,
    /// Mirrored from another machine.
    Remote = 1,
}

impl Ownership {
    /// Converts from u8.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Local),
            1 => Some(Self::Remote),
            _ => None,
        }
    }
}

/// Type descriptor of an actor: a category plus a name within it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActorType {
    /// Grouping, e.g. `"vehicles"`.
    pub category: String,
    /// Concrete type, e.g. `"tank"`.
    pub name: String,
}

impl ActorType {
    /// Creates a type descriptor.
    #[must_use]
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }
}

/// A simulated entity.
///
/// Owned exclusively by the kernel's actor registry. Components see it
/// through borrows only.
#[derive(Clone, Debug)]
pub struct Actor {
    id: ActorId,
    actor_type: ActorType,
    ownership: Ownership,
    name: String,
    properties: PropertySet,
}

impl Actor {
    /// Creates an actor with a fresh ID.
    #[must_use]
    pub fn new(actor_type: ActorType, ownership: Ownership) -> Self {
        Self::with_id(ActorId::generate(), actor_type, ownership)
    }

    /// Creates an actor with a known ID (remote mirrors, restored snapshots).
    #[must_use]
    pub fn with_id(id: ActorId, actor_type: ActorType, ownership: Ownership) -> Self {
        Self {
            id,
            actor_type,
            ownership,
            name: String::new(),
            properties: PropertySet::new(),
        }
    }

    /// Returns the actor's ID.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> ActorId {
        self.id
    }

    /// Returns the actor's type.
    #[inline]
    #[must_use]
    pub const fn actor_type(&self) -> &ActorType {
        &self.actor_type
    }

    /// Returns the ownership flag.
    #[inline]
    #[must_use]
    pub const fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// True for remote mirrors.
    #[inline]
    #[must_use]
    pub fn is_remote(&self) -> bool {
        self.ownership == Ownership::Remote
    }

    /// Display name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Reads a property by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.properties.get(name)
    }

    /// Writes a property by name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.properties.set(name, value);
    }

    /// All properties.
    #[inline]
    #[must_use]
    pub const fn properties(&self) -> &PropertySet {
        &self.properties
    }

    /// All properties, mutable.
    #[inline]
    pub fn properties_mut(&mut self) -> &mut PropertySet {
        &mut self.properties
    }

    /// Captures the full state of this actor.
    #[must_use]
    pub fn snapshot(&self) -> ActorSnapshot {
        ActorSnapshot {
            id: self.id,
            actor_type: self.actor_type.clone(),
            ownership: self.ownership,
            name: self.name.clone(),
            properties: self.properties.clone(),
        }
    }

    /// Replaces name and properties from a snapshot. Identity, type and
    /// ownership are never changed.
    pub fn restore(&mut self, snapshot: &ActorSnapshot) {
        self.name.clone_from(&snapshot.name);
        self.properties.clone_from(&snapshot.properties);
    }
}

/// Full captured state of one actor, as stored in keyframes.
#[derive(Clone, Debug, PartialEq)]
pub struct ActorSnapshot {
    /// Actor identity.
    pub id: ActorId,
    /// Actor type.
    pub actor_type: ActorType,
    /// Ownership at capture time.
    pub ownership: Ownership,
    /// Display name.
    pub name: String,
    /// Property bag.
    pub properties: PropertySet,
}
