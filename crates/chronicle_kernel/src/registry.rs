//! # Actor Registry
//!
//! Sole owner of every actor. Storage is dense: actors live contiguously in
//! a `Vec` with an id-to-slot index, and retirement swap-removes.
//!
//! Deletion is two-phase. `mark_deleted` flags the actor; it stays findable
//! until the kernel calls `remove_marked` at the end of the tick.

use std::collections::HashMap;

use chronicle_core::{Actor, ActorId, InvokableTable};

use crate::error::{KernelError, KernelResult};

/// An actor plus its invokable bindings.
#[derive(Debug)]
pub(crate) struct ActorSlot {
    pub(crate) actor: Actor,
    pub(crate) invokables: InvokableTable,
    pub(crate) pending_delete: bool,
}

/// Dense actor storage.
#[derive(Debug, Default)]
pub struct ActorRegistry {
    slots: Vec<ActorSlot>,
    index: HashMap<ActorId, usize>,
    marked: Vec<ActorId>,
}

impl ActorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an actor.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateActor` if the id is taken.
    pub(crate) fn insert(&mut self, actor: Actor) -> KernelResult<ActorId> {
        let id = actor.id();
        if self.index.contains_key(&id) {
            return Err(KernelError::DuplicateActor(id));
        }
        self.index.insert(id, self.slots.len());
        self.slots.push(ActorSlot {
            actor,
            invokables: InvokableTable::new(),
            pending_delete: false,
        });
        Ok(id)
    }

    /// Looks up an actor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on a miss.
    pub fn find(&self, id: ActorId) -> KernelResult<&Actor> {
        self.get(id).ok_or_else(|| KernelError::actor_not_found(id))
    }

    /// Looks up an actor, `None` on a miss.
    #[must_use]
    pub fn get(&self, id: ActorId) -> Option<&Actor> {
        self.index.get(&id).map(|&i| &self.slots[i].actor)
    }

    /// True if the actor exists (pending deletion included).
    #[must_use]
    pub fn contains(&self, id: ActorId) -> bool {
        self.index.contains_key(&id)
    }

    /// True if the actor is flagged for removal at end of tick.
    #[must_use]
    pub fn is_pending_delete(&self, id: ActorId) -> bool {
        self.index
            .get(&id)
            .is_some_and(|&i| self.slots[i].pending_delete)
    }

    pub(crate) fn slot_mut(&mut self, id: ActorId) -> Option<&mut ActorSlot> {
        let i = *self.index.get(&id)?;
        Some(&mut self.slots[i])
    }

    /// Mutable access regardless of ownership. Kernel-internal.
    pub(crate) fn get_mut(&mut self, id: ActorId) -> Option<&mut Actor> {
        self.slot_mut(id).map(|slot| &mut slot.actor)
    }

    /// Mutable access for game logic: local actors only.
    ///
    /// # Errors
    ///
    /// `NotFound` on a miss, `RemoteActorMutation` for remote actors.
    pub fn local_mut(&mut self, id: ActorId) -> KernelResult<&mut Actor> {
        let actor = self
            .get_mut(id)
            .ok_or_else(|| KernelError::actor_not_found(id))?;
        if actor.is_remote() {
            return Err(KernelError::RemoteActorMutation(id));
        }
        Ok(actor)
    }

    /// Flags an actor for end-of-tick removal. Returns false if it was
    /// already flagged.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on a miss.
    pub(crate) fn mark_deleted(&mut self, id: ActorId) -> KernelResult<bool> {
        let slot = self
            .slot_mut(id)
            .ok_or_else(|| KernelError::actor_not_found(id))?;
        if slot.pending_delete {
            return Ok(false);
        }
        slot.pending_delete = true;
        self.marked.push(id);
        Ok(true)
    }

    /// Cancels a pending removal. Returns true if one was pending.
    pub(crate) fn unmark_deleted(&mut self, id: ActorId) -> bool {
        let Some(slot) = self.slot_mut(id) else {
            return false;
        };
        if !slot.pending_delete {
            return false;
        }
        slot.pending_delete = false;
        self.marked.retain(|m| *m != id);
        true
    }

    /// Removes every actor flagged so far, in flag order.
    pub(crate) fn remove_marked(&mut self) -> Vec<ActorId> {
        let marked = std::mem::take(&mut self.marked);
        for id in &marked {
            if let Some(i) = self.index.remove(id) {
                self.slots.swap_remove(i);
                if let Some(moved) = self.slots.get(i) {
                    self.index.insert(moved.actor.id(), i);
                }
            }
        }
        marked
    }

    /// Iterates all actors in storage order.
    pub fn iter(&self) -> impl Iterator<Item = &Actor> {
        self.slots.iter().map(|s| &s.actor)
    }

    /// Every actor id in storage order.
    #[must_use]
    pub fn ids(&self) -> Vec<ActorId> {
        self.slots.iter().map(|s| s.actor.id()).collect()
    }

    /// Number of actors (pending deletions included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::{ActorType, Ownership};

    fn local() -> Actor {
        Actor::new(ActorType::new("test", "box"), Ownership::Local)
    }

    #[test]
    fn test_insert_find() {
        let mut registry = ActorRegistry::new();
        let id = registry.insert(local()).unwrap();
        assert!(registry.find(id).is_ok());
        assert!(matches!(
            registry.find(ActorId::generate()),
            Err(KernelError::NotFound { kind: "actor", .. })
        ));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut registry = ActorRegistry::new();
        let actor = local();
        let copy = actor.clone();
        registry.insert(actor).unwrap();
        assert!(matches!(registry.insert(copy), Err(KernelError::DuplicateActor(_))));
    }

    #[test]
    fn test_deferred_removal_keeps_index_dense() {
        let mut registry = ActorRegistry::new();
        let a = registry.insert(local()).unwrap();
        let b = registry.insert(local()).unwrap();
        let c = registry.insert(local()).unwrap();

        assert!(registry.mark_deleted(a).unwrap());
        assert!(!registry.mark_deleted(a).unwrap());
        assert!(registry.find(a).is_ok());
        assert!(registry.is_pending_delete(a));

        assert_eq!(registry.remove_marked(), vec![a]);
        assert!(registry.find(a).is_err());
        assert_eq!(registry.find(b).unwrap().id(), b);
        assert_eq!(registry.find(c).unwrap().id(), c);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_remote_actor_not_mutable_by_logic() {
        let mut registry = ActorRegistry::new();
        let id = registry
            .insert(Actor::new(ActorType::new("test", "box"), Ownership::Remote))
            .unwrap();
        assert!(matches!(
            registry.local_mut(id),
            Err(KernelError::RemoteActorMutation(_))
        ));
        assert!(registry.get_mut(id).is_some());
    }
}
