//! Actor registrations for messages beyond their own bindings: every message
//! of a type (global), or every message of a type about another actor.

use std::collections::HashMap;

use chronicle_core::{ActorId, MessageType};

/// A listening actor and the invokable to call on it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Listener {
    pub(crate) actor: ActorId,
    pub(crate) invokable: String,
}

#[derive(Debug, Default)]
pub(crate) struct ListenerRegistry {
    global: HashMap<MessageType, Vec<Listener>>,
    about: HashMap<(MessageType, ActorId), Vec<Listener>>,
}

impl ListenerRegistry {
    pub(crate) fn register_global(&mut self, msg_type: MessageType, listener: Listener) {
        let list = self.global.entry(msg_type).or_default();
        if !list.contains(&listener) {
            list.push(listener);
        }
    }

    pub(crate) fn unregister_global(&mut self, msg_type: MessageType, listener: &Listener) {
        if let Some(list) = self.global.get_mut(&msg_type) {
            list.retain(|l| l != listener);
        }
    }

    pub(crate) fn register_about(&mut self, msg_type: MessageType, about: ActorId, listener: Listener) {
        let list = self.about.entry((msg_type, about)).or_default();
        if !list.contains(&listener) {
            list.push(listener);
        }
    }

    pub(crate) fn unregister_about(&mut self, msg_type: MessageType, about: ActorId, listener: &Listener) {
        if let Some(list) = self.about.get_mut(&(msg_type, about)) {
            list.retain(|l| l != listener);
        }
    }

    /// Listeners for every message of `msg_type`, cloned so the caller may
    /// mutate actors while walking them.
    pub(crate) fn global_for(&self, msg_type: MessageType) -> Vec<Listener> {
        self.global.get(&msg_type).cloned().unwrap_or_default()
    }

    pub(crate) fn about_for(&self, msg_type: MessageType, about: ActorId) -> Vec<Listener> {
        self.about
            .get(&(msg_type, about))
            .cloned()
            .unwrap_or_default()
    }

    /// Drops every registration by or about a removed actor.
    pub(crate) fn purge_actor(&mut self, actor: ActorId) {
        for list in self.global.values_mut() {
            list.retain(|l| l.actor != actor);
        }
        self.about.retain(|(_, about), _| *about != actor);
        for list in self.about.values_mut() {
            list.retain(|l| l.actor != actor);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::types::{INFO_ACTOR_UPDATED, TICK_LOCAL};

    fn listener(actor: ActorId) -> Listener {
        Listener {
            actor,
            invokable: "on_msg".into(),
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let mut reg = ListenerRegistry::default();
        let a = ActorId::generate();
        reg.register_global(TICK_LOCAL, listener(a));
        reg.register_global(TICK_LOCAL, listener(a));
        assert_eq!(reg.global_for(TICK_LOCAL).len(), 1);

        reg.unregister_global(TICK_LOCAL, &listener(a));
        assert!(reg.global_for(TICK_LOCAL).is_empty());
    }

    #[test]
    fn test_purge_removes_both_directions() {
        let mut reg = ListenerRegistry::default();
        let watcher = ActorId::generate();
        let target = ActorId::generate();
        reg.register_about(INFO_ACTOR_UPDATED, target, listener(watcher));
        reg.register_global(TICK_LOCAL, listener(watcher));

        reg.purge_actor(target);
        assert!(reg.about_for(INFO_ACTOR_UPDATED, target).is_empty());
        assert_eq!(reg.global_for(TICK_LOCAL).len(), 1);

        reg.purge_actor(watcher);
        assert!(reg.global_for(TICK_LOCAL).is_empty());
    }
}
