//! Error types for the kernel.

use chronicle_core::{ActorId, CodecError};
use thiserror::Error;

/// Result type for kernel operations.
pub type KernelResult<T> = Result<T, KernelError>;

/// Kernel-level errors.
#[derive(Debug, Error)]
pub enum KernelError {
    /// Lookup miss for an actor, component or factory entry.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// What was looked up.
        kind: &'static str,
        /// The key that missed.
        key: String,
    },

    /// A component of the same type or name is already in the pipeline.
    #[error("Duplicate component: {0}")]
    DuplicateComponent(String),

    /// A component failed while handling a message. Logged; dispatch went on.
    #[error("Component '{component}' failed on {message_type}: {reason}")]
    ComponentDispatch {
        /// Offending component.
        component: String,
        /// Type of the message being handled.
        message_type: String,
        /// What went wrong.
        reason: String,
    },

    /// Game logic tried to create a remote actor.
    #[error("Remote actors are only created from network updates")]
    RemoteActorCreation,

    /// Game logic tried to mutate or delete a remote actor directly.
    #[error("Actor {0} is remote and only changes through network messages")]
    RemoteActorMutation(ActorId),

    /// An actor with this id already exists.
    #[error("Actor {0} already exists")]
    DuplicateActor(ActorId),

    /// The kernel's inbound queue is gone.
    #[error("Message queue closed")]
    QueueClosed,

    /// Message type registration failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}

impl KernelError {
    /// Shorthand for a missing actor.
    #[must_use]
    pub fn actor_not_found(id: ActorId) -> Self {
        Self::NotFound {
            kind: "actor",
            key: id.to_string(),
        }
    }

    /// Shorthand for a missing component.
    #[must_use]
    pub fn component_not_found(name: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "component",
            key: name.into(),
        }
    }
}

/// Error a component returns from a handler.
#[derive(Debug, Error)]
pub enum ComponentError {
    /// Free-form failure.
    #[error("{0}")]
    Failed(String),

    /// A kernel call made by the component failed.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// Any other error.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl ComponentError {
    /// Wraps any error.
    pub fn other<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(error))
    }
}
