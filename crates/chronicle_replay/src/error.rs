//! Error types for record and playback.

use chronicle_core::CodecError;
use chronicle_kernel::KernelError;
use thiserror::Error;

/// Result type for replay operations.
pub type ReplayResult<T> = Result<T, ReplayError>;

/// Replay errors.
#[derive(Debug, Error)]
pub enum ReplayError {
    /// Appending to the log failed. Recording has stopped.
    #[error("Log write failed for '{log}': {source}")]
    LogWrite {
        /// Log being written.
        log: String,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The log is damaged at `offset`.
    #[error("Log corrupt at offset {offset}: {reason}")]
    LogCorruption {
        /// Byte offset of the damage.
        offset: u64,
        /// What was wrong.
        reason: String,
    },

    /// The request is not valid in the current state.
    #[error("Cannot {request} while {state}")]
    InvalidTransition {
        /// Current controller state.
        state: &'static str,
        /// What was asked.
        request: &'static str,
    },

    /// Unknown log, keyframe or tag.
    #[error("{kind} not found: {key}")]
    NotFound {
        /// What was looked up.
        kind: &'static str,
        /// The key that missed.
        key: String,
    },

    /// A keyframe already exists at this timestamp.
    #[error("Keyframe already exists at {0} us")]
    DuplicateKeyframe(u64),

    /// Log name unusable as a file name.
    #[error("Invalid log name: {0:?}")]
    InvalidLogName(String),

    /// Filesystem failure outside of appending.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Payload or snapshot encoding failed.
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// A kernel call failed.
    #[error("Kernel error: {0}")]
    Kernel(#[from] KernelError),
}

impl ReplayError {
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        Self::LogCorruption {
            offset,
            reason: reason.into(),
        }
    }

    pub(crate) fn not_found(kind: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            key: key.into(),
        }
    }
}
