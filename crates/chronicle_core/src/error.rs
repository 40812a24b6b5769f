//! Error types for the core data model.

use thiserror::Error;

/// Result type for payload encoding and decoding.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors raised while decoding a message payload or registering types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Input ended before the structure was complete.
    #[error("Payload truncated: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        /// Offset where the read started.
        offset: usize,
        /// Bytes the read needed.
        needed: usize,
        /// Bytes left in the input.
        available: usize,
    },

    /// The payload names a message type the registry does not know.
    #[error("Unknown message type id: {0}")]
    UnknownMessageType(u16),

    /// A parameter carries a value tag outside the known set.
    #[error("Unknown value tag: {0}")]
    UnknownValueTag(u8),

    /// A string field is not valid UTF-8.
    #[error("Invalid UTF-8 in {field}")]
    InvalidUtf8 {
        /// Which field failed.
        field: &'static str,
    },

    /// A field is too large for its length prefix.
    #[error("{field} too long: {len} bytes")]
    TooLong {
        /// Which field overflowed.
        field: &'static str,
        /// Its length.
        len: usize,
    },

    /// Bytes remain after a complete payload.
    #[error("Trailing bytes after payload: {0}")]
    TrailingBytes(usize),

    /// A message type with the same id or name is already registered.
    #[error("Duplicate message type: id {id} ({name})")]
    DuplicateMessageType {
        /// Conflicting id.
        id: u16,
        /// Conflicting name.
        name: &'static str,
    },
}
