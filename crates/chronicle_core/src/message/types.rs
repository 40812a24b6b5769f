//! # Message Types
//!
//! Immutable descriptors registered once at startup. Two types are the same
//! type when their ids are equal; the registry guarantees ids and names are
//! unique.
//!
//! Ids below [`USER_DEFINED_START`] are reserved for the built-in types
//! declared here.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{CodecError, CodecResult};

/// First id available to application-defined message types.
pub const USER_DEFINED_START: u16 = 1000;

/// Descriptor of a kind of message.
#[derive(Clone, Copy, Debug)]
pub struct MessageType {
    id: u16,
    name: &'static str,
    category: &'static str,
}

impl MessageType {
    /// Declares a message type. Register it with a [`MessageTypeRegistry`]
    /// before sending or decoding messages of it.
    #[must_use]
    pub const fn new(id: u16, name: &'static str, category: &'static str) -> Self {
        Self { id, name, category }
    }

    /// Numeric id (stable on disk).
    #[inline]
    #[must_use]
    pub const fn id(self) -> u16 {
        self.id
    }

    /// Unique name.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.name
    }

    /// Category, e.g. `"Info"` or `"Logger"`.
    #[inline]
    #[must_use]
    pub const fn category(self) -> &'static str {
        self.category
    }
}

impl PartialEq for MessageType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageType {}

impl Hash for MessageType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

// =============================================================================
// Built-in types
// =============================================================================

/// Category of per-tick heartbeat messages.
pub const CATEGORY_TICK: &str = "Tick";
/// Category of actor lifecycle and timer notifications.
pub const CATEGORY_INFO: &str = "Info";
/// Category of server replies.
pub const CATEGORY_SERVER: &str = "Server";
/// Category of record/playback control and status messages.
pub const CATEGORY_LOGGER: &str = "Logger";

/// Delivered to components at the start of every tick.
pub const TICK_LOCAL: MessageType = MessageType::new(1, "Tick Local", CATEGORY_TICK);

/// An actor was created.
pub const INFO_ACTOR_CREATED: MessageType = MessageType::new(10, "Actor Created", CATEGORY_INFO);
/// An actor's properties changed.
pub const INFO_ACTOR_UPDATED: MessageType = MessageType::new(11, "Actor Updated", CATEGORY_INFO);
/// An actor was deleted.
pub const INFO_ACTOR_DELETED: MessageType = MessageType::new(12, "Actor Deleted", CATEGORY_INFO);
/// An actor was published to the network.
pub const INFO_ACTOR_PUBLISHED: MessageType =
    MessageType::new(13, "Actor Published", CATEGORY_INFO);
/// A named timer fired.
pub const INFO_TIMER_ELAPSED: MessageType = MessageType::new(14, "Timer Elapsed", CATEGORY_INFO);

/// A request was refused.
pub const SERVER_REQUEST_REJECTED: MessageType =
    MessageType::new(20, "Server Request Rejected", CATEGORY_SERVER);

/// Ask the log controller to start recording.
pub const LOG_REQ_CHANGESTATE_RECORD: MessageType =
    MessageType::new(30, "Log Request Record", CATEGORY_LOGGER);
/// Ask the log controller to start playback.
pub const LOG_REQ_CHANGESTATE_PLAYBACK: MessageType =
    MessageType::new(31, "Log Request Playback", CATEGORY_LOGGER);
/// Ask the log controller to stop.
pub const LOG_REQ_CHANGESTATE_IDLE: MessageType =
    MessageType::new(32, "Log Request Idle", CATEGORY_LOGGER);
/// Ask for a keyframe.
pub const LOG_REQ_CAPTURE_KEYFRAME: MessageType =
    MessageType::new(33, "Log Request Capture Keyframe", CATEGORY_LOGGER);
/// Ask for a tag.
pub const LOG_REQ_INSERT_TAG: MessageType =
    MessageType::new(34, "Log Request Insert Tag", CATEGORY_LOGGER);
/// Ask playback to seek to a keyframe.
pub const LOG_REQ_JUMP_TO_KEYFRAME: MessageType =
    MessageType::new(35, "Log Request Jump To Keyframe", CATEGORY_LOGGER);
/// Change the auto keyframe interval.
pub const LOG_REQ_SET_AUTOKEYFRAME_INTERVAL: MessageType =
    MessageType::new(36, "Log Request Set Auto Keyframe Interval", CATEGORY_LOGGER);
/// Ask for a status report.
pub const LOG_REQ_GET_STATUS: MessageType =
    MessageType::new(37, "Log Request Get Status", CATEGORY_LOGGER);
/// Status report.
pub const LOG_INFO_STATUS: MessageType = MessageType::new(38, "Log Info Status", CATEGORY_LOGGER);
/// Playback ran out of entries.
pub const LOG_INFO_PLAYBACK_END_OF_MESSAGES: MessageType =
    MessageType::new(39, "Log Info Playback End Of Messages", CATEGORY_LOGGER);

/// Every built-in type.
pub const BUILTIN: &[MessageType] = &[
    TICK_LOCAL,
    INFO_ACTOR_CREATED,
    INFO_ACTOR_UPDATED,
    INFO_ACTOR_DELETED,
    INFO_ACTOR_PUBLISHED,
    INFO_TIMER_ELAPSED,
    SERVER_REQUEST_REJECTED,
    LOG_REQ_CHANGESTATE_RECORD,
    LOG_REQ_CHANGESTATE_PLAYBACK,
    LOG_REQ_CHANGESTATE_IDLE,
    LOG_REQ_CAPTURE_KEYFRAME,
    LOG_REQ_INSERT_TAG,
    LOG_REQ_JUMP_TO_KEYFRAME,
    LOG_REQ_SET_AUTOKEYFRAME_INTERVAL,
    LOG_REQ_GET_STATUS,
    LOG_INFO_STATUS,
    LOG_INFO_PLAYBACK_END_OF_MESSAGES,
];

// =============================================================================
// Registry
// =============================================================================

/// Lookup table of every message type a kernel understands.
#[derive(Clone, Debug)]
pub struct MessageTypeRegistry {
    by_id: HashMap<u16, MessageType>,
    by_name: HashMap<&'static str, u16>,
}

impl MessageTypeRegistry {
    /// Creates a registry holding only the built-in types.
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self {
            by_id: HashMap::with_capacity(BUILTIN.len()),
            by_name: HashMap::with_capacity(BUILTIN.len()),
        };
        for t in BUILTIN {
            registry.by_id.insert(t.id, *t);
            registry.by_name.insert(t.name, t.id);
        }
        registry
    }

    /// Registers a type.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateMessageType` if the id or name is taken.
    pub fn register(&mut self, message_type: MessageType) -> CodecResult<()> {
        if self.by_id.contains_key(&message_type.id)
            || self.by_name.contains_key(message_type.name)
        {
            return Err(CodecError::DuplicateMessageType {
                id: message_type.id,
                name: message_type.name,
            });
        }
        self.by_id.insert(message_type.id, message_type);
        self.by_name.insert(message_type.name, message_type.id);
        Ok(())
    }

    /// Looks up a type by id.
    #[must_use]
    pub fn by_id(&self, id: u16) -> Option<MessageType> {
        self.by_id.get(&id).copied()
    }

    /// Looks up a type by name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<MessageType> {
        self.by_name.get(name).and_then(|id| self.by_id(*id))
    }

    /// Number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    /// Always false: built-ins are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for MessageTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
