//! # CHRONICLE Core
//!
//! The value types every other CHRONICLE crate speaks:
//!
//! ```text
//! ┌──────────────┐   about / destination   ┌──────────────┐
//! │   Message    │ ──────────────────────> │    Actor     │
//! │ type + params│                         │ id + props   │
//! └──────┬───────┘                         └──────┬───────┘
//!        │ encode / decode                        │ invokables
//!        v                                        v
//! ┌──────────────┐                         ┌──────────────┐
//! │ payload bytes│                         │ InvokableTable│
//! └──────────────┘                         └──────────────┘
//! ```
//!
//! Nothing in here owns a tick loop. The kernel crate owns actors and
//! routes messages; the replay crate persists payloads.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod actor;
pub mod error;
pub mod invokable;
pub mod message;
pub mod value;

pub use actor::{Actor, ActorId, ActorSnapshot, ActorType, Ownership};
pub use error::{CodecError, CodecResult};
pub use invokable::{Invokable, InvokableTable, Outbox};
pub use message::codec::{decode_message, encode_message};
pub use message::factory::{MessageFactory, PoolStats};
pub use message::types::{self as types, MessageType, MessageTypeRegistry};
pub use message::Message;
pub use value::{ParamValue, PropertySet, ValueTag};
