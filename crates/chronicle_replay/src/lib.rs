//! # CHRONICLE Replay
//!
//! After-action review: records kernel message traffic to a log file and
//! plays it back into a kernel later.
//!
//! ## Log Layout
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │ entry │ entry │ entry │ ... │ index │ footer                       │
//! └──────────────────────────────────────────────────────────────────┘
//!   entry  = ts_micros u64 │ len u32 │ encoded message
//!   index  = version │ start/end │ baseline │ keyframes │ tags │ crc32
//!   footer = index offset u64 │ "AARX"
//! ```
//!
//! A log that was never closed has no footer. The reader then scans the
//! entries and stops at the last complete one.
//!
//! ## Modules
//!
//! - `controller`: the record/playback component
//! - `stream`: log writer and reader
//! - `format`: on-disk encoding of entries, keyframes and the index
//! - `catalog`: logs in a directory

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod controller;
pub mod error;
pub mod format;
pub mod index;
pub mod params;
pub mod status;
pub mod stream;

pub use catalog::{available_logs, delete_log, log_path};
pub use controller::{LogController, LogControllerConfig, PlaybackRate, LOG_CONTROLLER};
pub use error::{ReplayError, ReplayResult};
pub use format::{Keyframe, LogEntry, LogIndex, Tag, LOG_EXTENSION};
pub use index::{KeyframeIndex, TagIndex};
pub use status::{LogState, LogStatusInfo, StatusHandle};
pub use stream::{create_log_file, LogSink, LogStreamReader, LogStreamWriter};
