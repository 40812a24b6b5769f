//! # CHRONICLE
//!
//! Simulation kernel with after-action review.
//!
//! ```text
//! ┌──────────────┐   ┌────────────────┐   ┌──────────────────┐
//! │ chronicle_   │──>│ chronicle_     │──>│ chronicle_       │
//! │ core         │   │ kernel         │   │ replay           │
//! │ actors,      │   │ tick loop,     │   │ log controller,  │
//! │ messages,    │   │ components,    │   │ log files,       │
//! │ codec        │   │ registry       │   │ keyframes, tags  │
//! └──────────────┘   └────────────────┘   └──────────────────┘
//!                             ^                     ^
//!                             └──── chronicle ──────┘
//!                               config, session, aar_inspect
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use chronicle::{ChronicleConfig, Session};
//!
//! let mut session = Session::from_config(&ChronicleConfig::load("chronicle.toml")?)?;
//! session.with_log_controller(|log, ctx| log.start_record(ctx, "sortie_1"))??;
//! loop {
//!     session.step(1.0 / 60.0);
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod session;

pub use config::{ChronicleConfig, ComponentEntry, ComponentList, KernelSection, LoggerSection};
pub use error::{ChronicleError, ChronicleResult};
pub use session::Session;

pub use chronicle_core as model;
pub use chronicle_kernel as kernel;
pub use chronicle_replay as replay;

pub use chronicle_core::{Actor, ActorId, ActorType, Message, MessageType, Ownership, ParamValue};
pub use chronicle_kernel::{Component, ComponentError, ComponentPriority, Kernel, KernelContext};
pub use chronicle_replay::{LogController, LogState, LogStatusInfo};
