//! # CHRONICLE Kernel
//!
//! The simulation kernel: owns every actor, runs the tick loop, and routes
//! every message through the component pipeline.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              KERNEL                                     │
//! ├─────────────────────────────────────────────────────────────────────────┤
//! │                                                                         │
//! │  MessageSender ──┐    ┌──────────────────────────────────────────────┐  │
//! │  (other threads) │    │ KernelContext                                │  │
//! │                  v    │  • ActorRegistry (dense, deferred delete)    │  │
//! │  send_message ─> queue│  • pending / forward / network queues        │  │
//! │                  │    │  • timers, clock, message factory            │  │
//! │                  │    └──────────────────────────────────────────────┘  │
//! │                  v                                                      │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │ ComponentPipeline (priority, then insertion order)              │    │
//! │  │  DefaultMessageProcessor │ LogController │ NetworkPublishing ... │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │                  │                                                      │
//! │                  v                                                      │
//! │  invokables: global listeners, about actor, destination actor           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `kernel`: tick loop and component management
//! - `context`: the state components may touch
//! - `processor`: applies actor info messages to the registry
//! - `publishing`: mirrors local actor changes to a transport channel
//! - `factory`: components by name

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod component;
pub mod context;
pub mod error;
pub mod factory;
pub mod kernel;
mod listeners;
pub mod params;
mod pipeline;
pub mod processor;
pub mod publishing;
pub mod registry;
pub mod sender;
pub mod stats;

pub use clock::{FiredTimer, SimClock};
pub use component::{AsAny, Component, ComponentPriority};
pub use context::{KernelContext, RestoreReport};
pub use error::{ComponentError, KernelError, KernelResult};
pub use factory::{ComponentConstructor, ComponentFactoryTable};
pub use kernel::{Kernel, KernelConfig};
pub use processor::{DefaultMessageProcessor, ProcessorStats, DEFAULT_MESSAGE_PROCESSOR};
pub use publishing::{NetworkPublishingComponent, NETWORK_PUBLISHER};
pub use registry::ActorRegistry;
pub use sender::MessageSender;
pub use stats::{TickStats, TickStatsAccumulator};
