//! # Components
//!
//! Pluggable units that see every dispatched message. Renderers, network
//! transports, protocol translators and the log controller all plug in
//! through this one trait.

use std::any::Any;
use std::fmt;
use std::str::FromStr;

use chronicle_core::Message;

use crate::context::KernelContext;
use crate::error::ComponentError;

/// Dispatch order of a component. Lower order values run first; equal
/// priorities run in insertion order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentPriority {
    /// Runs before everything else.
    Highest = 1,
    /// Runs early.
    Higher = 2,
    /// Default.
    #[default]
    Normal = 3,
    /// Runs late.
    Lower = 4,
    /// Runs after everything else.
    Lowest = 5,
}

impl ComponentPriority {
    /// Sort key.
    #[inline]
    #[must_use]
    pub const fn order(self) -> u8 {
        self as u8
    }

    /// Lowercase name, as used in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Highest => "highest",
            Self::Higher => "higher",
            Self::Normal => "normal",
            Self::Lower => "lower",
            Self::Lowest => "lowest",
        }
    }
}

impl fmt::Display for ComponentPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "highest" => Ok(Self::Highest),
            "higher" => Ok(Self::Higher),
            "normal" => Ok(Self::Normal),
            "lower" => Ok(Self::Lower),
            "lowest" => Ok(Self::Lowest),
            other => Err(format!("unknown component priority '{other}'")),
        }
    }
}

/// Downcasting support for boxed components.
pub trait AsAny {
    /// Borrows as `Any`.
    fn as_any(&self) -> &dyn Any;
    /// Mutably borrows as `Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A unit plugged into the kernel.
///
/// Components are singletons per concrete type: the kernel refuses a second
/// instance of the same type.
pub trait Component: AsAny + Send + 'static {
    /// Identity used in logs and for removal.
    fn name(&self) -> &str;

    /// Handles one dispatched message.
    ///
    /// # Errors
    ///
    /// An error is logged with this component's name; the kernel keeps
    /// dispatching to the remaining components.
    fn process_message(
        &mut self,
        ctx: &mut KernelContext,
        message: &Message,
    ) -> Result<(), ComponentError>;

    /// Handles a message bound for the network. Most components ignore it.
    ///
    /// # Errors
    ///
    /// Same policy as [`Component::process_message`].
    fn dispatch_network_message(
        &mut self,
        _ctx: &mut KernelContext,
        _message: &Message,
    ) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Called once after insertion into the pipeline.
    fn on_added_to_kernel(&mut self, _ctx: &mut KernelContext) {}

    /// Called once after removal from the pipeline.
    fn on_removed_from_kernel(&mut self, _ctx: &mut KernelContext) {}
}
