//! # Session
//!
//! Builds a [`Kernel`] from a [`ChronicleConfig`].
//!
//! ```text
//! ChronicleConfig ──> KernelConfig ──> Kernel
//!        │
//!        └─ [[components]] ──> ComponentFactoryTable::create(name) ──> add_boxed_component
//!                                 • default_message_processor
//!                                 • log_controller      (from [logger])
//!                                 • network_publisher   (outbound channel kept here)
//! ```
//!
//! Hosts may register more constructors on the table before building.

use std::time::Instant;

use chronicle_core::Message;
use chronicle_kernel::{
    Component, ComponentFactoryTable, KernelContext, Kernel, NetworkPublishingComponent, TickStats, NETWORK_PUBLISHER,
};
use chronicle_replay::{LogController, StatusHandle, LOG_CONTROLLER};
use crossbeam_channel::{unbounded, Receiver};

use crate::config::ChronicleConfig;
use crate::error::ChronicleResult;

/// A configured kernel plus the handles a host needs around it.
pub struct Session {
    kernel: Kernel,
    outbound: Receiver<Message>,
    log_status: Option<StatusHandle>,
    last_tick: Option<Instant>,
}

impl Session {
    /// Builds a session with the built-in component constructors.
    ///
    /// # Errors
    ///
    /// Invalid configuration values, unknown component names and duplicate
    /// components.
    pub fn from_config(config: &ChronicleConfig) -> ChronicleResult<Self> {
        Self::with_factories(config, ComponentFactoryTable::new())
    }

    /// Builds a session, resolving component names through `factories`.
    /// The log controller and network publisher are registered on top of
    /// whatever `factories` already holds.
    ///
    /// # Errors
    ///
    /// Same as [`Session::from_config`].
    pub fn with_factories(config: &ChronicleConfig, mut factories: ComponentFactoryTable) -> ChronicleResult<Self> {
        let kernel_config = config.kernel.to_kernel_config()?;
        let controller_config = config.logger.to_controller_config()?;
        let (outbound_tx, outbound) = unbounded();

        factories.register(LOG_CONTROLLER, move || {
            Box::new(LogController::new(controller_config.clone()))
        });
        factories.register(NETWORK_PUBLISHER, move || {
            Box::new(NetworkPublishingComponent::with_sender(outbound_tx.clone()))
        });

        let mut kernel = Kernel::with_config(kernel_config);
        for entry in config.components.iter() {
            let priority = entry.parsed_priority()?;
            let component = factories.create(&entry.name)?;
            kernel.add_boxed_component(component, priority)?;
        }

        let log_status = kernel.component::<LogController>().ok().map(LogController::status_handle);
        tracing::info!(
            components = kernel.components().len(),
            log_controller = log_status.is_some(),
            "Session assembled"
        );
        Ok(Self {
            kernel,
            outbound,
            log_status,
            last_tick: None,
        })
    }

    /// The kernel.
    #[inline]
    #[must_use]
    pub const fn kernel(&self) -> &Kernel {
        &self.kernel
    }

    /// The kernel, mutably.
    #[inline]
    pub fn kernel_mut(&mut self) -> &mut Kernel {
        &mut self.kernel
    }

    /// Messages the network publisher handed to the transport.
    #[must_use]
    pub const fn outbound(&self) -> &Receiver<Message> {
        &self.outbound
    }

    /// Status of the log controller, if one is installed.
    #[must_use]
    pub fn log_status(&self) -> Option<&StatusHandle> {
        self.log_status.as_ref()
    }

    /// Runs `f` on the log controller.
    ///
    /// # Errors
    ///
    /// `Kernel(NotFound)` if no log controller is installed.
    pub fn with_log_controller<R>(
        &mut self,
        f: impl FnOnce(&mut LogController, &mut KernelContext) -> R,
    ) -> ChronicleResult<R> {
        Ok(self.kernel.with_component::<LogController, _, _>(f)?)
    }

    /// Runs `f` on any installed component.
    ///
    /// # Errors
    ///
    /// `Kernel(NotFound)` if no component of type `C` is installed.
    pub fn with_component<C: Component, R>(
        &mut self,
        f: impl FnOnce(&mut C, &mut KernelContext) -> R,
    ) -> ChronicleResult<R> {
        Ok(self.kernel.with_component::<C, _, _>(f)?)
    }

    /// Ticks with `delta_sim` seconds of simulation time; real time is
    /// measured since the previous call.
    pub fn step(&mut self, delta_sim: f64) -> TickStats {
        let now = Instant::now();
        let delta_real = self
            .last_tick
            .map_or(delta_sim, |prev| now.duration_since(prev).as_secs_f64());
        self.last_tick = Some(now);
        self.kernel.tick(delta_sim, delta_real)
    }

    /// Runs `ticks` fixed ticks of `delta` seconds.
    pub fn run_fixed(&mut self, ticks: u32, delta: f64) {
        for _ in 0..ticks {
            self.kernel.tick(delta, delta);
        }
    }

    /// Gives the kernel back.
    #[must_use]
    pub fn into_kernel(self) -> Kernel {
        self.kernel
    }
}
