//! # Kernel Tick Loop
//!
//! ```text
//! Tick N:
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ 1. COLLECT                                                          │
//! │    ├─ Take messages queued before this tick (FIFO)                  │
//! │    ├─ Drain the cross-thread inbound channel                        │
//! │    └─ Append INFO_TIMER_ELAPSED for timers due by the tick's end    │
//! │                                                                     │
//! │ 2. NETWORK                                                          │
//! │    └─ dispatch_network_message on every component                   │
//! │                                                                     │
//! │ 3. DISPATCH                                                         │
//! │    ├─ TICK_LOCAL first, then the collected batch                    │
//! │    ├─ Components by priority, then insertion order                  │
//! │    ├─ Then invokables: listeners, about actor, destination          │
//! │    └─ Forwarded messages right after the message that sent them     │
//! │       (anything sent with send_message waits for tick N+1)          │
//! │                                                                     │
//! │ 4. END OF TICK                                                      │
//! │    ├─ Remove actors flagged for deletion                            │
//! │    ├─ Remove components that asked to leave                         │
//! │    └─ Advance the clock                                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A component that returns an error or panics is logged by name and
//! skipped; the rest of the pipeline still sees the message.

use std::any::{Any, TypeId};
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use chronicle_core::{types, Actor, ActorId, ActorType, Message, MessageType, Ownership};

use crate::clock::SimClock;
use crate::component::{AsAny, Component, ComponentPriority};
use crate::context::KernelContext;
use crate::error::{ComponentError, KernelError, KernelResult};
use crate::params;
use crate::pipeline::ComponentPipeline;
use crate::sender::MessageSender;
use crate::stats::{TickStats, TickStatsAccumulator};

/// Kernel construction settings.
#[derive(Clone, Debug)]
pub struct KernelConfig {
    /// Initial simulation time multiplier.
    pub time_scale: f64,
    /// Start with simulation time frozen.
    pub start_paused: bool,
    /// Spare messages kept by the factory.
    pub message_pool_capacity: usize,
    /// Cross-thread inbound queue bound. 0 means unbounded.
    pub inbound_capacity: usize,
    /// Ticks slower than this are logged. 0 disables.
    pub slow_tick_warning_us: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            start_paused: false,
            message_pool_capacity: 1024,
            inbound_capacity: 0,
            slow_tick_warning_us: 33_000,
        }
    }
}

/// The simulation kernel.
///
/// Owns the actor registry and the component pipeline, runs the tick loop,
/// and routes every message to every component.
pub struct Kernel {
    pipeline: ComponentPipeline,
    ctx: KernelContext,
    config: KernelConfig,
    stats: TickStatsAccumulator,
    faults: Vec<KernelError>,
}

impl Kernel {
    /// Creates a kernel with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(KernelConfig::default())
    }

    /// Creates a kernel.
    #[must_use]
    pub fn with_config(config: KernelConfig) -> Self {
        let clock = SimClock::new(config.time_scale, config.start_paused);
        let ctx = KernelContext::new(config.message_pool_capacity, config.inbound_capacity, clock);
        tracing::info!(machine = %ctx.machine_id(), "Kernel created");
        Self {
            pipeline: ComponentPipeline::default(),
            ctx,
            config,
            stats: TickStatsAccumulator::new(),
            faults: Vec::new(),
        }
    }

    /// Settings in use.
    #[must_use]
    pub const fn config(&self) -> &KernelConfig {
        &self.config
    }

    /// Kernel state, read-only.
    #[inline]
    #[must_use]
    pub const fn context(&self) -> &KernelContext {
        &self.ctx
    }

    /// Kernel state, for host-side setup between ticks.
    #[inline]
    pub fn context_mut(&mut self) -> &mut KernelContext {
        &mut self.ctx
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Adds a component.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateComponent` if a component of the same type or name
    /// is present.
    pub fn add_component<C: Component>(&mut self, component: C, priority: ComponentPriority) -> KernelResult<()> {
        self.add_boxed_component(Box::new(component), priority)
    }

    /// Adds an already boxed component (as produced by a factory table).
    ///
    /// # Errors
    ///
    /// Returns `DuplicateComponent` if a component of the same type or name
    /// is present.
    pub fn add_boxed_component(&mut self, component: Box<dyn Component>, priority: ComponentPriority) -> KernelResult<()> {
        let type_id = ComponentPipeline::type_of(component.as_ref());
        let name = component.name().to_owned();
        if self.pipeline.contains(type_id, &name) {
            return Err(KernelError::DuplicateComponent(name));
        }

        self.pipeline.insert(component, priority);
        if let Some(entry) = self.pipeline.find_mut(type_id) {
            entry.component.on_added_to_kernel(&mut self.ctx);
        }
        tracing::info!(component = %name, %priority, total = self.pipeline.len(), "Component added");
        self.flush_forward();
        Ok(())
    }

    /// Removes a component by name. Absence is logged, not an error.
    pub fn remove_component(&mut self, name: &str) -> bool {
        match self.pipeline.remove_by_name(name) {
            Some(mut entry) => {
                entry.component.on_removed_from_kernel(&mut self.ctx);
                tracing::info!(component = %name, "Component removed");
                true
            }
            None => {
                tracing::warn!(component = %name, "Remove requested for absent component");
                false
            }
        }
    }

    /// Removes the component of type `C`, if present.
    pub fn remove_component_of<C: Component>(&mut self) -> bool {
        match self.pipeline.remove_by_type(TypeId::of::<C>()) {
            Some(mut entry) => {
                entry.component.on_removed_from_kernel(&mut self.ctx);
                tracing::info!(component = %entry.name, "Component removed");
                true
            }
            None => {
                tracing::warn!(
                    component = std::any::type_name::<C>(),
                    "Remove requested for absent component"
                );
                false
            }
        }
    }

    /// Borrows the component of type `C`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent.
    pub fn component<C: Component>(&self) -> KernelResult<&C> {
        self.pipeline
            .find(TypeId::of::<C>())
            .and_then(|e| AsAny::as_any(e.component.as_ref()).downcast_ref::<C>())
            .ok_or_else(|| KernelError::component_not_found(std::any::type_name::<C>()))
    }

    /// Mutably borrows the component of type `C`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent.
    pub fn component_mut<C: Component>(&mut self) -> KernelResult<&mut C> {
        self.pipeline
            .find_mut(TypeId::of::<C>())
            .and_then(|e| AsAny::as_any_mut(e.component.as_mut()).downcast_mut::<C>())
            .ok_or_else(|| KernelError::component_not_found(std::any::type_name::<C>()))
    }

    /// Lends the component of type `C` together with the kernel context.
    /// Messages forwarded inside `f` are dispatched before this returns.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if absent.
    pub fn with_component<C, R, F>(&mut self, f: F) -> KernelResult<R>
    where
        C: Component,
        F: FnOnce(&mut C, &mut KernelContext) -> R,
    {
        let entry = self
            .pipeline
            .find_mut(TypeId::of::<C>())
            .ok_or_else(|| KernelError::component_not_found(std::any::type_name::<C>()))?;
        let component = AsAny::as_any_mut(entry.component.as_mut())
            .downcast_mut::<C>()
            .ok_or_else(|| KernelError::component_not_found(std::any::type_name::<C>()))?;
        let result = f(component, &mut self.ctx);
        self.flush_forward();
        Ok(result)
    }

    /// True if a component with this name is present.
    #[must_use]
    pub fn has_component(&self, name: &str) -> bool {
        self.pipeline.describe().iter().any(|(n, _)| n == name)
    }

    /// Component names and priorities in dispatch order.
    #[must_use]
    pub fn components(&self) -> Vec<(String, ComponentPriority)> {
        self.pipeline.describe()
    }

    // =========================================================================
    // Messages and actors (host-side shorthands)
    // =========================================================================

    /// Registers an application message type.
    ///
    /// # Errors
    ///
    /// Fails if the id or name is taken.
    pub fn register_message_type(&mut self, message_type: MessageType) -> KernelResult<()> {
        self.ctx.register_message_type(message_type)
    }

    /// Creates a pooled, stamped message.
    pub fn create_message(&mut self, message_type: MessageType) -> Message {
        self.ctx.create_message(message_type)
    }

    /// Queues a message for the next tick.
    pub fn send_message(&mut self, message: Message) {
        self.ctx.send_message(message);
    }

    /// Dispatches a message now, ahead of everything queued.
    pub fn send_message_forward(&mut self, message: Message) {
        self.ctx.send_message_forward(message);
        self.flush_forward();
    }

    /// Queues a message for `dispatch_network_message` on the next tick.
    pub fn send_network_message(&mut self, message: Message) {
        self.ctx.send_network_message(message);
    }

    /// Thread-safe handle for queueing messages from other threads.
    #[must_use]
    pub fn sender(&self) -> MessageSender {
        self.ctx.sender()
    }

    /// Creates a local actor.
    ///
    /// # Errors
    ///
    /// Returns `RemoteActorCreation` for remote ownership.
    pub fn create_actor(&mut self, actor_type: ActorType, ownership: Ownership) -> KernelResult<ActorId> {
        self.ctx.create_actor(actor_type, ownership)
    }

    /// Deletes a local actor at end of tick.
    ///
    /// # Errors
    ///
    /// `NotFound` or `RemoteActorMutation`.
    pub fn delete_actor(&mut self, id: ActorId) -> KernelResult<()> {
        self.ctx.delete_actor(id)
    }

    /// Looks up an actor.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` on a miss.
    pub fn find_actor(&self, id: ActorId) -> KernelResult<&Actor> {
        self.ctx.find_actor(id)
    }

    /// Mutable access to a local actor.
    ///
    /// # Errors
    ///
    /// `NotFound` or `RemoteActorMutation`.
    pub fn actor_mut(&mut self, id: ActorId) -> KernelResult<&mut Actor> {
        self.ctx.actor_mut(id)
    }

    /// Publishes a local actor to the network.
    ///
    /// # Errors
    ///
    /// `NotFound` or `RemoteActorMutation`.
    pub fn publish_actor(&mut self, id: ActorId) -> KernelResult<()> {
        self.ctx.publish_actor(id)
    }

    /// Freezes or resumes simulation time.
    pub fn set_paused(&mut self, paused: bool) {
        self.ctx.set_paused(paused);
    }

    /// Sets the simulation time multiplier.
    pub fn set_time_scale(&mut self, scale: f64) {
        self.ctx.set_time_scale(scale);
    }

    /// Current simulation time in seconds.
    #[must_use]
    pub const fn sim_time(&self) -> f64 {
        self.ctx.sim_time()
    }

    /// Completed ticks.
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.ctx.clock().tick_count()
    }

    /// Accumulated tick statistics.
    #[must_use]
    pub const fn stats(&self) -> &TickStatsAccumulator {
        &self.stats
    }

    /// Component failures from the last tick (and from forwarded dispatch
    /// since).
    #[must_use]
    pub fn last_faults(&self) -> &[KernelError] {
        &self.faults
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Runs one tick. `delta_sim` is scaled by the time scale (and zeroed
    /// while paused); `delta_real` is wall time in seconds.
    pub fn tick(&mut self, delta_sim: f64, delta_real: f64) -> TickStats {
        let started = Instant::now();
        let mut stats = TickStats {
            tick: self.ctx.clock.tick_count(),
            ..TickStats::default()
        };
        self.faults.clear();
        self.ctx.in_tick = true;

        // 1. Collect
        let mut batch = std::mem::take(&mut self.ctx.pending);
        self.ctx.inbound.drain_into(&mut batch);

        let scaled = self.ctx.clock.scaled_delta(delta_sim);
        let target = self.ctx.clock.sim_time() + scaled;
        for fired in self.ctx.timers.due(target) {
            let mut msg = self
                .ctx
                .factory
                .create(types::INFO_TIMER_ELAPSED)
                .with(params::TIMER_NAME, fired.name)
                .with(params::LATE_BY, fired.late_by);
            msg.about_actor = fired.about;
            batch.push_back(msg);
            stats.timers_fired += 1;
        }

        // 2. Network
        let network = std::mem::take(&mut self.ctx.network);
        for msg in network {
            self.dispatch_network(&msg, &mut stats);
            self.ctx.factory.recycle(msg);
        }

        // 3. Dispatch
        let tick_msg = self
            .ctx
            .factory
            .create(types::TICK_LOCAL)
            .with(params::DELTA_SIM, scaled)
            .with(params::DELTA_REAL, delta_real)
            .with(params::SIMULATION_TIME, target);
        self.deliver(tick_msg, &mut stats);
        for msg in batch {
            self.deliver(msg, &mut stats);
        }

        // 4. End of tick
        let removed = self.ctx.registry.remove_marked();
        for id in &removed {
            self.ctx.listeners.purge_actor(*id);
        }
        stats.actors_removed = u32::try_from(removed.len()).unwrap_or(u32::MAX);

        for name in std::mem::take(&mut self.ctx.removal_requests) {
            self.remove_component(&name);
        }

        self.ctx.clock.advance(scaled, delta_real);
        let (sim, real) = (self.ctx.clock.sim_time(), self.ctx.clock.real_time_micros());
        self.ctx.factory.set_time(sim, real);
        self.ctx.in_tick = false;

        stats.sim_time = sim;
        stats.dispatch_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.stats.record(&stats);

        if self.config.slow_tick_warning_us > 0 && stats.dispatch_us > self.config.slow_tick_warning_us {
            tracing::warn!(
                tick = stats.tick,
                dispatch_us = stats.dispatch_us,
                messages = stats.messages_dispatched,
                "Tick exceeded budget"
            );
        }
        stats
    }

    /// Dispatches one message, then everything it forwarded, recycling each.
    fn deliver(&mut self, message: Message, stats: &mut TickStats) {
        self.dispatch(&message, stats);
        self.ctx.factory.recycle(message);
        while let Some(forwarded) = self.ctx.forward.pop_front() {
            self.dispatch(&forwarded, stats);
            self.ctx.factory.recycle(forwarded);
        }
    }

    /// Dispatches forwarded messages sent outside a tick.
    fn flush_forward(&mut self) {
        if self.ctx.in_tick {
            return;
        }
        let mut stats = TickStats::default();
        while let Some(forwarded) = self.ctx.forward.pop_front() {
            self.dispatch(&forwarded, &mut stats);
            self.ctx.factory.recycle(forwarded);
        }
    }

    fn dispatch(&mut self, message: &Message, stats: &mut TickStats) {
        let ctx = &mut self.ctx;
        for entry in self.pipeline.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                entry.component.process_message(ctx, message)
            }));
            if let Some(reason) = failure_reason(outcome) {
                stats.component_faults += 1;
                self.faults
                    .push(report_fault(&entry.name, message.message_type(), reason));
            }
        }

        match panic::catch_unwind(AssertUnwindSafe(|| ctx.invoke_actor_handlers(message))) {
            Ok(ran) => stats.invokables_run += u32::try_from(ran).unwrap_or(u32::MAX),
            Err(payload) => {
                stats.component_faults += 1;
                self.faults.push(report_fault(
                    "invokable",
                    message.message_type(),
                    panic_message(payload.as_ref()),
                ));
            }
        }
        stats.messages_dispatched += 1;
    }

    fn dispatch_network(&mut self, message: &Message, stats: &mut TickStats) {
        let ctx = &mut self.ctx;
        for entry in self.pipeline.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                entry.component.dispatch_network_message(ctx, message)
            }));
            if let Some(reason) = failure_reason(outcome) {
                stats.component_faults += 1;
                self.faults
                    .push(report_fault(&entry.name, message.message_type(), reason));
            }
        }
        stats.network_messages += 1;
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

fn failure_reason(outcome: std::thread::Result<Result<(), ComponentError>>) -> Option<String> {
    match outcome {
        Ok(Ok(())) => None,
        Ok(Err(error)) => Some(error.to_string()),
        Err(payload) => Some(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_owned()
    }
}

fn report_fault(component: &str, message_type: MessageType, reason: String) -> KernelError {
    tracing::error!(
        component,
        message_type = message_type.name(),
        %reason,
        "Component failed during dispatch"
    );
    KernelError::ComponentDispatch {
        component: component.to_owned(),
        message_type: message_type.name().to_owned(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    const PING: MessageType = MessageType::new(types::USER_DEFINED_START, "Ping", "Test");
    const PONG: MessageType = MessageType::new(types::USER_DEFINED_START + 1, "Pong", "Test");
    const ECHO: MessageType = MessageType::new(types::USER_DEFINED_START + 2, "Echo", "Test");

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(MessageType, i64)>,
    }

    impl Component for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn process_message(&mut self, _ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
            if !message.is(types::TICK_LOCAL) {
                let n = message.param("n").and_then(chronicle_core::ParamValue::as_i64).unwrap_or(-1);
                self.seen.push((message.message_type(), n));
            }
            Ok(())
        }
    }

    /// Distinct concrete type per `N`, so several can share one kernel.
    struct Tagger<const N: usize> {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl<const N: usize> Tagger<N> {
        fn boxed(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> Box<dyn Component> {
            Box::new(Self {
                name,
                log: Arc::clone(log),
            })
        }
    }

    impl<const N: usize> Component for Tagger<N> {
        fn name(&self) -> &str {
            self.name
        }

        fn process_message(&mut self, _ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
            if message.is(PING) {
                self.log.lock().unwrap().push(self.name);
            }
            Ok(())
        }
    }

    struct Panicker;

    impl Component for Panicker {
        fn name(&self) -> &str {
            "panicker"
        }

        fn process_message(&mut self, _ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
            if message.is(PING) {
                panic!("boom");
            }
            Ok(())
        }
    }

    struct Failing;

    impl Component for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn process_message(&mut self, _ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
            if message.is(PING) {
                return Err(ComponentError::Failed("refused".into()));
            }
            Ok(())
        }
    }

    /// On PING: queue PONG normally and ECHO forward.
    struct Responder;

    impl Component for Responder {
        fn name(&self) -> &str {
            "responder"
        }

        fn process_message(&mut self, ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
            if message.is(PING) {
                let pong = ctx.create_message(PONG);
                ctx.send_message(pong);
                let echo = ctx.create_message(ECHO);
                ctx.send_message_forward(echo);
            }
            Ok(())
        }
    }

    /// Deletes `target` on the first tick and records whether it was still
    /// findable afterwards.
    struct Deleter {
        target: ActorId,
        found_after_delete: Option<bool>,
    }

    impl Component for Deleter {
        fn name(&self) -> &str {
            "deleter"
        }

        fn process_message(&mut self, ctx: &mut KernelContext, message: &Message) -> Result<(), ComponentError> {
            if message.is(types::TICK_LOCAL) && self.found_after_delete.is_none() {
                ctx.delete_actor(self.target)?;
                self.found_after_delete = Some(ctx.find_actor(self.target).is_ok());
            }
            Ok(())
        }
    }

    struct Leaver;

    impl Component for Leaver {
        fn name(&self) -> &str {
            "leaver"
        }

        fn process_message(&mut self, ctx: &mut KernelContext, _message: &Message) -> Result<(), ComponentError> {
            ctx.request_component_removal("leaver");
            Ok(())
        }
    }

    fn ping(kernel: &mut Kernel, n: i64) {
        let msg = kernel.create_message(PING).with("n", n);
        kernel.send_message(msg);
    }

    fn seen(kernel: &Kernel) -> Vec<(MessageType, i64)> {
        kernel.component::<Recorder>().unwrap().seen.clone()
    }

    #[test]
    fn test_messages_delivered_next_tick_in_fifo_order() {
        let mut kernel = Kernel::new();
        kernel.add_component(Recorder::default(), ComponentPriority::Normal).unwrap();

        for n in 0..5 {
            ping(&mut kernel, n);
        }
        assert!(seen(&kernel).is_empty());

        let stats = kernel.tick(0.1, 0.1);
        let order: Vec<i64> = seen(&kernel).iter().map(|(_, n)| *n).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
        // Tick message plus five pings.
        assert_eq!(stats.messages_dispatched, 6);
    }

    #[test]
    fn test_priority_then_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut kernel = Kernel::new();
        for (component, priority) in [
            (Tagger::<0>::boxed("low", &log), ComponentPriority::Lowest),
            (Tagger::<1>::boxed("normal_a", &log), ComponentPriority::Normal),
            (Tagger::<2>::boxed("high", &log), ComponentPriority::Highest),
            (Tagger::<3>::boxed("normal_b", &log), ComponentPriority::Normal),
        ] {
            kernel.add_boxed_component(component, priority).unwrap();
        }

        ping(&mut kernel, 0);
        kernel.tick(0.1, 0.1);
        assert_eq!(*log.lock().unwrap(), vec!["high", "normal_a", "normal_b", "low"]);
    }

    #[test]
    fn test_duplicate_component_rejected() {
        let mut kernel = Kernel::new();
        kernel.add_component(Recorder::default(), ComponentPriority::Normal).unwrap();
        assert!(matches!(
            kernel.add_component(Recorder::default(), ComponentPriority::Lowest),
            Err(KernelError::DuplicateComponent(_))
        ));
        assert_eq!(kernel.components().len(), 1);
    }

    #[test]
    fn test_panicking_component_is_isolated() {
        let mut kernel = Kernel::new();
        kernel.add_component(Panicker, ComponentPriority::Highest).unwrap();
        kernel.add_component(Failing, ComponentPriority::Higher).unwrap();
        kernel.add_component(Recorder::default(), ComponentPriority::Normal).unwrap();

        ping(&mut kernel, 7);
        let stats = kernel.tick(0.1, 0.1);

        assert_eq!(seen(&kernel), vec![(PING, 7)]);
        assert_eq!(stats.component_faults, 2);
        assert_eq!(kernel.last_faults().len(), 2);
        assert!(matches!(
            &kernel.last_faults()[0],
            KernelError::ComponentDispatch { component, .. } if component == "panicker"
        ));

        // The kernel keeps running.
        kernel.tick(0.1, 0.1);
        assert!(kernel.last_faults().is_empty());
    }

    #[test]
    fn test_forward_overtakes_queued_messages() {
        let mut kernel = Kernel::new();
        kernel.add_component(Responder, ComponentPriority::Highest).unwrap();
        kernel.add_component(Recorder::default(), ComponentPriority::Normal).unwrap();

        ping(&mut kernel, 1);
        ping(&mut kernel, 2);
        kernel.tick(0.1, 0.1);
        let types_seen: Vec<&str> = seen(&kernel).iter().map(|(t, _)| t.name()).collect();
        assert_eq!(types_seen, vec!["Ping", "Echo", "Ping", "Echo"]);

        kernel.tick(0.1, 0.1);
        let types_seen: Vec<&str> = seen(&kernel).iter().skip(4).map(|(t, _)| t.name()).collect();
        assert_eq!(types_seen, vec!["Pong", "Pong"]);
    }

    #[test]
    fn test_forward_outside_tick_dispatches_immediately() {
        let mut kernel = Kernel::new();
        kernel.add_component(Recorder::default(), ComponentPriority::Normal).unwrap();
        let msg = kernel.create_message(PING).with("n", 3_i64);
        kernel.send_message_forward(msg);
        assert_eq!(seen(&kernel), vec![(PING, 3)]);
    }

    #[test]
    fn test_deleted_actor_findable_until_end_of_tick() {
        let mut kernel = Kernel::new();
        let id = kernel
            .create_actor(ActorType::new("test", "box"), Ownership::Local)
            .unwrap();
        kernel
            .add_component(
                Deleter {
                    target: id,
                    found_after_delete: None,
                },
                ComponentPriority::Normal,
            )
            .unwrap();

        let stats = kernel.tick(0.1, 0.1);
        assert_eq!(kernel.component::<Deleter>().unwrap().found_after_delete, Some(true));
        assert_eq!(stats.actors_removed, 1);
        assert!(kernel.find_actor(id).is_err());
    }

    #[test]
    fn test_actor_lifecycle_messages() {
        let mut kernel = Kernel::new();
        kernel.add_component(Recorder::default(), ComponentPriority::Normal).unwrap();
        let id = kernel
            .create_actor(ActorType::new("test", "box"), Ownership::Local)
            .unwrap();
        assert!(kernel.find_actor(id).is_ok());

        kernel.tick(0.1, 0.1);
        assert_eq!(seen(&kernel)[0].0, types::INFO_ACTOR_CREATED);

        kernel.delete_actor(id).unwrap();
        kernel.tick(0.1, 0.1);
        assert_eq!(seen(&kernel)[1].0, types::INFO_ACTOR_DELETED);
        assert!(kernel.find_actor(id).is_err());
    }

    #[test]
    fn test_remote_actor_creation_rejected() {
        let mut kernel = Kernel::new();
        assert!(matches!(
            kernel.create_actor(ActorType::new("test", "box"), Ownership::Remote),
            Err(KernelError::RemoteActorCreation)
        ));
        assert!(kernel.context().actors().is_empty());
    }

    #[test]
    fn test_timer_fires_once_due() {
        let mut kernel = Kernel::new();
        kernel.add_component(Recorder::default(), ComponentPriority::Normal).unwrap();
        kernel.context_mut().set_timer("alarm", None, 1.0, false);

        assert_eq!(kernel.tick(0.5, 0.5).timers_fired, 0);
        assert_eq!(kernel.tick(0.6, 0.6).timers_fired, 1);
        assert_eq!(seen(&kernel)[0].0, types::INFO_TIMER_ELAPSED);
        assert_eq!(kernel.tick(1.0, 1.0).timers_fired, 0);
    }

    #[test]
    fn test_pause_and_time_scale() {
        let mut kernel = Kernel::new();
        kernel.set_time_scale(2.0);
        kernel.tick(0.5, 0.5);
        assert!((kernel.sim_time() - 1.0).abs() < 1e-9);

        kernel.set_paused(true);
        kernel.tick(0.5, 0.5);
        assert!((kernel.sim_time() - 1.0).abs() < 1e-9);
        assert_eq!(kernel.tick_count(), 2);
        assert_eq!(kernel.context().real_time_micros(), 1_000_000);
    }

    #[test]
    fn test_cross_thread_sender() {
        let mut kernel = Kernel::new();
        kernel.add_component(Recorder::default(), ComponentPriority::Normal).unwrap();
        let sender = kernel.sender();

        std::thread::spawn(move || {
            sender.send(Message::new(PING).with("n", 9_i64)).unwrap();
        })
        .join()
        .unwrap();

        kernel.tick(0.1, 0.1);
        assert_eq!(seen(&kernel), vec![(PING, 9)]);
    }

    #[test]
    fn test_component_removal_request() {
        let mut kernel = Kernel::new();
        kernel.add_component(Leaver, ComponentPriority::Normal).unwrap();
        assert!(kernel.has_component("leaver"));
        kernel.tick(0.1, 0.1);
        assert!(!kernel.has_component("leaver"));
        assert!(!kernel.remove_component("leaver"));
    }

    #[test]
    fn test_with_component_lends_context() {
        let mut kernel = Kernel::new();
        kernel.add_component(Recorder::default(), ComponentPriority::Normal).unwrap();
        let count = kernel
            .with_component::<Recorder, _, _>(|recorder, ctx| {
                let msg = ctx.create_message(PING);
                ctx.send_message(msg);
                recorder.seen.len()
            })
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(kernel.context().pending_count(), 1);
        assert!(kernel.with_component::<Deleter, _, _>(|_, _| ()).is_err());
    }
}
