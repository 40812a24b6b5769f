//! Tick statistics.

/// What one tick did.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TickStats {
    /// Tick number (0-based).
    pub tick: u64,
    /// Simulation time after the tick.
    pub sim_time: f64,
    /// Messages dispatched to components (tick message included).
    pub messages_dispatched: u32,
    /// Messages handed to `dispatch_network_message`.
    pub network_messages: u32,
    /// Invokables run.
    pub invokables_run: u32,
    /// Timers that fired.
    pub timers_fired: u32,
    /// Component handler failures (errors and panics).
    pub component_faults: u32,
    /// Actors removed at end of tick.
    pub actors_removed: u32,
    /// Wall time spent inside `tick`, in microseconds.
    pub dispatch_us: u64,
}

/// Running totals over many ticks.
#[derive(Clone, Debug)]
pub struct TickStatsAccumulator {
    /// Ticks recorded.
    pub ticks_recorded: u64,
    /// Sum of dispatched messages.
    pub messages_sum: u64,
    /// Sum of component faults.
    pub faults_sum: u64,
    /// Sum of tick wall times.
    pub dispatch_us_sum: u64,
    /// Fastest tick.
    pub min_dispatch_us: u64,
    /// Slowest tick.
    pub max_dispatch_us: u64,
}

impl TickStatsAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ticks_recorded: 0,
            messages_sum: 0,
            faults_sum: 0,
            dispatch_us_sum: 0,
            min_dispatch_us: u64::MAX,
            max_dispatch_us: 0,
        }
    }

    /// Records one tick.
    pub fn record(&mut self, stats: &TickStats) {
        self.ticks_recorded += 1;
        self.messages_sum += u64::from(stats.messages_dispatched);
        self.faults_sum += u64::from(stats.component_faults);
        self.dispatch_us_sum += stats.dispatch_us;
        self.min_dispatch_us = self.min_dispatch_us.min(stats.dispatch_us);
        self.max_dispatch_us = self.max_dispatch_us.max(stats.dispatch_us);
    }

    /// Average tick wall time in milliseconds.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn avg_tick_ms(&self) -> f64 {
        if self.ticks_recorded == 0 {
            return 0.0;
        }
        (self.dispatch_us_sum as f64 / self.ticks_recorded as f64) / 1000.0
    }

    /// Average messages per tick.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn avg_messages_per_tick(&self) -> f64 {
        if self.ticks_recorded == 0 {
            return 0.0;
        }
        self.messages_sum as f64 / self.ticks_recorded as f64
    }
}

impl Default for TickStatsAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator() {
        let mut acc = TickStatsAccumulator::new();
        assert!(acc.avg_tick_ms().abs() < f64::EPSILON);

        acc.record(&TickStats {
            messages_dispatched: 4,
            dispatch_us: 1000,
            ..Default::default()
        });
        acc.record(&TickStats {
            messages_dispatched: 2,
            component_faults: 1,
            dispatch_us: 3000,
            ..Default::default()
        });

        assert_eq!(acc.ticks_recorded, 2);
        assert!((acc.avg_tick_ms() - 2.0).abs() < 1e-9);
        assert!((acc.avg_messages_per_tick() - 3.0).abs() < 1e-9);
        assert_eq!(acc.min_dispatch_us, 1000);
        assert_eq!(acc.max_dispatch_us, 3000);
        assert_eq!(acc.faults_sum, 1);
    }
}
