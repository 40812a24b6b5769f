//! # Simulation Clock and Timers
//!
//! Simulation time advances only at the end of a tick, by the scaled delta.
//! Pausing freezes simulation time; real time keeps counting.

use chronicle_core::ActorId;

/// Kernel time state.
#[derive(Clone, Debug)]
pub struct SimClock {
    sim_time: f64,
    real_time_micros: u64,
    time_scale: f64,
    paused: bool,
    tick_count: u64,
}

impl SimClock {
    /// Creates a clock at time zero.
    #[must_use]
    pub fn new(time_scale: f64, paused: bool) -> Self {
        Self {
            sim_time: 0.0,
            real_time_micros: 0,
            time_scale,
            paused,
            tick_count: 0,
        }
    }

    /// Simulation time in seconds.
    #[inline]
    #[must_use]
    pub const fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Real time in microseconds since start.
    #[inline]
    #[must_use]
    pub const fn real_time_micros(&self) -> u64 {
        self.real_time_micros
    }

    /// Completed ticks.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Multiplier applied to delta simulation time.
    #[inline]
    #[must_use]
    pub const fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// Whether simulation time is frozen.
    #[inline]
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub(crate) fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = scale.max(0.0);
    }

    /// Delta simulation time this tick will apply.
    #[must_use]
    pub fn scaled_delta(&self, delta_sim: f64) -> f64 {
        if self.paused {
            0.0
        } else {
            delta_sim.max(0.0) * self.time_scale
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub(crate) fn advance(&mut self, scaled_delta_sim: f64, delta_real: f64) {
        self.sim_time += scaled_delta_sim;
        self.real_time_micros += (delta_real.max(0.0) * 1_000_000.0).round() as u64;
        self.tick_count += 1;
    }
}

/// A timer that has come due.
#[derive(Clone, Debug, PartialEq)]
pub struct FiredTimer {
    /// Timer name.
    pub name: String,
    /// Actor the timer is about, if any.
    pub about: Option<ActorId>,
    /// Scheduled fire time.
    pub scheduled: f64,
    /// How far past the scheduled time it fired.
    pub late_by: f64,
}

#[derive(Clone, Debug)]
struct Timer {
    name: String,
    about: Option<ActorId>,
    interval: f64,
    repeating: bool,
    fire_at: f64,
}

/// Named timers in simulation time.
#[derive(Clone, Debug, Default)]
pub(crate) struct TimerSchedule {
    timers: Vec<Timer>,
}

impl TimerSchedule {
    /// Sets (or replaces) the timer `name` about `about`.
    pub(crate) fn set(&mut self, name: &str, about: Option<ActorId>, interval: f64, repeating: bool, now: f64) {
        self.clear(name, about);
        self.timers.push(Timer {
            name: name.to_owned(),
            about,
            interval: interval.max(0.0),
            // A zero-interval timer cannot repeat.
            repeating: repeating && interval > 0.0,
            fire_at: now + interval.max(0.0),
        });
    }

    pub(crate) fn clear(&mut self, name: &str, about: Option<ActorId>) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| !(t.name == name && t.about == about));
        before != self.timers.len()
    }

    /// Pops every timer due at or before `until`, in fire-time order.
    /// Repeating timers fire at most once per call and are rescheduled past
    /// `until`.
    pub(crate) fn due(&mut self, until: f64) -> Vec<FiredTimer> {
        let mut fired = Vec::new();
        self.timers.retain_mut(|t| {
            if t.fire_at > until {
                return true;
            }
            fired.push(FiredTimer {
                name: t.name.clone(),
                about: t.about,
                scheduled: t.fire_at,
                late_by: until - t.fire_at,
            });
            if t.repeating {
                while t.fire_at <= until {
                    t.fire_at += t.interval;
                }
                true
            } else {
                false
            }
        });
        fired.sort_by(|a, b| a.scheduled.total_cmp(&b.scheduled));
        fired
    }

    pub(crate) fn len(&self) -> usize {
        self.timers.len()
    }
}
