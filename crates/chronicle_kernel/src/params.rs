//! Names of the parameters the kernel reads and writes on built-in messages.

/// Actor type category on actor info messages.
pub const ACTOR_CATEGORY: &str = "actor_category";
/// Actor type name on actor info messages.
pub const ACTOR_TYPE: &str = "actor_type";
/// Actor display name on actor info messages.
pub const ACTOR_NAME: &str = "actor_name";

/// Scaled simulation delta on `TICK_LOCAL`.
pub const DELTA_SIM: &str = "delta_sim";
/// Real delta on `TICK_LOCAL`.
pub const DELTA_REAL: &str = "delta_real";
/// Simulation time the tick advances to, on `TICK_LOCAL`.
pub const SIMULATION_TIME: &str = "simulation_time";

/// Timer name on `INFO_TIMER_ELAPSED`.
pub const TIMER_NAME: &str = "timer_name";
/// Lateness in seconds on `INFO_TIMER_ELAPSED`.
pub const LATE_BY: &str = "late_by";

/// Name of the refused request type on `SERVER_REQUEST_REJECTED`.
pub const REJECTED_TYPE: &str = "rejected_type";
/// Human readable cause on `SERVER_REQUEST_REJECTED`.
pub const REASON: &str = "reason";

/// True for parameters that describe the actor rather than its properties.
#[must_use]
pub fn is_actor_metadata(name: &str) -> bool {
    matches!(name, ACTOR_CATEGORY | ACTOR_TYPE | ACTOR_NAME)
}
