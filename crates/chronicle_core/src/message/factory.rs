//! # Message Factory
//!
//! Creates messages stamped with the current time and origin, reusing
//! returned instances from a bounded free list.
//!
//! Returning a message hands over ownership, so a recycled instance can
//! never be observed by its previous holder.

use crate::actor::ActorId;
use crate::message::types::MessageType;
use crate::message::Message;

/// Counters describing pool behavior.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// `create` calls served from the free list.
    pub reused: u64,
    /// `create` calls that had to allocate.
    pub allocated: u64,
    /// Messages returned to the free list.
    pub recycled: u64,
    /// Messages dropped because the free list was full.
    pub discarded: u64,
}

/// Pooled message constructor owned by one kernel.
#[derive(Debug)]
pub struct MessageFactory {
    free_list: Vec<Message>,
    capacity: usize,
    machine_id: ActorId,
    sim_time: f64,
    real_time_micros: u64,
    stats: PoolStats,
}

impl MessageFactory {
    /// Creates a factory for `machine_id` holding up to `capacity` spare
    /// messages. All spares are allocated upfront.
    #[must_use]
    pub fn new(machine_id: ActorId, capacity: usize) -> Self {
        let free_list = (0..capacity)
            .map(|_| Message::new(crate::message::types::TICK_LOCAL))
            .collect();
        Self {
            free_list,
            capacity,
            machine_id,
            sim_time: 0.0,
            real_time_micros: 0,
            stats: PoolStats::default(),
        }
    }

    /// Machine stamped as the source of created messages.
    #[inline]
    #[must_use]
    pub const fn machine_id(&self) -> ActorId {
        self.machine_id
    }

    /// Updates the timestamps applied to new messages.
    #[inline]
    pub fn set_time(&mut self, sim_time: f64, real_time_micros: u64) {
        self.sim_time = sim_time;
        self.real_time_micros = real_time_micros;
    }

    /// Returns a message of `msg_type` with no parameters, stamped with this
    /// machine and the current time.
    ///
    /// **O(1)** amortized.
    pub fn create(&mut self, msg_type: MessageType) -> Message {
        let mut msg = if let Some(mut spare) = self.free_list.pop() {
            self.stats.reused += 1;
            spare.reset(msg_type);
            spare
        } else {
            self.stats.allocated += 1;
            Message::new(msg_type)
        };
        msg.source = Some(self.machine_id);
        msg.sim_time = self.sim_time;
        msg.real_time_micros = self.real_time_micros;
        msg
    }

    /// Takes a message back after dispatch.
    pub fn recycle(&mut self, message: Message) {
        if self.free_list.len() < self.capacity {
            self.free_list.push(message);
            self.stats.recycled += 1;
        } else {
            self.stats.discarded += 1;
        }
    }

    /// Spare messages currently pooled.
    #[inline]
    #[must_use]
    pub fn available(&self) -> usize {
        self.free_list.len()
    }

    /// Pool counters.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> PoolStats {
        self.stats
    }
}
