//! # Controller Status
//!
//! The log controller keeps a [`LogStatusInfo`] current after every state
//! change and every tick. Other threads (a UI, a remote console) read it
//! through a cloned [`StatusHandle`]; kernel components ask for it with
//! `LOG_REQ_GET_STATUS` and receive `LOG_INFO_STATUS`.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chronicle_core::{Message, ParamValue};
use parking_lot::RwLock;

use crate::params;

/// Log controller state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LogState {
    /// Neither recording nor playing.
    #[default]
    Idle,
    /// Appending every message to a log.
    Record,
    /// Injecting messages from a log.
    Playback,
}

impl LogState {
    /// Uppercase name as reported in status messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Record => "RECORD",
            Self::Playback => "PLAYBACK",
        }
    }
}

impl fmt::Display for LogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "IDLE" => Ok(Self::Idle),
            "RECORD" => Ok(Self::Record),
            "PLAYBACK" => Ok(Self::Playback),
            other => Err(format!("unknown log state '{other}'")),
        }
    }
}

/// Snapshot of the controller.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LogStatusInfo {
    /// Current state.
    pub state: LogState,
    /// Log being recorded or played.
    pub log_name: Option<String>,
    /// Simulation time; playback time while playing.
    pub current_sim_time: f64,
    /// Seconds recorded so far, or the loaded log's length.
    pub record_duration: f64,
    /// Entries written this session.
    pub entries_recorded: u64,
    /// Entries injected this session.
    pub entries_played: u64,
    /// Keyframes in the log.
    pub keyframe_count: usize,
    /// Tags in the log.
    pub tag_count: usize,
    /// Auto keyframe interval, seconds. 0 means off.
    pub auto_keyframe_interval: f64,
    /// Playback has run out of entries.
    pub end_of_messages: bool,
    /// Last failure.
    pub last_error: Option<String>,
}

impl LogStatusInfo {
    /// Writes the status as parameters of `message`.
    pub fn write_params(&self, message: &mut Message) {
        let p = &mut message.params;
        p.set(params::STATE, self.state.as_str());
        p.set(params::LOG_NAME, self.log_name.clone().unwrap_or_default());
        p.set(params::CURRENT_SIM_TIME, self.current_sim_time);
        p.set(params::RECORD_DURATION, self.record_duration);
        p.set(params::ENTRIES_RECORDED, to_i64(self.entries_recorded));
        p.set(params::ENTRIES_PLAYED, to_i64(self.entries_played));
        p.set(params::KEYFRAME_COUNT, to_i64(self.keyframe_count as u64));
        p.set(params::TAG_COUNT, to_i64(self.tag_count as u64));
        p.set(params::INTERVAL, self.auto_keyframe_interval);
        p.set(params::END_OF_MESSAGES, self.end_of_messages);
        if let Some(err) = &self.last_error {
            p.set(params::LAST_ERROR, err.as_str());
        }
    }

    /// Reads a status written by [`write_params`](Self::write_params).
    /// Missing parameters keep their defaults.
    #[must_use]
    pub fn from_message(message: &Message) -> Self {
        let text = |name| message.param(name).and_then(ParamValue::as_str);
        let float = |name| message.param(name).and_then(ParamValue::as_f64).unwrap_or(0.0);
        let count = |name| {
            message
                .param(name)
                .and_then(ParamValue::as_i64)
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(0)
        };

        Self {
            state: text(params::STATE)
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            log_name: text(params::LOG_NAME)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            current_sim_time: float(params::CURRENT_SIM_TIME),
            record_duration: float(params::RECORD_DURATION),
            entries_recorded: count(params::ENTRIES_RECORDED),
            entries_played: count(params::ENTRIES_PLAYED),
            keyframe_count: usize::try_from(count(params::KEYFRAME_COUNT)).unwrap_or(usize::MAX),
            tag_count: usize::try_from(count(params::TAG_COUNT)).unwrap_or(usize::MAX),
            auto_keyframe_interval: float(params::INTERVAL),
            end_of_messages: message
                .param(params::END_OF_MESSAGES)
                .and_then(ParamValue::as_bool)
                .unwrap_or(false),
            last_error: text(params::LAST_ERROR).map(str::to_owned),
        }
    }
}

fn to_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Shared, thread-safe view of the controller status.
#[derive(Clone, Debug, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<LogStatusInfo>>,
}

impl StatusHandle {
    /// Creates a handle holding the default (idle) status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current status.
    #[must_use]
    pub fn get(&self) -> LogStatusInfo {
        self.inner.read().clone()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> LogState {
        self.inner.read().state
    }

    pub(crate) fn update(&self, f: impl FnOnce(&mut LogStatusInfo)) {
        f(&mut self.inner.write());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::types;

    #[test]
    fn test_state_names() {
        assert_eq!(LogState::Playback.to_string(), "PLAYBACK");
        assert_eq!("record".parse::<LogState>(), Ok(LogState::Record));
        assert!("paused".parse::<LogState>().is_err());
    }

    #[test]
    fn test_status_message_carries_fields() {
        let status = LogStatusInfo {
            state: LogState::Record,
            log_name: Some("sortie".into()),
            current_sim_time: 12.5,
            record_duration: 2.5,
            entries_recorded: 40,
            keyframe_count: 2,
            tag_count: 3,
            auto_keyframe_interval: 60.0,
            ..Default::default()
        };
        let mut msg = Message::new(types::LOG_INFO_STATUS);
        status.write_params(&mut msg);
        assert_eq!(LogStatusInfo::from_message(&msg), status);
    }

    #[test]
    fn test_handle_shared_across_threads() {
        let handle = StatusHandle::new();
        let reader = handle.clone();
        handle.update(|s| s.state = LogState::Playback);

        let seen = std::thread::spawn(move || reader.state()).join().unwrap();
        assert_eq!(seen, LogState::Playback);
    }
}
