//! Parameter names on logger requests and status reports.

/// Log to record into or play back.
pub const LOG_NAME: &str = "log_name";
/// Keyframe or tag name.
pub const NAME: &str = "name";
/// Free text for keyframes and tags.
pub const DESCRIPTION: &str = "description";
/// Keyframe position for jump requests.
pub const KEYFRAME_INDEX: &str = "keyframe_index";
/// Tag to jump to.
pub const TAG_NAME: &str = "tag_name";
/// Auto keyframe interval in simulation seconds.
pub const INTERVAL: &str = "interval";

/// Controller state.
pub const STATE: &str = "state";
/// Simulation time the controller sees (playback time while playing).
pub const CURRENT_SIM_TIME: &str = "current_sim_time";
/// Length of the current or loaded recording, seconds.
pub const RECORD_DURATION: &str = "record_duration";
/// Entries written this session.
pub const ENTRIES_RECORDED: &str = "entries_recorded";
/// Entries injected this session.
pub const ENTRIES_PLAYED: &str = "entries_played";
/// Keyframes in the current log.
pub const KEYFRAME_COUNT: &str = "keyframe_count";
/// Tags in the current log.
pub const TAG_COUNT: &str = "tag_count";
/// Playback has run out of entries.
pub const END_OF_MESSAGES: &str = "end_of_messages";
/// Last failure, if any.
pub const LAST_ERROR: &str = "last_error";
