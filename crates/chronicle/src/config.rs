//! # Configuration
//!
//! One TOML file configures a session:
//!
//! ```toml
//! [kernel]
//! time_scale = 1.0
//! start_paused = false
//! message_pool_capacity = 1024
//! inbound_capacity = 0          # 0 = unbounded
//!
//! [[components]]
//! name = "default_message_processor"
//! priority = "highest"
//!
//! [[components]]
//! name = "log_controller"
//!
//! [logger]
//! log_dir = "logs"
//! auto_keyframe_interval_secs = 60.0   # 0 = off
//! playback_rate = 1.0                  # 0 = as fast as allowed
//! max_messages_per_tick = 1000
//! ignored_message_types = ["Timer Elapsed"]
//! ```
//!
//! Every field has a default; an empty file is a valid configuration.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chronicle_kernel::{ComponentPriority, KernelConfig, DEFAULT_MESSAGE_PROCESSOR};
use chronicle_replay::{LogControllerConfig, PlaybackRate, LOG_CONTROLLER};
use serde::{Deserialize, Serialize};

use crate::error::{ChronicleError, ChronicleResult};

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChronicleConfig {
    /// Kernel settings.
    pub kernel: KernelSection,
    /// Components to install, resolved by name.
    pub components: ComponentList,
    /// Log controller settings.
    pub logger: LoggerSection,
}

/// `[kernel]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelSection {
    /// Simulation time multiplier.
    pub time_scale: f64,
    /// Start with simulation time frozen.
    pub start_paused: bool,
    /// Spare messages kept by the factory.
    pub message_pool_capacity: usize,
    /// Cross-thread inbound queue bound. 0 means unbounded.
    pub inbound_capacity: usize,
    /// Ticks slower than this many microseconds are logged. 0 disables.
    pub slow_tick_warning_us: u64,
}

impl Default for KernelSection {
    fn default() -> Self {
        let defaults = KernelConfig::default();
        Self {
            time_scale: defaults.time_scale,
            start_paused: defaults.start_paused,
            message_pool_capacity: defaults.message_pool_capacity,
            inbound_capacity: defaults.inbound_capacity,
            slow_tick_warning_us: defaults.slow_tick_warning_us,
        }
    }
}

impl KernelSection {
    /// Kernel settings.
    ///
    /// # Errors
    ///
    /// `ConfigValue` for a negative or non-finite time scale.
    pub fn to_kernel_config(&self) -> ChronicleResult<KernelConfig> {
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(ChronicleError::value("kernel.time_scale", "must be finite and >= 0"));
        }
        Ok(KernelConfig {
            time_scale: self.time_scale,
            start_paused: self.start_paused,
            message_pool_capacity: self.message_pool_capacity,
            inbound_capacity: self.inbound_capacity,
            slow_tick_warning_us: self.slow_tick_warning_us,
        })
    }
}

/// One `[[components]]` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentEntry {
    /// Name registered in the factory table.
    pub name: String,
    /// `highest`, `higher`, `normal`, `lower` or `lowest`.
    #[serde(default = "default_priority")]
    pub priority: String,
}

impl ComponentEntry {
    /// Creates an entry.
    #[must_use]
    pub fn new(name: &str, priority: ComponentPriority) -> Self {
        Self {
            name: name.to_owned(),
            priority: priority.as_str().to_owned(),
        }
    }

    /// Parsed priority.
    ///
    /// # Errors
    ///
    /// `ConfigValue` for an unknown priority name.
    pub fn parsed_priority(&self) -> ChronicleResult<ComponentPriority> {
        self.priority
            .parse()
            .map_err(|reason: String| ChronicleError::value(format!("components.{}.priority", self.name), reason))
    }
}

fn default_priority() -> String {
    ComponentPriority::Normal.as_str().to_owned()
}

/// The `[[components]]` array, defaulting to the message processor and the
/// log controller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentList(pub Vec<ComponentEntry>);

impl Default for ComponentList {
    fn default() -> Self {
        Self(vec![
            ComponentEntry::new(DEFAULT_MESSAGE_PROCESSOR, ComponentPriority::Highest),
            ComponentEntry::new(LOG_CONTROLLER, ComponentPriority::Normal),
        ])
    }
}

impl ComponentList {
    /// Iterates the entries in file order.
    pub fn iter(&self) -> std::slice::Iter<'_, ComponentEntry> {
        self.0.iter()
    }

    /// True if a component called `name` is listed.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|c| c.name == name)
    }
}

/// `[logger]` table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggerSection {
    /// Directory holding recorded logs.
    pub log_dir: PathBuf,
    /// Seconds between automatic keyframes. 0 disables.
    pub auto_keyframe_interval_secs: f64,
    /// Playback speed multiplier. 0 plays as fast as
    /// `max_messages_per_tick` allows.
    pub playback_rate: f64,
    /// Injection bound per playback tick.
    pub max_messages_per_tick: usize,
    /// Message type names never recorded.
    pub ignored_message_types: Vec<String>,
}

impl Default for LoggerSection {
    fn default() -> Self {
        let defaults = LogControllerConfig::default();
        Self {
            log_dir: defaults.log_dir,
            auto_keyframe_interval_secs: defaults.auto_keyframe_interval,
            playback_rate: 1.0,
            max_messages_per_tick: defaults.max_messages_per_tick,
            ignored_message_types: Vec::new(),
        }
    }
}

impl LoggerSection {
    /// Log controller settings.
    ///
    /// # Errors
    ///
    /// `ConfigValue` for negative intervals or rates, or a zero message
    /// bound.
    pub fn to_controller_config(&self) -> ChronicleResult<LogControllerConfig> {
        if self.auto_keyframe_interval_secs.is_nan() || self.auto_keyframe_interval_secs < 0.0 {
            return Err(ChronicleError::value("logger.auto_keyframe_interval_secs", "must be >= 0"));
        }
        if !self.playback_rate.is_finite() || self.playback_rate < 0.0 {
            return Err(ChronicleError::value("logger.playback_rate", "must be finite and >= 0"));
        }
        if self.max_messages_per_tick == 0 {
            return Err(ChronicleError::value("logger.max_messages_per_tick", "must be > 0"));
        }

        let playback_rate = if self.playback_rate == 0.0 {
            PlaybackRate::Unthrottled
        } else {
            PlaybackRate::Scaled(self.playback_rate)
        };
        Ok(LogControllerConfig {
            log_dir: self.log_dir.clone(),
            auto_keyframe_interval: self.auto_keyframe_interval_secs,
            playback_rate,
            max_messages_per_tick: self.max_messages_per_tick,
            ignored_message_types: self.ignored_message_types.iter().cloned().collect::<HashSet<_>>(),
        })
    }
}

impl ChronicleConfig {
    /// Parses a TOML document.
    ///
    /// # Errors
    ///
    /// `ConfigParse` for malformed TOML or unknown fields.
    pub fn from_toml_str(text: &str) -> ChronicleResult<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses a TOML file.
    ///
    /// # Errors
    ///
    /// `ConfigRead` if the file cannot be read, `ConfigParse` otherwise.
    pub fn load(path: impl AsRef<Path>) -> ChronicleResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ChronicleError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::info!(
            path = %path.display(),
            components = config.components.0.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// `ConfigValue` if a value cannot be represented.
    pub fn to_toml_string(&self) -> ChronicleResult<String> {
        toml::to_string(self).map_err(|e| ChronicleError::value("config", e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ChronicleConfig::from_toml_str("").unwrap();
        assert_eq!(config, ChronicleConfig::default());
        assert!(config.components.contains(LOG_CONTROLLER));
        assert_eq!(config.logger.to_controller_config().unwrap().max_messages_per_tick, 1000);
    }

    #[test]
    fn test_full_document() {
        let config = ChronicleConfig::from_toml_str(
            r#"
            [kernel]
            time_scale = 2.0
            inbound_capacity = 64

            [[components]]
            name = "network_publisher"
            priority = "lowest"

            [logger]
            log_dir = "/var/aar"
            playback_rate = 0.0
            ignored_message_types = ["Timer Elapsed"]
            "#,
        )
        .unwrap();

        let kernel = config.kernel.to_kernel_config().unwrap();
        assert_eq!(kernel.time_scale, 2.0);
        assert_eq!(kernel.inbound_capacity, 64);

        assert_eq!(config.components.0.len(), 1);
        assert_eq!(
            config.components.0[0].parsed_priority().unwrap(),
            ComponentPriority::Lowest
        );

        let logger = config.logger.to_controller_config().unwrap();
        assert_eq!(logger.log_dir, PathBuf::from("/var/aar"));
        assert_eq!(logger.playback_rate, PlaybackRate::Unthrottled);
        assert!(logger.ignored_message_types.contains("Timer Elapsed"));
    }

    #[test]
    fn test_bad_values_rejected() {
        assert!(matches!(
            ChronicleConfig::from_toml_str("[kernel]\nticks = 5"),
            Err(ChronicleError::ConfigParse(_))
        ));

        let bad_priority = ComponentEntry {
            name: "x".into(),
            priority: "urgent".into(),
        };
        assert!(matches!(bad_priority.parsed_priority(), Err(ChronicleError::ConfigValue { .. })));

        let logger = LoggerSection {
            max_messages_per_tick: 0,
            ..LoggerSection::default()
        };
        assert!(logger.to_controller_config().is_err());
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = ChronicleConfig::default();
        let text = config.to_toml_string().unwrap();
        assert_eq!(ChronicleConfig::from_toml_str(&text).unwrap(), config);
    }
}
