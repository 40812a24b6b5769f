//! Error types for configuration and session assembly.

use std::path::PathBuf;

use chronicle_kernel::KernelError;
use chronicle_replay::ReplayError;
use thiserror::Error;

/// Result alias for this crate.
pub type ChronicleResult<T> = Result<T, ChronicleError>;

/// Errors raised while loading configuration or building a session.
#[derive(Debug, Error)]
pub enum ChronicleError {
    /// The configuration file could not be read.
    #[error("Cannot read config '{path}': {source}")]
    ConfigRead {
        /// File that was requested.
        path: PathBuf,
        /// Underlying failure.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid TOML for [`crate::ChronicleConfig`].
    #[error("Invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A configuration value is out of range.
    #[error("Invalid config value for {field}: {reason}")]
    ConfigValue {
        /// Offending field.
        field: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Kernel failure.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// Record/playback failure.
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

impl ChronicleError {
    pub(crate) fn value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
