//! Error types for PulseGrid configuration.

use thiserror::Error;

/// Result type alias for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading or validating `pulsegrid.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(String),

    #[error("failed to parse config: {0}")]
    Parse(String),

    #[error("invalid duration '{0}' (expected e.g. \"500ms\", \"30s\", \"5m\", \"1h\")")]
    BadDuration(String),

    #[error("duplicate source '{0}'")]
    DuplicateSource(String),

    #[error("no sources configured")]
    NoSources,
}
