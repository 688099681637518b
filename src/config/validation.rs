//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;

use crate::telemetry::SourceError;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    Validation(String),

    /// A configured object ref cannot be resolved against the data source.
    #[error("object ref '{reference}' cannot be resolved: {source}")]
    UnresolvedRef {
        reference: String,
        #[source]
        source: SourceError,
    },
}

/// Parse duration string using humantime.
///
/// Supports formats like `30s`, `1m`, `5m30s`, `1h`, `100ms`.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}
