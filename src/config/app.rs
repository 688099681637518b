//! Application configuration structures.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::Kind;

use super::validation::{parse_duration, ConfigError};

// =============================================================================
// Constants
// =============================================================================

/// Default bound on retained records per kind.
pub const DEFAULT_MAX_PENDING: usize = 10_000;

/// Default REST request timeout (10 seconds).
pub const DEFAULT_REST_TIMEOUT: Duration = Duration::from_secs(10);

fn default_max_pending() -> usize {
    DEFAULT_MAX_PENDING
}

fn default_rest_timeout() -> Duration {
    DEFAULT_REST_TIMEOUT
}

// =============================================================================
// Object Configuration
// =============================================================================

/// One entry of the static object table.
///
/// Loaded once at startup and immutable for the process lifetime; drives
/// which records the collector fetches each cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectConfig {
    /// Opaque identifier the record is fetched under.
    #[serde(rename = "ref")]
    pub reference: String,

    /// Record kind, selects the data source accessor.
    #[serde(rename = "type")]
    pub kind: Kind,

    /// Source identifier stamped onto collected records.
    pub source: i64,

    /// Logical name stamped onto collected records.
    pub name: String,
}

// =============================================================================
// Sink Configuration
// =============================================================================

/// Export sink selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SinkConfig {
    /// POST each batch as JSON to `host` + the fixed per-kind route.
    Rest {
        /// Base URL of the REST endpoint, e.g. `http://ems.example.com:8080`.
        host: String,
        /// Request timeout (default: 10s).
        #[serde(default = "default_rest_timeout", with = "humantime_serde")]
        timeout: Duration,
    },

    /// Append batches to `<kind>.csv` files in annotated-CSV layout.
    AnnotatedCsv { dir: PathBuf },

    /// Append batches to `<kind>.lp` files, one line-protocol line per record.
    LineProtocol { dir: PathBuf },
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level pipeline configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Site identifier stamped onto every collected record.
    pub site_id: i64,

    /// Collection period as a duration string, e.g. `30s`, `1m30s`.
    pub period: String,

    /// Export sink selection.
    pub sink: SinkConfig,

    /// Bound on retained records per kind (default: 10000).
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// Static object table, keyed by a free-form entry name.
    pub objects: BTreeMap<String, ObjectConfig>,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::Validation` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // A malformed period is a fatal startup error, never retried.
        parse_duration(&self.period)
            .map_err(|e| ConfigError::Validation(format!("period: {}", e)))?;

        if self.max_pending == 0 {
            return Err(ConfigError::Validation(
                "max_pending must be positive".to_string(),
            ));
        }

        if let SinkConfig::Rest { host, .. } = &self.sink {
            if !host.starts_with("http://") && !host.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "sink host must be an http(s) URL, got '{}'",
                    host
                )));
            }
        }

        for (entry, object) in &self.objects {
            if object.reference.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "object '{}' has an empty ref",
                    entry
                )));
            }
        }

        Ok(())
    }

    /// The collection period, parsed.
    pub fn period(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.period)
            .map_err(|e| ConfigError::Validation(format!("period: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_yaml() -> &'static str {
        r#"
site_id: 3
period: 30s
sink:
  kind: rest
  host: http://localhost:8080
objects:
  bat1:
    ref: ess.battery.1
    type: battery
    source: 2
    name: battery-1
  pv1:
    ref: pv.array.1
    type: pv
    source: 4
    name: pv-array-1
"#
    }

    #[test]
    fn test_parse_sample_config() {
        let config: AppConfig = serde_yaml::from_str(sample_yaml()).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.site_id, 3);
        assert_eq!(config.period().unwrap(), Duration::from_secs(30));
        assert_eq!(config.max_pending, DEFAULT_MAX_PENDING);
        assert_eq!(config.objects.len(), 2);

        let bat = &config.objects["bat1"];
        assert_eq!(bat.reference, "ess.battery.1");
        assert_eq!(bat.kind, Kind::Battery);
        assert_eq!(bat.source, 2);

        match &config.sink {
            SinkConfig::Rest { host, timeout } => {
                assert_eq!(host, "http://localhost:8080");
                assert_eq!(*timeout, DEFAULT_REST_TIMEOUT);
            }
            other => panic!("expected rest sink, got {:?}", other),
        }
    }

    #[test]
    fn test_file_sink_variants() {
        let yaml = r#"
site_id: 1
period: 1m
sink:
  kind: line-protocol
  dir: /var/lib/gridpost
objects: {}
"#;
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(matches!(config.sink, SinkConfig::LineProtocol { .. }));

        let yaml = yaml.replace("line-protocol", "annotated-csv");
        let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(matches!(config.sink, SinkConfig::AnnotatedCsv { .. }));
    }

    #[test]
    fn test_invalid_period_is_fatal() {
        let yaml = sample_yaml().replace("30s", "soon");
        let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("period"));
    }

    #[test]
    fn test_invalid_rest_host() {
        let yaml = sample_yaml().replace("http://localhost:8080", "localhost:8080");
        let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_ref_rejected() {
        let yaml = sample_yaml().replace("ess.battery.1", "");
        let config: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert!(config.validate().is_err());
    }
}
