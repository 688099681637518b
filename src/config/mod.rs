//! Configuration module for the gridpost pipeline.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Export sink selection (REST, annotated CSV, line protocol)
//! - Collection period and batch bounds
//! - The static object table driving each collection pass

mod app;
mod validation;

pub use app::{AppConfig, ObjectConfig, SinkConfig};
pub use validation::{parse_duration, ConfigError};

// Re-export constants
pub use app::{DEFAULT_MAX_PENDING, DEFAULT_REST_TIMEOUT};
