//! Gridpost - Telemetry Batching and Export Pipeline
//!
//! Periodically collects typed telemetry records (battery, metric, status,
//! setpoint, photovoltaic) from an in-memory data source, stamps provenance
//! metadata, batches them per kind and exports each batch to one of several
//! interchangeable sinks. A companion database layer provides backend-agnostic
//! query/write access over a relational store and a time-series store.
//!
//! # Architecture
//!
//! - **Telemetry**: record kinds, payload descriptors, the data source
//! - **Pipeline**: batch stores, collector, fixed-period scheduler
//! - **Export**: REST-JSON, annotated-CSV and line-protocol sinks
//! - **Db**: fluent query builders, drivers, driver factory
//! - **Config**: YAML configuration with validation
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use gridpost::{
//!     config::SinkConfig, export::Sink, pipeline::{Collector, Scheduler},
//!     telemetry::MemorySource,
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let source = Arc::new(MemorySource::new());
//! let collector = Collector::new(Arc::clone(&source), 3, Vec::new());
//! collector.validate()?;
//!
//! let sink = Sink::from_config(&SinkConfig::LineProtocol { dir: "./data".into() })?;
//! let scheduler = Scheduler::new(collector, sink, Duration::from_secs(30), 10_000);
//!
//! let (_shutdown, rx) = tokio::sync::watch::channel(false);
//! scheduler.run(rx).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod export;
pub mod pipeline;
pub mod telemetry;

pub use config::{AppConfig, ConfigError, ObjectConfig, SinkConfig};
pub use export::{ExportError, Sink};
pub use pipeline::{Batch, BatchSet, CollectStats, Collector, Scheduler};
pub use telemetry::{
    AnyRecord, Battery, DataSource, FieldValue, Kind, MemorySource, Metric, Pv, Setpoint,
    SourceError, Stamped, Status, Telemetry,
};
