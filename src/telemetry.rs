//! Telemetry Layer
//!
//! Typed telemetry records and the data source they are fetched from.
//!
//! # Components
//!
//! - [`Kind`]: the five telemetry record categories
//! - [`Battery`], [`Metric`], [`Status`], [`Setpoint`], [`Pv`]: kind-specific payloads
//! - [`Telemetry`]: static field descriptors for sink serialization
//! - [`Stamped`]: a fetched record plus cycle-local provenance metadata
//! - [`DataSource`]: the external registry records are fetched from
//! - [`MemorySource`]: in-memory [`DataSource`] for standalone runs and tests

mod records;
mod source;

pub use records::{
    Battery, FieldValue, Kind, Metric, Pv, Setpoint, Stamped, Status, Telemetry,
    PROVENANCE_COLUMNS,
};
pub use source::{AnyRecord, DataSource, MemorySource, SourceError};
