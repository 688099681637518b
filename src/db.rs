//! Database Abstraction Layer
//!
//! Backend-agnostic query/write access to two heterogeneous stores, selected
//! at runtime through a factory. Independent of the export pipeline.
//!
//! # Components
//!
//! - [`Query`] / [`QueryResult`]: opaque query plus normalized result shape
//! - [`SqlQueryBuilder`] / [`FluxQueryBuilder`]: per-dialect fluent builders
//! - [`AnyQueryBuilder`]: dialect-dispatching builder handed out by drivers
//! - [`RelationalDriver`] / [`TimeSeriesDriver`]: thin backend adapters
//! - [`Driver`] / [`build_driver`]: uniform surface and its factory
//!
//! The abstraction is intentionally minimal: drivers translate the uniform
//! calls onto the backend client and normalize result shapes, nothing more.
//! One instance owns one connection; `connect`/`close` are not reentrant and
//! must not race `query`/`write` on the same instance.

mod error;
mod factory;
mod query;
mod relational;
mod timeseries;

pub use error::DriverError;
pub use factory::{build_driver, BackendConf, Driver, DriverConfig, DriverKind};
pub use query::{AnyQueryBuilder, Query, QueryResult};
pub use relational::{RelationalConf, RelationalDriver, SqlQueryBuilder};
pub use timeseries::{FluxQueryBuilder, Point, TimeSeriesConf, TimeSeriesDriver};
