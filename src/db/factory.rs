//! Driver construction from typed configuration.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use super::error::DriverError;
use super::query::{AnyQueryBuilder, Query, QueryResult};
use super::relational::{RelationalConf, RelationalDriver};
use super::timeseries::{Point, TimeSeriesConf, TimeSeriesDriver};

/// Known database backends.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum DriverKind {
    Relational,
    TimeSeries,
}

/// Backend-specific configuration payload.
///
/// Untagged: the two shapes share no fields, so the payload alone is
/// unambiguous. The factory still checks it against the declared type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BackendConf {
    TimeSeries(TimeSeriesConf),
    Relational(RelationalConf),
}

/// Tagged driver configuration.
///
/// Invariant: `conf`'s concrete shape must match `type` or construction
/// fails; an unknown `type` fails already at deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(rename = "type")]
    pub kind: DriverKind,
    pub conf: BackendConf,
}

/// Construct the driver declared by `config`.
///
/// # Errors
/// Returns `DriverError::ConfigMismatch` when the payload shape does not
/// match the declared type; no partial driver is returned.
pub fn build_driver(config: DriverConfig) -> Result<Driver, DriverError> {
    match (config.kind, config.conf) {
        (DriverKind::Relational, BackendConf::Relational(conf)) => {
            Ok(Driver::Relational(RelationalDriver::new(conf)))
        }
        (DriverKind::TimeSeries, BackendConf::TimeSeries(conf)) => {
            Ok(Driver::TimeSeries(TimeSeriesDriver::new(conf)))
        }
        (kind, _) => Err(DriverError::ConfigMismatch { kind }),
    }
}

/// A constructed driver behind the uniform capability surface.
///
/// `write` is relational-only and `write_point` time-series-only; calling
/// either on the other backend reports `Unsupported`.
#[derive(Debug)]
pub enum Driver {
    Relational(RelationalDriver),
    TimeSeries(TimeSeriesDriver),
}

impl Driver {
    /// Which backend this driver talks to.
    pub fn kind(&self) -> DriverKind {
        match self {
            Self::Relational(_) => DriverKind::Relational,
            Self::TimeSeries(_) => DriverKind::TimeSeries,
        }
    }

    pub async fn connect(&mut self) -> Result<(), DriverError> {
        match self {
            Self::Relational(driver) => driver.connect().await,
            Self::TimeSeries(driver) => driver.connect().await,
        }
    }

    pub async fn close(&mut self) -> Result<(), DriverError> {
        match self {
            Self::Relational(driver) => driver.close().await,
            Self::TimeSeries(driver) => driver.close().await,
        }
    }

    pub async fn ping(&self) -> Result<(), DriverError> {
        match self {
            Self::Relational(driver) => driver.ping().await,
            Self::TimeSeries(driver) => driver.ping().await,
        }
    }

    /// A builder for this driver's dialect.
    pub fn query_builder(&self) -> AnyQueryBuilder {
        match self {
            Self::Relational(driver) => AnyQueryBuilder::Sql(driver.query_builder()),
            Self::TimeSeries(driver) => AnyQueryBuilder::Flux(driver.query_builder()),
        }
    }

    pub async fn query(&self, query: &Query) -> Result<QueryResult, DriverError> {
        match self {
            Self::Relational(driver) => driver.query(query).await,
            Self::TimeSeries(driver) => driver.query(query).await,
        }
    }

    /// Raw statement execution; relational only.
    pub async fn write(&self, query: &Query) -> Result<(), DriverError> {
        match self {
            Self::Relational(driver) => driver.write(query).await,
            Self::TimeSeries(_) => Err(DriverError::Unsupported {
                op: "write",
                kind: DriverKind::TimeSeries,
            }),
        }
    }

    /// Point write; time-series only.
    pub async fn write_point(&self, point: &Point) -> Result<(), DriverError> {
        match self {
            Self::TimeSeries(driver) => driver.write_point(point).await,
            Self::Relational(_) => Err(DriverError::Unsupported {
                op: "write_point",
                kind: DriverKind::Relational,
            }),
        }
    }
}
