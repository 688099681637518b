//! Record kinds, payload types and provenance stamping.
//!
//! Each payload type carries a static field descriptor ([`Telemetry::columns`]
//! and [`Telemetry::values`]) so the file sinks can lay out columns without
//! runtime introspection. Column order is declaration order and must stay in
//! sync between the two methods.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Provenance columns shared by every kind, emitted before the payload fields.
pub const PROVENANCE_COLUMNS: [&str; 4] = ["timestamp", "site", "source", "name"];

/// The five telemetry record categories.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Kind {
    /// Battery (ESS) measurement.
    Battery,
    /// Generic numeric metric.
    Metric,
    /// Device status snapshot.
    Status,
    /// Control setpoint.
    Setpoint,
    /// Photovoltaic measurement.
    Pv,
}

impl Kind {
    /// All kinds, in export order.
    pub const ALL: [Self; 5] = [
        Self::Battery,
        Self::Metric,
        Self::Status,
        Self::Setpoint,
        Self::Pv,
    ];

    /// Fixed REST route for this kind.
    pub fn rest_path(&self) -> &'static str {
        match self {
            Self::Battery => "/api/essMeasures",
            Self::Metric => "/api/metrics",
            Self::Status => "/api/statuses",
            Self::Setpoint => "/api/setpoints",
            Self::Pv => "/api/pvMeasures",
        }
    }
}

/// A single exported field value.
///
/// The line-protocol sink renders each variant differently; the CSV sink uses
/// the [`Display`](std::fmt::Display) form for everything.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Text(String),
}

impl FieldValue {
    /// Whether this value belongs to the numeric field group in line protocol.
    pub fn is_numeric(&self) -> bool {
        !matches!(self, Self::Text(_))
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Boolean(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// Static per-kind field descriptor.
///
/// Implementations list payload columns in declaration order; `values` must
/// return one entry per column, in the same order.
pub trait Telemetry: Serialize + Send + Sync + 'static {
    /// Kind discriminant for this payload type.
    const KIND: Kind;

    /// Payload column names, declaration order.
    fn columns() -> &'static [&'static str];

    /// Payload values, same order as [`Self::columns`].
    fn values(&self) -> Vec<FieldValue>;
}

/// Battery (ESS) measurement payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    /// State of charge, percent.
    pub soc: f64,
    /// Pack voltage, volts.
    pub voltage: f64,
    /// Pack current, amps.
    pub current: f64,
    /// Active power, watts. Negative while charging.
    pub power: f64,
}

impl Telemetry for Battery {
    const KIND: Kind = Kind::Battery;

    fn columns() -> &'static [&'static str] {
        &["soc", "voltage", "current", "power"]
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Float(self.soc),
            FieldValue::Float(self.voltage),
            FieldValue::Float(self.current),
            FieldValue::Float(self.power),
        ]
    }
}

/// Generic numeric metric payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub value: f64,
}

impl Telemetry for Metric {
    const KIND: Kind = Kind::Metric;

    fn columns() -> &'static [&'static str] {
        &["value"]
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![FieldValue::Float(self.value)]
    }
}

/// Device status payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// Free-form state label reported by the device.
    pub state: String,
    /// Vendor status code.
    pub code: i64,
    /// Whether the device reports a fault condition.
    pub fault: bool,
}

impl Telemetry for Status {
    const KIND: Kind = Kind::Status;

    fn columns() -> &'static [&'static str] {
        &["state", "code", "fault"]
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![
            FieldValue::Text(self.state.clone()),
            FieldValue::Integer(self.code),
            FieldValue::Boolean(self.fault),
        ]
    }
}

/// Control setpoint payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Setpoint {
    /// Requested active power, watts.
    pub power: f64,
}

impl Telemetry for Setpoint {
    const KIND: Kind = Kind::Setpoint;

    fn columns() -> &'static [&'static str] {
        &["power"]
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![FieldValue::Float(self.power)]
    }
}

/// Photovoltaic measurement payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pv {
    /// Instantaneous production, watts.
    pub power: f64,
    /// Cumulative production, watt-hours.
    pub energy: f64,
}

impl Telemetry for Pv {
    const KIND: Kind = Kind::Pv;

    fn columns() -> &'static [&'static str] {
        &["power", "energy"]
    }

    fn values(&self) -> Vec<FieldValue> {
        vec![FieldValue::Float(self.power), FieldValue::Float(self.energy)]
    }
}

/// A fetched record plus cycle-local provenance metadata.
///
/// Provenance (`source`, `site`, `name`) is copied from the static object
/// configuration at batch time and the timestamp is set to collection time,
/// never to anything the record carried before. The underlying handle keeps
/// its identity so batches can suppress duplicates by reference, not value.
#[derive(Debug, Clone, Serialize)]
pub struct Stamped<T> {
    #[serde(flatten)]
    record: Arc<T>,
    /// Source identifier from the object configuration.
    pub source: i64,
    /// Site identifier from the process configuration.
    pub site: i64,
    /// Logical object name from the object configuration.
    pub name: String,
    /// Collection timestamp, UTC. Non-zero after collection.
    pub timestamp: DateTime<Utc>,
}

impl<T> Stamped<T> {
    /// Stamp a fetched record with provenance and the current time.
    pub fn new(record: Arc<T>, source: i64, site: i64, name: impl Into<String>) -> Self {
        Self {
            record,
            source,
            site,
            name: name.into(),
            timestamp: Utc::now(),
        }
    }

    /// Replace the collection timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The underlying payload.
    pub fn record(&self) -> &T {
        &self.record
    }

    /// The shared handle the record was fetched as.
    pub fn handle(&self) -> &Arc<T> {
        &self.record
    }

    /// Whether this entry was fetched as the same instance as `other`.
    pub fn shares_handle(&self, other: &Arc<T>) -> bool {
        Arc::ptr_eq(&self.record, other)
    }
}
