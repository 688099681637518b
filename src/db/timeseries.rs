//! Time-series driver (InfluxDB v2 HTTP API) and the flux dialect builder.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::export::encode_line;
use crate::telemetry::FieldValue;

use super::error::DriverError;
use super::query::{Query, QueryResult};

/// Fixed lookback window of the flux dialect. Hard-coded, not configurable;
/// callers needing another range must filter inside the query.
const LOOKBACK: &str = "-1h";

/// Request timeout for all backend calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Time-series driver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSeriesConf {
    /// Server base URL, e.g. `http://localhost:8086`.
    pub url: String,
    /// API token.
    pub token: String,
    /// Organization name.
    pub org: String,
    /// Default bucket for builders and writes.
    pub bucket: String,
}

/// One write point: measurement, tags, fields, optional timestamp.
///
/// Rendered with the same line-protocol encoder the export sink uses.
/// A missing timestamp is filled with the current time at render.
#[derive(Debug, Clone)]
pub struct Point {
    measurement: String,
    tags: Vec<(String, String)>,
    fields: Vec<(String, FieldValue)>,
    timestamp: Option<DateTime<Utc>>,
}

impl Point {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp: None,
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Render as one line-protocol line. `None` when the point has no fields.
    pub fn to_line(&self) -> Option<String> {
        let nanos = self
            .timestamp
            .unwrap_or_else(Utc::now)
            .timestamp_nanos_opt()
            .unwrap_or_default();
        encode_line(&self.measurement, &self.tags, &self.fields, nanos)
    }
}

/// Thin adapter over the InfluxDB v2 HTTP API.
#[derive(Debug)]
pub struct TimeSeriesDriver {
    conf: TimeSeriesConf,
    client: Option<Client>,
}

impl TimeSeriesDriver {
    pub fn new(conf: TimeSeriesConf) -> Self {
        Self { conf, client: None }
    }

    /// Build the HTTP client and verify the server with a health probe.
    pub async fn connect(&mut self) -> Result<(), DriverError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        self.client = Some(client);
        self.ping().await
    }

    /// Drop the client. Safe to call when never connected.
    pub async fn close(&mut self) -> Result<(), DriverError> {
        self.client = None;
        Ok(())
    }

    /// Health probe against `/health`.
    pub async fn ping(&self) -> Result<(), DriverError> {
        let url = format!("{}/health", self.conf.url);
        let response = self.client()?.get(&url).send().await?;
        expect_success(response).await.map(|_| ())
    }

    /// A fresh flux-dialect builder seeded with the configured bucket.
    pub fn query_builder(&self) -> FluxQueryBuilder {
        FluxQueryBuilder::new().from(self.conf.bucket.as_str())
    }

    /// Run a flux query and normalize the annotated-CSV answer into ordered
    /// `time`/`field`/`value` triples.
    pub async fn query(&self, query: &Query) -> Result<QueryResult, DriverError> {
        let url = format!("{}/api/v2/query?org={}", self.conf.url, self.conf.org);
        let response = self
            .client()?
            .post(&url)
            .header(AUTHORIZATION, format!("Token {}", self.conf.token))
            .header(CONTENT_TYPE, "application/vnd.flux")
            .header(ACCEPT, "application/csv")
            .body(query.raw.clone())
            .send()
            .await?;

        let body = expect_success(response).await?;
        Ok(parse_flux_csv(&body))
    }

    /// Write one point with nanosecond precision.
    pub async fn write_point(&self, point: &Point) -> Result<(), DriverError> {
        let line = point.to_line().ok_or(DriverError::EmptyPoint)?;
        let url = format!(
            "{}/api/v2/write?org={}&bucket={}&precision=ns",
            self.conf.url, self.conf.org, self.conf.bucket
        );
        let response = self
            .client()?
            .post(&url)
            .header(AUTHORIZATION, format!("Token {}", self.conf.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await?;
        expect_success(response).await.map(|_| ())
    }

    fn client(&self) -> Result<&Client, DriverError> {
        self.client.as_ref().ok_or(DriverError::NotConnected)
    }
}

/// Read the body and fail on a non-2xx status.
async fn expect_success(response: reqwest::Response) -> Result<String, DriverError> {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if status.is_success() {
        Ok(body)
    } else {
        Err(DriverError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

/// Normalize a flux annotated-CSV response.
///
/// Annotation rows (`#...`) are skipped; the first plain row of each table
/// is its header; data rows contribute one `time`/`field`/`value` triple,
/// taken from the `_time`/`_field`/`_value` columns. Tables lacking those
/// columns are skipped.
fn parse_flux_csv(body: &str) -> QueryResult {
    let mut result = QueryResult {
        columns: vec!["time".to_string(), "field".to_string(), "value".to_string()],
        rows: Vec::new(),
    };

    let mut header: Option<[Option<usize>; 3]> = None;
    for line in body.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            // Blank line terminates a table; the next plain row is a header.
            header = None;
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        let cells = split_csv_line(line);
        match header {
            None => {
                let index_of = |name: &str| cells.iter().position(|c| c == name);
                header = Some([index_of("_time"), index_of("_field"), index_of("_value")]);
            }
            Some([time_idx, field_idx, value_idx]) => {
                let (Some(t), Some(f), Some(v)) = (time_idx, field_idx, value_idx) else {
                    continue;
                };
                let cell = |idx: usize| cells.get(idx).cloned().unwrap_or_default();
                result.rows.push(vec![
                    Value::String(cell(t)),
                    Value::String(cell(f)),
                    parse_scalar(&cell(v)),
                ]);
            }
        }
    }

    result
}

/// Best-effort scalar typing for a CSV cell.
fn parse_scalar(cell: &str) -> Value {
    if let Ok(i) = cell.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = cell.parse::<f64>() {
        return Value::from(f);
    }
    match cell {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(cell.to_string()),
    }
}

/// Split one CSV line, honoring double-quoted cells.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
        } else {
            match c {
                '"' => in_quotes = true,
                ',' => cells.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
    }
    cells.push(current);
    cells
}

/// Fluent flux pipeline builder.
///
/// Chaining consumes and returns the builder; `build` consumes it for good
/// and is pure string assembly. Field projection (`select`) is accepted for
/// interface parity and ignored, the dialect exposes no projection stage
/// here. The range stage always uses the fixed [`LOOKBACK`].
#[derive(Debug, Clone, Default)]
pub struct FluxQueryBuilder {
    bucket: String,
    filter: Option<String>,
    group_by: Vec<String>,
    sort: Option<(String, bool)>,
    limit: Option<u64>,
}

impl FluxQueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// No-op, see the type docs.
    pub fn select<I, F>(self, _fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self
    }

    /// Source bucket.
    pub fn from(mut self, source: impl Into<String>) -> Self {
        self.bucket = source.into();
        self
    }

    /// Row filter expression, e.g. `r._measurement == "battery"`.
    pub fn where_clause(mut self, condition: impl Into<String>) -> Self {
        self.filter = Some(condition.into());
        self
    }

    pub fn group_by<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.group_by = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sort by `field`, ascending when `ascending` is true.
    pub fn order_by(mut self, field: impl Into<String>, ascending: bool) -> Self {
        self.sort = Some((field.into(), ascending));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// Assemble the pipeline, consuming the builder.
    pub fn build(self) -> Query {
        let mut raw = format!("from(bucket:\"{}\") |> range(start:{})", self.bucket, LOOKBACK);
        if let Some(condition) = self.filter {
            raw.push_str(&format!(" |> filter(fn: (r) => {})", condition));
        }
        if !self.group_by.is_empty() {
            let columns: Vec<String> = self
                .group_by
                .iter()
                .map(|column| format!("\"{}\"", column))
                .collect();
            raw.push_str(&format!(" |> group(columns:[{}])", columns.join(", ")));
        }
        if let Some((field, ascending)) = self.sort {
            raw.push_str(&format!(
                " |> sort(columns:[\"{}\"], desc:{})",
                field, !ascending
            ));
        }
        if let Some(n) = self.limit {
            raw.push_str(&format!(" |> limit(n:{})", n));
        }

        Query {
            raw,
            args: Vec::new(),
        }
    }
}
