//! Export Layer
//!
//! Serializes one kind's batch and delivers it to exactly one sink. Three
//! interchangeable strategies behind the [`Sink`] dispatch surface:
//!
//! - [`RestSink`]: JSON envelope POSTed to a fixed per-kind route
//! - [`CsvSink`]: annotated-CSV rows appended to `<kind>.csv`
//! - [`LineProtocolSink`]: line-protocol lines appended to `<kind>.lp`
//!
//! Common contract: a single malformed record never aborts a batch; a
//! transport or file-open failure aborts the whole export call and is
//! reported upward. The caller decides whether to clear the batch, using
//! [`ExportError::retains_batch`] as the policy hook.

mod annotated_csv;
mod line_protocol;
mod rest;

use std::path::PathBuf;

use thiserror::Error;

use crate::config::SinkConfig;
use crate::telemetry::{Stamped, Telemetry};

pub use annotated_csv::CsvSink;
pub use line_protocol::LineProtocolSink;
pub use rest::RestSink;

pub(crate) use line_protocol::encode_line;

/// Errors that can occur during an export call.
#[derive(Debug, Error)]
pub enum ExportError {
    /// HTTP transport failure (connect, timeout, body read).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered outside the 2xx range.
    #[error("sink rejected batch with status {status}")]
    Rejected { status: u16 },

    /// File sink I/O failure.
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON encoding failure.
    #[error("json encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// The batch holds no records; nothing was written.
    #[error("nothing to export")]
    EmptyBatch,
}

impl ExportError {
    /// Whether the failed batch should be kept for the next cycle.
    ///
    /// Transport-class failures are retryable; format-class failures are not,
    /// there is nothing different to send next time.
    pub fn retains_batch(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Rejected { .. } | Self::Io { .. }
        )
    }
}

/// One configured export destination.
#[derive(Debug)]
pub enum Sink {
    Rest(RestSink),
    AnnotatedCsv(CsvSink),
    LineProtocol(LineProtocolSink),
}

impl Sink {
    /// Build the sink selected by configuration.
    pub fn from_config(config: &SinkConfig) -> Result<Self, ExportError> {
        match config {
            SinkConfig::Rest { host, timeout } => {
                Ok(Self::Rest(RestSink::new(host.clone(), *timeout)?))
            }
            SinkConfig::AnnotatedCsv { dir } => Ok(Self::AnnotatedCsv(CsvSink::new(dir.clone()))),
            SinkConfig::LineProtocol { dir } => {
                Ok(Self::LineProtocol(LineProtocolSink::new(dir.clone())))
            }
        }
    }

    /// Export one kind's records to this sink.
    pub async fn export<T: Telemetry>(&self, records: &[Stamped<T>]) -> Result<(), ExportError> {
        match self {
            Self::Rest(sink) => sink.export(records).await,
            Self::AnnotatedCsv(sink) => sink.export(records),
            Self::LineProtocol(sink) => sink.export(records),
        }
    }
}
