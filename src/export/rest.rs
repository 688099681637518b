//! REST-JSON sink.
//!
//! Wraps the batch as `{"objects": [...]}` and POSTs it to the fixed
//! per-kind route under the configured host.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Serialize;

use crate::telemetry::{Stamped, Telemetry};

use super::ExportError;

/// JSON envelope for one batch.
#[derive(Serialize)]
struct Envelope<'a, T> {
    objects: &'a [Stamped<T>],
}

/// REST-JSON sink.
#[derive(Debug)]
pub struct RestSink {
    client: Client,
    host: String,
}

impl RestSink {
    /// Build a sink with a bounded request timeout.
    ///
    /// # Errors
    /// Returns `ExportError::Http` if the HTTP client cannot be built.
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self, ExportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            host: host.into(),
        })
    }

    /// POST the batch to the kind's route.
    ///
    /// Any 2xx answer counts as delivered; anything else is reported as
    /// `Rejected` so the caller keeps the batch for the next cycle.
    pub async fn export<T: Telemetry>(&self, records: &[Stamped<T>]) -> Result<(), ExportError> {
        if records.is_empty() {
            return Err(ExportError::EmptyBatch);
        }

        // Encode first so serialization failures stay distinguishable from
        // transport failures.
        let body = serde_json::to_vec(&Envelope { objects: records })?;
        let url = format!("{}{}", self.host, T::KIND.rest_path());

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(kind = %T::KIND, records = records.len(), status = status.as_u16(), "batch delivered");
            Ok(())
        } else {
            Err(ExportError::Rejected {
                status: status.as_u16(),
            })
        }
    }
}
