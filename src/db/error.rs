//! Driver error types.

use thiserror::Error;

use super::factory::DriverKind;

/// Errors returned by the driver layer.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The configuration payload does not match the declared driver type.
    #[error("configuration payload does not match driver type '{kind}'")]
    ConfigMismatch { kind: DriverKind },

    /// The operation is not part of this backend's capability set.
    #[error("operation '{op}' is not supported by the '{kind}' driver")]
    Unsupported {
        op: &'static str,
        kind: DriverKind,
    },

    /// `connect` has not been called (or `close` already was).
    #[error("driver is not connected")]
    NotConnected,

    /// Relational backend error (sqlx).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Time-series backend transport error.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend answered outside the 2xx range.
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },

    /// A write point with no fields cannot be rendered.
    #[error("point has no fields")]
    EmptyPoint,
}
