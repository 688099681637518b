//! Data source abstraction and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use super::records::{Battery, Kind, Metric, Pv, Setpoint, Status};

/// Errors returned by a [`DataSource`] lookup.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No object registered under the requested ref.
    #[error("no object registered for ref '{0}'")]
    NotFound(String),

    /// The ref resolves to a record of a different kind.
    #[error("object '{reference}' is a {actual}, expected {expected}")]
    KindMismatch {
        reference: String,
        expected: Kind,
        actual: Kind,
    },
}

/// A record handle of any kind, as handed out by a [`DataSource`].
#[derive(Debug, Clone)]
pub enum AnyRecord {
    Battery(Arc<Battery>),
    Metric(Arc<Metric>),
    Status(Arc<Status>),
    Setpoint(Arc<Setpoint>),
    Pv(Arc<Pv>),
}

impl AnyRecord {
    /// Kind of the wrapped record.
    pub fn kind(&self) -> Kind {
        match self {
            Self::Battery(_) => Kind::Battery,
            Self::Metric(_) => Kind::Metric,
            Self::Status(_) => Kind::Status,
            Self::Setpoint(_) => Kind::Setpoint,
            Self::Pv(_) => Kind::Pv,
        }
    }

    /// A zero-valued record of the given kind.
    pub fn default_of(kind: Kind) -> Self {
        match kind {
            Kind::Battery => Self::Battery(Arc::default()),
            Kind::Metric => Self::Metric(Arc::default()),
            Kind::Status => Self::Status(Arc::default()),
            Kind::Setpoint => Self::Setpoint(Arc::default()),
            Kind::Pv => Self::Pv(Arc::default()),
        }
    }
}

macro_rules! any_record_from {
    ($payload:ty, $variant:ident) => {
        impl From<$payload> for AnyRecord {
            fn from(record: $payload) -> Self {
                Self::$variant(Arc::new(record))
            }
        }

        impl From<Arc<$payload>> for AnyRecord {
            fn from(record: Arc<$payload>) -> Self {
                Self::$variant(record)
            }
        }
    };
}

any_record_from!(Battery, Battery);
any_record_from!(Metric, Metric);
any_record_from!(Status, Status);
any_record_from!(Setpoint, Setpoint);
any_record_from!(Pv, Pv);

macro_rules! kind_accessor {
    ($name:ident, $payload:ty, $variant:ident, $kind:expr) => {
        #[doc = concat!("Fetch the record for `reference` as a `", stringify!($payload), "`.")]
        fn $name(&self, reference: &str) -> Result<Arc<$payload>, SourceError> {
            match self.get(reference)? {
                AnyRecord::$variant(record) => Ok(record),
                other => Err(SourceError::KindMismatch {
                    reference: reference.to_string(),
                    expected: $kind,
                    actual: other.kind(),
                }),
            }
        }
    };
}

/// The external registry current record values are fetched from.
///
/// `get` resolves a ref to a record of any kind and doubles as the startup
/// validation probe; the kind-specific accessors additionally enforce the
/// configured kind.
pub trait DataSource: Send + Sync + 'static {
    /// Fetch the record for `reference`, whatever its kind.
    fn get(&self, reference: &str) -> Result<AnyRecord, SourceError>;

    kind_accessor!(battery, Battery, Battery, Kind::Battery);
    kind_accessor!(metric, Metric, Metric, Kind::Metric);
    kind_accessor!(status, Status, Status, Kind::Status);
    kind_accessor!(setpoint, Setpoint, Setpoint, Kind::Setpoint);
    kind_accessor!(pv, Pv, Pv, Kind::Pv);
}

/// In-memory [`DataSource`] keyed by ref.
///
/// Handles stay stable across lookups: fetching the same ref twice returns
/// the same instance, which is what batch dedup keys on.
#[derive(Debug, Default)]
pub struct MemorySource {
    objects: RwLock<HashMap<String, AnyRecord>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record under `reference`, replacing any previous entry.
    pub fn register(&self, reference: impl Into<String>, record: impl Into<AnyRecord>) {
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(reference.into(), record.into());
    }

    /// Register a zero-valued record of `kind` under `reference`.
    pub fn register_default(&self, reference: impl Into<String>, kind: Kind) {
        self.register(reference, AnyRecord::default_of(kind));
    }

    /// Number of registered objects.
    pub fn len(&self) -> usize {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DataSource for MemorySource {
    fn get(&self, reference: &str) -> Result<AnyRecord, SourceError> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(reference)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(reference.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_registered_record() {
        let source = MemorySource::new();
        source.register("ess.bat.1", Battery { soc: 80.0, ..Battery::default() });

        let record = source.get("ess.bat.1").unwrap();
        assert_eq!(record.kind(), Kind::Battery);
    }

    #[test]
    fn test_get_unknown_ref() {
        let source = MemorySource::new();
        let err = source.get("missing").unwrap_err();
        assert!(matches!(err, SourceError::NotFound(_)));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_kind_accessor_enforces_kind() {
        let source = MemorySource::new();
        source.register("m.1", Metric { value: 3.0 });

        assert!(source.metric("m.1").is_ok());
        let err = source.battery("m.1").unwrap_err();
        assert!(matches!(
            err,
            SourceError::KindMismatch {
                expected: Kind::Battery,
                actual: Kind::Metric,
                ..
            }
        ));
    }

    #[test]
    fn test_handles_are_stable() {
        let source = MemorySource::new();
        source.register_default("pv.1", Kind::Pv);

        let first = source.pv("pv.1").unwrap();
        let second = source.pv("pv.1").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_register_replaces_handle() {
        let source = MemorySource::new();
        source.register("pv.1", Pv::default());
        let first = source.pv("pv.1").unwrap();

        source.register("pv.1", Pv { power: 5.0, energy: 1.0 });
        let second = source.pv("pv.1").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.power, 5.0);
    }
}
