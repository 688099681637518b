//! Per-kind batch stores.

use crate::telemetry::{Battery, Metric, Pv, Setpoint, Stamped, Status};

/// Ordered, duplicate-free store of not-yet-exported records of one kind.
///
/// Duplicate suppression is reference-identity based: a record fetched as
/// the same shared handle is inserted at most once, however many collection
/// passes see it. Two handles with equal values are still distinct entries.
///
/// The store is bounded; when full, the oldest entry is dropped to make
/// room. With a source that hands out stable handles the bound is never
/// reached, growth is capped by the configured-object count.
#[derive(Debug)]
pub struct Batch<T> {
    entries: Vec<Stamped<T>>,
    max_pending: usize,
}

impl<T> Batch<T> {
    pub fn new(max_pending: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_pending,
        }
    }

    /// Insert unless a reference-identical entry is already present.
    ///
    /// Returns `true` when the record was inserted.
    pub fn push(&mut self, stamped: Stamped<T>) -> bool {
        if self
            .entries
            .iter()
            .any(|entry| entry.shares_handle(stamped.handle()))
        {
            return false;
        }

        if self.entries.len() >= self.max_pending {
            tracing::warn!(
                max_pending = self.max_pending,
                "batch is full, dropping oldest entry"
            );
            self.entries.remove(0);
        }

        self.entries.push(stamped);
        true
    }

    /// The pending records, oldest first.
    pub fn records(&self) -> &[Stamped<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all pending records.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// The five per-kind batches of one pipeline instance.
///
/// Kinds never share a store; retain-on-failure decisions are taken per
/// kind and leave the others untouched.
#[derive(Debug)]
pub struct BatchSet {
    pub battery: Batch<Battery>,
    pub metric: Batch<Metric>,
    pub status: Batch<Status>,
    pub setpoint: Batch<Setpoint>,
    pub pv: Batch<Pv>,
}

impl BatchSet {
    pub fn new(max_pending: usize) -> Self {
        Self {
            battery: Batch::new(max_pending),
            metric: Batch::new(max_pending),
            status: Batch::new(max_pending),
            setpoint: Batch::new(max_pending),
            pv: Batch::new(max_pending),
        }
    }

    /// Total pending records across all kinds.
    pub fn total_len(&self) -> usize {
        self.battery.len()
            + self.metric.len()
            + self.status.len()
            + self.setpoint.len()
            + self.pv.len()
    }
}
