//! Fixed-period collect/export loop.

use std::time::{Duration, Instant};

use tokio::sync::watch;

use crate::export::Sink;
use crate::telemetry::{DataSource, Telemetry};

use super::batch::{Batch, BatchSet};
use super::collector::Collector;

/// Drives the pipeline: collect, export each kind, sleep, repeat.
///
/// Kinds are exported sequentially and in isolation; one kind failing never
/// blocks the others in the same cycle. The loop runs until the shutdown
/// channel flips to `true` (or its sender is dropped), checked at the top of
/// each cycle and during the sleep.
pub struct Scheduler<S> {
    collector: Collector<S>,
    sink: Sink,
    period: Duration,
    batches: BatchSet,
}

impl<S: DataSource> Scheduler<S> {
    pub fn new(collector: Collector<S>, sink: Sink, period: Duration, max_pending: usize) -> Self {
        Self {
            collector,
            sink,
            period,
            batches: BatchSet::new(max_pending),
        }
    }

    /// The pending batches, mainly for inspection in tests.
    pub fn batches(&self) -> &BatchSet {
        &self.batches
    }

    /// Run one collect/export cycle.
    pub async fn run_cycle(&mut self) {
        let start = Instant::now();

        let stats = self.collector.collect_into(&mut self.batches);
        tracing::debug!(
            collected = stats.collected,
            duplicates = stats.duplicates,
            failed = stats.failed,
            "collection pass finished"
        );

        export_kind(&self.sink, &mut self.batches.battery).await;
        export_kind(&self.sink, &mut self.batches.metric).await;
        export_kind(&self.sink, &mut self.batches.status).await;
        export_kind(&self.sink, &mut self.batches.setpoint).await;
        export_kind(&self.sink, &mut self.batches.pv).await;

        tracing::debug!(
            duration_ms = start.elapsed().as_millis() as u64,
            pending = self.batches.total_len(),
            "cycle complete"
        );
    }

    /// Run cycles until shutdown is requested.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(period = ?self.period, "scheduler started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.run_cycle().await;

            tokio::select! {
                _ = tokio::time::sleep(self.period) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("scheduler stopped");
    }
}

/// Export one kind's batch and apply the clear/retain policy.
async fn export_kind<T: Telemetry>(sink: &Sink, batch: &mut Batch<T>) {
    if batch.is_empty() {
        tracing::debug!(kind = %T::KIND, "no data to send");
        return;
    }

    let pending = batch.len();
    tracing::debug!(kind = %T::KIND, records = pending, "sending data");

    match sink.export(batch.records()).await {
        Ok(()) => {
            tracing::info!(kind = %T::KIND, records = pending, "batch exported");
            batch.clear();
        }
        Err(error) if error.retains_batch() => {
            tracing::error!(kind = %T::KIND, records = pending, error = %error, "export failed, batch retained");
        }
        Err(error) => {
            tracing::warn!(kind = %T::KIND, records = pending, error = %error, "export failed, batch dropped");
            batch.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ObjectConfig;
    use crate::export::CsvSink;
    use crate::telemetry::{Kind, MemorySource, Metric};
    use std::sync::Arc;

    fn csv_scheduler(dir: &std::path::Path) -> Scheduler<MemorySource> {
        let source = Arc::new(MemorySource::new());
        source.register("m.1", Metric { value: 1.5 });

        let collector = Collector::new(
            source,
            1,
            vec![ObjectConfig {
                reference: "m.1".to_string(),
                kind: Kind::Metric,
                source: 1,
                name: "m1".to_string(),
            }],
        );
        Scheduler::new(
            collector,
            Sink::AnnotatedCsv(CsvSink::new(dir)),
            Duration::from_millis(10),
            100,
        )
    }

    #[tokio::test]
    async fn test_cycle_exports_and_clears() {
        let dir = tempfile::tempdir().unwrap();
        let mut scheduler = csv_scheduler(dir.path());

        scheduler.run_cycle().await;
        assert_eq!(scheduler.batches().total_len(), 0);

        let content = std::fs::read_to_string(dir.path().join("metric.csv")).unwrap();
        assert_eq!(content.lines().count(), 5);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let scheduler = csv_scheduler(dir.path());

        let (tx, rx) = watch::channel(false);
        let handle = tokio::spawn(scheduler.run(rx));

        tokio::time::sleep(Duration::from_millis(30)).await;
        tx.send(true).unwrap();

        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();
    }
}
