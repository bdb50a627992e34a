use std::time::Duration;

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, warn};

use crate::error::{AppResult, MetricsError};
use crate::shutdown::ShutdownSender;

use super::{MetricSample, MetricsRegistry, MetricsSnapshot, RunClock};

/// Predicate run against the live registry every progress tick. Returning
/// `true` stops the run.
pub type AbortProbe = Box<dyn FnMut(&MetricsRegistry) -> bool + Send>;

#[derive(Debug, Clone)]
pub struct CollectorConfig {
    pub progress_interval: Duration,
    pub percentiles: Vec<f64>,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            progress_interval: Duration::from_secs(1),
            percentiles: Vec::new(),
        }
    }
}

/// Cloneable write side of the collector.
#[derive(Debug, Clone)]
pub struct MetricsHandle {
    tx: mpsc::UnboundedSender<Vec<MetricSample>>,
    clock: RunClock,
}

impl MetricsHandle {
    #[must_use]
    pub const fn clock(&self) -> RunClock {
        self.clock
    }

    /// Time since run start, used to stamp samples.
    #[must_use]
    pub fn offset(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Hands a finished batch to the collector.
    ///
    /// # Errors
    ///
    /// Returns an error if the collector task is gone.
    pub fn submit(&self, batch: Vec<MetricSample>) -> Result<(), MetricsError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.tx
            .send(batch)
            .map_err(|_closed| MetricsError::CollectorClosed)
    }
}

/// Running collector task plus its read side.
#[derive(Debug)]
pub struct MetricsCollector {
    handle: MetricsHandle,
    snapshots: watch::Receiver<MetricsSnapshot>,
    task: JoinHandle<MetricsRegistry>,
}

impl MetricsCollector {
    #[must_use]
    pub fn handle(&self) -> MetricsHandle {
        self.handle.clone()
    }

    /// Live snapshots published every progress interval.
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<MetricsSnapshot> {
        self.snapshots.clone()
    }

    /// Waits for every outstanding handle to drop, then returns the registry
    /// sealed at `elapsed`.
    ///
    /// # Errors
    ///
    /// Returns an error if the collector task panicked.
    pub async fn finish(self, elapsed: Duration) -> AppResult<MetricsRegistry> {
        let MetricsCollector { handle, task, .. } = self;
        drop(handle);
        let mut registry = task.await?;
        registry.seal(elapsed);
        Ok(registry)
    }
}

#[must_use]
pub fn spawn_metrics_collector(
    config: &CollectorConfig,
    clock: RunClock,
    shutdown_tx: &ShutdownSender,
    abort_probe: Option<AbortProbe>,
) -> MetricsCollector {
    let (tx, mut rx) = mpsc::unbounded_channel::<Vec<MetricSample>>();
    let registry = MetricsRegistry::new().with_percentiles(config.percentiles.clone());
    let initial = registry.snapshot().unwrap_or_else(|_err| MetricsSnapshot {
        elapsed_ms: 0,
        metrics: std::collections::BTreeMap::new(),
    });
    let (snapshot_tx, snapshot_rx) = watch::channel(initial);
    let shutdown_tx = shutdown_tx.clone();
    let progress_interval = config.progress_interval.max(Duration::from_millis(10));

    let task = tokio::spawn(async move {
        let mut registry = registry;
        let mut abort_probe = abort_probe;
        let mut progress = tokio::time::interval(progress_interval);
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut dropped_records = 0u64;

        loop {
            tokio::select! {
                maybe_batch = rx.recv() => {
                    let Some(batch) = maybe_batch else {
                        break;
                    };
                    for sample in batch {
                        if let Err(err) = registry.record(sample) {
                            dropped_records = dropped_records.saturating_add(1);
                            debug!("Failed to record sample: {}", err);
                        }
                    }
                },
                _ = progress.tick() => {
                    publish(&registry, &snapshot_tx);
                    if let Some(probe) = abort_probe.as_mut()
                        && probe(&registry)
                    {
                        warn!("Abort-on-fail threshold crossed; stopping the run.");
                        drop(shutdown_tx.send(()));
                        abort_probe = None;
                    }
                },
            }
        }

        if dropped_records > 0 {
            warn!("{} metric samples could not be recorded.", dropped_records);
        }
        publish(&registry, &snapshot_tx);
        registry
    });

    MetricsCollector {
        handle: MetricsHandle { tx, clock },
        snapshots: snapshot_rx,
        task,
    }
}

fn publish(registry: &MetricsRegistry, snapshot_tx: &watch::Sender<MetricsSnapshot>) {
    match registry.snapshot() {
        Ok(snapshot) => drop(snapshot_tx.send_replace(snapshot)),
        Err(err) => debug!("Failed to build live snapshot: {}", err),
    }
}
