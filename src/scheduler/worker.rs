use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::metrics::MetricsHandle;
use crate::scenario::{IterationContext, ScenarioExecutor};

/// Pause between iterations: `base` plus uniform jitter in `[0, jitter]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThinkTime {
    pub base: Duration,
    pub jitter: Duration,
}

impl ThinkTime {
    #[must_use]
    pub fn sample(&self) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.base;
        }
        let extra = rand::thread_rng().gen_range(0..=jitter_ms);
        self.base.saturating_add(Duration::from_millis(extra))
    }
}

/// Scheduler-side handle of one virtual user. Whether it is running or
/// stopping is tracked by the pool list holding it.
#[derive(Debug)]
pub(super) struct VirtualUser {
    id: u64,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl VirtualUser {
    pub(super) fn spawn(
        id: u64,
        executor: ScenarioExecutor,
        metrics: MetricsHandle,
        think: ThinkTime,
    ) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_vu(id, executor, metrics, think, stop_rx));
        Self {
            id,
            stop_tx,
            task,
        }
    }

    /// Asks the VU to exit after its current iteration.
    pub(super) fn stop(&self) {
        drop(self.stop_tx.send(true));
    }

    pub(super) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits until `deadline` for the VU to exit. Returns `false` if it had
    /// to be aborted mid-iteration.
    pub(super) async fn join_until(self, deadline: tokio::time::Instant) -> bool {
        let VirtualUser { id, mut task, .. } = self;
        match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(Ok(iterations)) => {
                debug!("VU {} exited after {} iterations", id, iterations);
                true
            }
            Ok(Err(err)) => {
                warn!("VU {} task failed: {}", id, err);
                true
            }
            Err(_elapsed) => {
                task.abort();
                false
            }
        }
    }
}

/// Iteration loop of one VU. The stop flag is only checked between
/// iterations and while thinking, so a started iteration always completes.
async fn run_vu(
    id: u64,
    executor: ScenarioExecutor,
    metrics: MetricsHandle,
    think: ThinkTime,
    mut stop_rx: watch::Receiver<bool>,
) -> u64 {
    let mut iteration: u64 = 0;
    loop {
        if *stop_rx.borrow() {
            break;
        }
        let ctx = IterationContext { vu: id, iteration };
        let batch = executor.run_iteration(ctx, metrics.clock()).await;
        if let Err(err) = metrics.submit(batch) {
            warn!("VU {} stopping: {}", id, err);
            break;
        }
        iteration = iteration.saturating_add(1);

        let pause = think.sample();
        if pause.is_zero() {
            tokio::task::yield_now().await;
            continue;
        }
        tokio::select! {
            () = tokio::time::sleep(pause) => {},
            changed = stop_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            },
        }
    }
    iteration
}
