use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::metrics::{
    CHECKS, HTTP_REQ_DURATION, HTTP_REQ_FAILED, HTTP_REQS, MetricSummary, MetricsSnapshot,
};

/// Logs one line per published snapshot until the collector stops.
pub(crate) fn spawn_progress_logger(
    mut snapshots: watch::Receiver<MetricsSnapshot>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let line = progress_line(&snapshots.borrow_and_update());
            debug!("{}", line);
        }
    })
}

pub(crate) fn progress_line(snapshot: &MetricsSnapshot) -> String {
    let mut parts = vec![format!("elapsed {:.1}s", snapshot.elapsed_ms as f64 / 1000.0)];
    if let Some(MetricSummary::Counter { count, rate }) = snapshot.get(HTTP_REQS) {
        parts.push(format!("reqs {} ({:.1}/s)", count, rate));
    }
    if let Some(MetricSummary::Rate { rate, .. }) = snapshot.get(HTTP_REQ_FAILED) {
        parts.push(format!("failed {:.2}%", rate * 100.0));
    }
    if let Some(MetricSummary::Trend { med, max, .. }) = snapshot.get(HTTP_REQ_DURATION) {
        parts.push(format!("med {:.1}ms max {:.1}ms", med, max));
    }
    if let Some(MetricSummary::Rate { rate, .. }) = snapshot.get(CHECKS) {
        parts.push(format!("checks {:.2}%", rate * 100.0));
    }
    parts.join(" | ")
}
