//! Tagged metric samples, the per-second bucketed registry, and the
//! collector task that owns it during a run.
mod collector;
mod histogram;
mod registry;
mod series;
mod tags;
mod types;

#[cfg(test)]
mod tests;

pub use collector::{
    AbortProbe, CollectorConfig, MetricsCollector, MetricsHandle, spawn_metrics_collector,
};
pub use histogram::TrendHistogram;
pub use registry::{Aggregate, MetricsRegistry, TrendAggregate, percentile_label};
pub use tags::{TagClause, TagFilter, TagSet};
pub use types::{
    MetricKind, MetricSample, MetricSummary, MetricsSnapshot, RunClock, SampleValue,
    SeriesSummary, Window,
};

/// Requests issued, one sample per request.
pub const HTTP_REQS: &str = "http_reqs";
/// Whether a request failed (transport error or unexpected status).
pub const HTTP_REQ_FAILED: &str = "http_req_failed";
/// Request duration in milliseconds.
pub const HTTP_REQ_DURATION: &str = "http_req_duration";
/// Check outcomes.
pub const CHECKS: &str = "checks";
/// Completed iterations.
pub const ITERATIONS: &str = "iterations";
/// Iteration duration in milliseconds.
pub const ITERATION_DURATION: &str = "iteration_duration";
/// Iterations cut short after the graceful stop window.
pub const ITERATIONS_INTERRUPTED: &str = "iterations_interrupted";

/// Metric names recorded by the driver, with their kinds.
pub const BUILTIN_METRICS: [(&str, MetricKind); 7] = [
    (HTTP_REQS, MetricKind::Counter),
    (HTTP_REQ_FAILED, MetricKind::Rate),
    (HTTP_REQ_DURATION, MetricKind::Trend),
    (CHECKS, MetricKind::Rate),
    (ITERATIONS, MetricKind::Counter),
    (ITERATION_DURATION, MetricKind::Trend),
    (ITERATIONS_INTERRUPTED, MetricKind::Counter),
];

/// Tag keys attached by the scenario executor.
pub mod tag_keys {
    pub const GROUP: &str = "group";
    pub const CHECK: &str = "check";
    pub const METHOD: &str = "method";
    pub const NAME: &str = "name";
    pub const STATUS: &str = "status";
    pub const ERROR: &str = "error";
}

/// Kind of a built-in metric, if `name` is one.
#[must_use]
pub fn builtin_kind(name: &str) -> Option<MetricKind> {
    BUILTIN_METRICS
        .iter()
        .find(|(builtin, _)| *builtin == name)
        .map(|(_, kind)| *kind)
}
