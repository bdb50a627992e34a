use serde::Serialize;
use tracing::warn;

use crate::error::MetricsError;
use crate::metrics::{Aggregate, AbortProbe, MetricsRegistry, Window};

use super::{Aggregation, Threshold};

/// Result of evaluating one threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdOutcome {
    pub metric: String,
    pub filter: String,
    pub expression: String,
    /// `None` when no sample matched; the threshold then passes.
    pub observed: Option<f64>,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window_secs: Option<f64>,
    pub abort_on_fail: bool,
}

impl ThresholdOutcome {
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}{}", self.metric, self.filter)
    }
}

/// Evaluates one threshold against the registry.
///
/// # Errors
///
/// Returns an error if the registry cannot aggregate the selection.
pub fn evaluate(
    threshold: &Threshold,
    registry: &MetricsRegistry,
) -> Result<ThresholdOutcome, MetricsError> {
    let aggregate = registry.aggregate(
        &threshold.key.metric,
        &threshold.key.filter,
        threshold.window,
    )?;
    let observed = aggregate
        .as_ref()
        .and_then(|aggregate| observe(aggregate, threshold.expression.aggregation));
    let passed = observed.is_none_or(|value| {
        threshold
            .expression
            .comparison
            .holds(value, threshold.expression.bound)
    });
    Ok(ThresholdOutcome {
        metric: threshold.key.metric.clone(),
        filter: threshold.key.filter.to_string(),
        expression: threshold.expression.to_string(),
        observed,
        passed,
        window_secs: match threshold.window {
            Window::Whole => None,
            Window::Last(span) => Some(span.as_secs_f64()),
        },
        abort_on_fail: threshold.abort_on_fail,
    })
}

/// Evaluates every threshold, keeping input order.
///
/// # Errors
///
/// Returns an error if any selection cannot be aggregated.
pub fn evaluate_all(
    thresholds: &[Threshold],
    registry: &MetricsRegistry,
) -> Result<Vec<ThresholdOutcome>, MetricsError> {
    thresholds
        .iter()
        .map(|threshold| evaluate(threshold, registry))
        .collect()
}

/// Overall verdict: every threshold passed.
#[must_use]
pub fn all_passed(outcomes: &[ThresholdOutcome]) -> bool {
    outcomes.iter().all(|outcome| outcome.passed)
}

/// Probe for the collector that fires once any abort-on-fail threshold fails.
/// Returns `None` when no threshold asks for it.
#[must_use]
pub fn abort_probe(thresholds: &[Threshold]) -> Option<AbortProbe> {
    let watched: Vec<Threshold> = thresholds
        .iter()
        .filter(|threshold| threshold.abort_on_fail)
        .cloned()
        .collect();
    if watched.is_empty() {
        return None;
    }
    Some(Box::new(move |registry: &MetricsRegistry| {
        watched.iter().any(|threshold| match evaluate(threshold, registry) {
            Ok(outcome) if !outcome.passed => {
                warn!(
                    "Threshold {} {} failed with {:?}",
                    outcome.key(),
                    outcome.expression,
                    outcome.observed
                );
                true
            }
            Ok(_) | Err(_) => false,
        })
    }))
}

fn observe(aggregate: &Aggregate, aggregation: Aggregation) -> Option<f64> {
    match (aggregate, aggregation) {
        (Aggregate::Counter { count, .. }, Aggregation::Count) => Some(*count as f64),
        (Aggregate::Counter { .. } | Aggregate::Rate { .. }, Aggregation::Rate) => {
            aggregate.rate()
        }
        (Aggregate::Trend(trend), Aggregation::Count) => Some(trend.count() as f64),
        (Aggregate::Trend(trend), Aggregation::Avg) => Some(trend.avg()),
        (Aggregate::Trend(trend), Aggregation::Min) => Some(trend.min()),
        (Aggregate::Trend(trend), Aggregation::Max) => Some(trend.max()),
        (Aggregate::Trend(trend), Aggregation::Med) => Some(trend.med()),
        (Aggregate::Trend(trend), Aggregation::Percentile(percent)) => {
            Some(trend.percentile(percent))
        }
        (Aggregate::Rate { total, .. }, Aggregation::Count) => Some(*total as f64),
        (
            Aggregate::Counter { .. } | Aggregate::Rate { .. },
            Aggregation::Avg
            | Aggregation::Min
            | Aggregation::Max
            | Aggregation::Med
            | Aggregation::Percentile(_),
        )
        | (Aggregate::Trend(_), Aggregation::Rate) => None,
    }
}
