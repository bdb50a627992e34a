use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::TagSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// Monotonic sum of non-negative amounts.
    Counter,
    /// Fraction of true observations.
    Rate,
    /// Distribution of numeric values.
    Trend,
}

impl MetricKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricKind::Counter => "counter",
            MetricKind::Rate => "rate",
            MetricKind::Trend => "trend",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleValue {
    Count(u64),
    Flag(bool),
    Value(f64),
}

/// A single recorded observation. `offset` is monotonic time since run start.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub tags: TagSet,
    pub value: SampleValue,
    pub offset: Duration,
}

impl MetricSample {
    #[must_use]
    pub fn count(name: &str, tags: TagSet, amount: u64, offset: Duration) -> Self {
        Self {
            name: name.to_owned(),
            tags,
            value: SampleValue::Count(amount),
            offset,
        }
    }

    #[must_use]
    pub fn flag(name: &str, tags: TagSet, value: bool, offset: Duration) -> Self {
        Self {
            name: name.to_owned(),
            tags,
            value: SampleValue::Flag(value),
            offset,
        }
    }

    #[must_use]
    pub fn value(name: &str, tags: TagSet, value: f64, offset: Duration) -> Self {
        Self {
            name: name.to_owned(),
            tags,
            value: SampleValue::Value(value),
            offset,
        }
    }
}

/// Monotonic run clock shared by every component that stamps samples.
#[derive(Debug, Clone, Copy)]
pub struct RunClock {
    started: Instant,
}

impl RunClock {
    #[must_use]
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

/// Time span a threshold or query aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Window {
    #[default]
    Whole,
    Last(Duration),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MetricSummary {
    Counter {
        count: u64,
        rate: f64,
    },
    Rate {
        trues: u64,
        total: u64,
        rate: f64,
    },
    Trend {
        count: u64,
        avg: f64,
        min: f64,
        med: f64,
        max: f64,
        percentiles: BTreeMap<String, f64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub tags: TagSet,
    pub summary: MetricSummary,
}

/// Aggregated, point-in-time view of the registry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub elapsed_ms: u64,
    pub metrics: BTreeMap<String, MetricSummary>,
}

impl MetricsSnapshot {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&MetricSummary> {
        self.metrics.get(name)
    }
}
