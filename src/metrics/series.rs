use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::MetricsError;

use super::{MetricKind, TrendHistogram, Window};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct RateBucket {
    pub trues: u64,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub(crate) struct TrendBucket {
    pub hist: TrendHistogram,
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

impl TrendBucket {
    fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            hist: TrendHistogram::new()?,
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        })
    }

    fn record(&mut self, value: f64) -> Result<(), MetricsError> {
        let value = if value.is_finite() { value.max(0.0) } else { 0.0 };
        self.hist.record(value)?;
        self.count = self.count.saturating_add(1);
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        Ok(())
    }
}

/// Samples of one (metric, tag set) pair, bucketed by whole second of run time.
#[derive(Debug, Clone)]
pub(crate) enum Series {
    Counter(BTreeMap<u64, u64>),
    Rate(BTreeMap<u64, RateBucket>),
    Trend(BTreeMap<u64, TrendBucket>),
}

impl Series {
    pub(crate) const fn new(kind: MetricKind) -> Self {
        match kind {
            MetricKind::Counter => Series::Counter(BTreeMap::new()),
            MetricKind::Rate => Series::Rate(BTreeMap::new()),
            MetricKind::Trend => Series::Trend(BTreeMap::new()),
        }
    }

    pub(crate) fn add_count(&mut self, offset: Duration, amount: u64) {
        if let Series::Counter(buckets) = self {
            let slot = buckets.entry(bucket_index(offset)).or_insert(0);
            *slot = slot.saturating_add(amount);
        }
    }

    pub(crate) fn add_flag(&mut self, offset: Duration, value: bool) {
        if let Series::Rate(buckets) = self {
            let slot = buckets.entry(bucket_index(offset)).or_default();
            slot.total = slot.total.saturating_add(1);
            if value {
                slot.trues = slot.trues.saturating_add(1);
            }
        }
    }

    pub(crate) fn add_value(&mut self, offset: Duration, value: f64) -> Result<(), MetricsError> {
        if let Series::Trend(buckets) = self {
            let index = bucket_index(offset);
            let slot = match buckets.entry(index) {
                std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
                std::collections::btree_map::Entry::Vacant(entry) => {
                    entry.insert(TrendBucket::new()?)
                }
            };
            slot.record(value)?;
        }
        Ok(())
    }
}

/// First bucket index covered by `window` when the run has lasted `elapsed`.
pub(crate) fn first_bucket(window: Window, elapsed: Duration) -> u64 {
    match window {
        Window::Whole => 0,
        Window::Last(span) => bucket_index(elapsed.saturating_sub(span)),
    }
}

pub(crate) const fn bucket_index(offset: Duration) -> u64 {
    offset.as_secs()
}
