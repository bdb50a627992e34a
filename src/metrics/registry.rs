use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::MetricsError;

use super::series::{Series, first_bucket};
use super::{
    BUILTIN_METRICS, CHECKS, MetricKind, MetricSample, MetricSummary, MetricsSnapshot,
    SampleValue, SeriesSummary, TagFilter, TagSet, TrendHistogram, Window, tag_keys,
};

const DEFAULT_PERCENTILES: [f64; 3] = [50.0, 95.0, 99.0];

/// Merged trend values over a set of series and buckets.
#[derive(Debug, Clone)]
pub struct TrendAggregate {
    hist: TrendHistogram,
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
}

impl TrendAggregate {
    fn new() -> Result<Self, MetricsError> {
        Ok(Self {
            hist: TrendHistogram::new()?,
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        })
    }

    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn avg(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    #[must_use]
    pub fn min(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.min }
    }

    #[must_use]
    pub fn max(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.max }
    }

    #[must_use]
    pub fn med(&self) -> f64 {
        self.percentile(50.0)
    }

    /// Percentile in the recorded unit; exact min/max at the extremes.
    #[must_use]
    pub fn percentile(&self, percent: f64) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        if percent <= 0.0 {
            return self.min;
        }
        if percent >= 100.0 {
            return self.max;
        }
        self.hist.percentile(percent).clamp(self.min, self.max)
    }
}

/// Aggregate of all samples selected by a metric name, tag filter and window.
#[derive(Debug, Clone)]
pub enum Aggregate {
    Counter { count: u64, elapsed: Duration },
    Rate { trues: u64, total: u64 },
    Trend(TrendAggregate),
}

impl Aggregate {
    /// Counter: per-second rate; rate metric: fraction of trues.
    #[must_use]
    pub fn rate(&self) -> Option<f64> {
        match self {
            Aggregate::Counter { count, elapsed } => Some(per_second(*count, *elapsed)),
            Aggregate::Rate { trues, total } => Some(fraction(*trues, *total)),
            Aggregate::Trend(_) => None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MetricKind {
        match self {
            Aggregate::Counter { .. } => MetricKind::Counter,
            Aggregate::Rate { .. } => MetricKind::Rate,
            Aggregate::Trend(_) => MetricKind::Trend,
        }
    }

    fn summarize(&self, percentiles: &[f64]) -> MetricSummary {
        match self {
            Aggregate::Counter { count, elapsed } => MetricSummary::Counter {
                count: *count,
                rate: per_second(*count, *elapsed),
            },
            Aggregate::Rate { trues, total } => MetricSummary::Rate {
                trues: *trues,
                total: *total,
                rate: fraction(*trues, *total),
            },
            Aggregate::Trend(trend) => MetricSummary::Trend {
                count: trend.count(),
                avg: trend.avg(),
                min: trend.min(),
                med: trend.med(),
                max: trend.max(),
                percentiles: percentiles
                    .iter()
                    .map(|percent| (percentile_label(*percent), trend.percentile(*percent)))
                    .collect(),
            },
        }
    }
}

/// Tagged metric store. Owned by exactly one task during a run.
#[derive(Debug, Clone)]
pub struct MetricsRegistry {
    kinds: BTreeMap<String, MetricKind>,
    series: BTreeMap<String, BTreeMap<TagSet, Series>>,
    percentiles: Vec<f64>,
    latest: Duration,
    sealed: Option<Duration>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    /// Registry with every built-in metric declared.
    #[must_use]
    pub fn new() -> Self {
        let kinds = BUILTIN_METRICS
            .iter()
            .map(|(name, kind)| ((*name).to_owned(), *kind))
            .collect();
        Self {
            kinds,
            series: BTreeMap::new(),
            percentiles: DEFAULT_PERCENTILES.to_vec(),
            latest: Duration::ZERO,
            sealed: None,
        }
    }

    #[must_use]
    pub fn with_percentiles(mut self, percentiles: Vec<f64>) -> Self {
        if !percentiles.is_empty() {
            self.percentiles = percentiles;
        }
        self
    }

    /// Declares a custom metric. Returns the kind already registered under
    /// `name` when it differs.
    pub fn declare(&mut self, name: &str, kind: MetricKind) -> Option<MetricKind> {
        match self.kinds.get(name) {
            Some(existing) if *existing != kind => Some(*existing),
            Some(_) => None,
            None => {
                self.kinds.insert(name.to_owned(), kind);
                None
            }
        }
    }

    #[must_use]
    pub fn kind_of(&self, name: &str) -> Option<MetricKind> {
        self.kinds.get(name).copied()
    }

    #[must_use]
    pub fn percentiles(&self) -> &[f64] {
        &self.percentiles
    }

    /// Folds one sample into its series. Undeclared metrics take the kind
    /// implied by the sample value.
    ///
    /// # Errors
    ///
    /// Returns an error if a trend bucket cannot be allocated.
    pub fn record(&mut self, sample: MetricSample) -> Result<(), MetricsError> {
        let MetricSample {
            name,
            tags,
            value,
            offset,
        } = sample;
        let kind = match self.kinds.get(&name) {
            Some(kind) => *kind,
            None => {
                let kind = implied_kind(value);
                self.kinds.insert(name.clone(), kind);
                kind
            }
        };
        if offset > self.latest {
            self.latest = offset;
        }
        let series = self
            .series
            .entry(name)
            .or_default()
            .entry(tags)
            .or_insert_with(|| Series::new(kind));
        match (kind, value) {
            (MetricKind::Counter, SampleValue::Count(amount)) => series.add_count(offset, amount),
            (MetricKind::Counter, SampleValue::Flag(flag)) => {
                series.add_count(offset, u64::from(flag));
            }
            (MetricKind::Counter, SampleValue::Value(amount)) => {
                series.add_count(offset, whole_amount(amount));
            }
            (MetricKind::Rate, SampleValue::Count(amount)) => series.add_flag(offset, amount > 0),
            (MetricKind::Rate, SampleValue::Flag(flag)) => series.add_flag(offset, flag),
            (MetricKind::Rate, SampleValue::Value(amount)) => series.add_flag(offset, amount > 0.0),
            (MetricKind::Trend, SampleValue::Count(amount)) => {
                series.add_value(offset, amount as f64)?;
            }
            (MetricKind::Trend, SampleValue::Flag(flag)) => {
                series.add_value(offset, f64::from(u8::from(flag)))?;
            }
            (MetricKind::Trend, SampleValue::Value(amount)) => series.add_value(offset, amount)?,
        }
        Ok(())
    }

    /// Adds `amount` to a counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample cannot be recorded.
    pub fn increment(
        &mut self,
        name: &str,
        tags: TagSet,
        amount: u64,
        offset: Duration,
    ) -> Result<(), MetricsError> {
        self.record(MetricSample::count(name, tags, amount, offset))
    }

    /// Records a trend value, or a rate observation (positive = true) when
    /// `name` is a rate metric.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample cannot be recorded.
    pub fn observe(
        &mut self,
        name: &str,
        tags: TagSet,
        value: f64,
        offset: Duration,
    ) -> Result<(), MetricsError> {
        self.record(MetricSample::value(name, tags, value, offset))
    }

    /// Records one check outcome into `checks`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sample cannot be recorded.
    pub fn add_check(
        &mut self,
        check: &str,
        mut tags: TagSet,
        passed: bool,
        offset: Duration,
    ) -> Result<(), MetricsError> {
        tags.insert(tag_keys::CHECK, check);
        self.record(MetricSample::flag(CHECKS, tags, passed, offset))
    }

    /// Fixes the run length used by snapshots and windows.
    pub fn seal(&mut self, elapsed: Duration) {
        self.sealed = Some(elapsed.max(self.latest));
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.sealed.unwrap_or(self.latest)
    }

    /// Merges every series of `name` matching `filter` over `window`.
    /// Returns `None` when no sample matches.
    ///
    /// # Errors
    ///
    /// Returns an error if trend histograms cannot be merged.
    pub fn aggregate(
        &self,
        name: &str,
        filter: &TagFilter,
        window: Window,
    ) -> Result<Option<Aggregate>, MetricsError> {
        let Some(kind) = self.kind_of(name) else {
            return Ok(None);
        };
        let Some(by_tags) = self.series.get(name) else {
            return Ok(None);
        };
        let selected = by_tags
            .iter()
            .filter(|(tags, _)| filter.matches(tags))
            .map(|(_, series)| series);
        self.merge(kind, selected, window)
    }

    /// Aggregates for every metric with at least one sample.
    ///
    /// # Errors
    ///
    /// Returns an error if trend histograms cannot be merged.
    pub fn snapshot(&self) -> Result<MetricsSnapshot, MetricsError> {
        let mut metrics = BTreeMap::new();
        for (name, by_tags) in &self.series {
            let Some(kind) = self.kind_of(name) else {
                continue;
            };
            if let Some(aggregate) = self.merge(kind, by_tags.values(), Window::Whole)? {
                metrics.insert(name.clone(), aggregate.summarize(&self.percentiles));
            }
        }
        Ok(MetricsSnapshot {
            elapsed_ms: u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX),
            metrics,
        })
    }

    /// Per tag set view of one metric.
    ///
    /// # Errors
    ///
    /// Returns an error if trend histograms cannot be merged.
    pub fn series_summaries(&self, name: &str) -> Result<Vec<SeriesSummary>, MetricsError> {
        let (Some(kind), Some(by_tags)) = (self.kind_of(name), self.series.get(name)) else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(by_tags.len());
        for (tags, series) in by_tags {
            if let Some(aggregate) = self.merge(kind, std::iter::once(series), Window::Whole)? {
                out.push(SeriesSummary {
                    tags: tags.clone(),
                    summary: aggregate.summarize(&self.percentiles),
                });
            }
        }
        Ok(out)
    }

    fn merge<'series>(
        &self,
        kind: MetricKind,
        selected: impl Iterator<Item = &'series Series>,
        window: Window,
    ) -> Result<Option<Aggregate>, MetricsError> {
        let elapsed = self.elapsed();
        let from = first_bucket(window, elapsed);
        // Windows round out to whole buckets; rates divide by the covered span.
        let span = elapsed.saturating_sub(Duration::from_secs(from));
        match kind {
            MetricKind::Counter => {
                let mut count = 0u64;
                let mut seen = false;
                for series in selected {
                    if let Series::Counter(buckets) = series {
                        for amount in buckets.range(from..).map(|(_, amount)| *amount) {
                            seen = true;
                            count = count.saturating_add(amount);
                        }
                    }
                }
                Ok(seen.then_some(Aggregate::Counter {
                    count,
                    elapsed: span,
                }))
            }
            MetricKind::Rate => {
                let mut trues = 0u64;
                let mut total = 0u64;
                for series in selected {
                    if let Series::Rate(buckets) = series {
                        for bucket in buckets.range(from..).map(|(_, bucket)| bucket) {
                            trues = trues.saturating_add(bucket.trues);
                            total = total.saturating_add(bucket.total);
                        }
                    }
                }
                Ok((total > 0).then_some(Aggregate::Rate { trues, total }))
            }
            MetricKind::Trend => {
                let mut trend = TrendAggregate::new()?;
                for series in selected {
                    if let Series::Trend(buckets) = series {
                        for bucket in buckets.range(from..).map(|(_, bucket)| bucket) {
                            trend.hist.merge(&bucket.hist)?;
                            trend.count = trend.count.saturating_add(bucket.count);
                            trend.sum += bucket.sum;
                            trend.min = trend.min.min(bucket.min);
                            trend.max = trend.max.max(bucket.max);
                        }
                    }
                }
                Ok((trend.count > 0).then_some(Aggregate::Trend(trend)))
            }
        }
    }
}

/// Label used for a percentile in summaries, e.g. `p(95)` or `p(99.9)`.
#[must_use]
pub fn percentile_label(percent: f64) -> String {
    format!("p({})", percent)
}

const fn implied_kind(value: SampleValue) -> MetricKind {
    match value {
        SampleValue::Count(_) => MetricKind::Counter,
        SampleValue::Flag(_) => MetricKind::Rate,
        SampleValue::Value(_) => MetricKind::Trend,
    }
}

fn whole_amount(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

fn per_second(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    count as f64 / secs
}

fn fraction(trues: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    trues as f64 / total as f64
}
