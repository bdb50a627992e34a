use super::*;
use crate::error::{AppError, AppResult};
use std::future::Future;
use std::time::Duration;
use tokio::sync::broadcast;

const SHUTDOWN_CHANNEL_CAPACITY: usize = 1;
const TOLERANCE: f64 = 1e-9;

fn run_async_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::metrics(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

fn secs(value: u64) -> Duration {
    Duration::from_secs(value)
}

fn close(left: f64, right: f64) -> bool {
    (left - right).abs() < TOLERANCE
}

fn rate_of(registry: &MetricsRegistry, name: &str, filter: &TagFilter) -> AppResult<Option<f64>> {
    Ok(registry
        .aggregate(name, filter, Window::Whole)?
        .and_then(|aggregate| aggregate.rate()))
}

#[test]
fn check_failure_rate_is_failed_over_total() -> AppResult<()> {
    let mut registry = MetricsRegistry::new();
    let tags = TagSet::new().with(tag_keys::GROUP, "health");
    for idx in 0..7u64 {
        registry.add_check("status is 200", tags.clone(), true, secs(idx))?;
    }
    for idx in 0..3u64 {
        registry.add_check("status is 200", tags.clone(), false, secs(idx))?;
    }

    match rate_of(&registry, CHECKS, &TagFilter::default())? {
        Some(rate) if close(rate, 0.7) => Ok(()),
        other => Err(AppError::metrics(format!(
            "Expected pass rate 0.7, got {:?}",
            other
        ))),
    }
}

#[test]
fn snapshot_twice_without_writes_is_identical() -> AppResult<()> {
    let mut registry = MetricsRegistry::new();
    registry.increment(HTTP_REQS, TagSet::new(), 1, Duration::from_millis(300))?;
    registry.observe(HTTP_REQ_DURATION, TagSet::new(), 12.5, Duration::from_millis(300))?;
    registry.observe(HTTP_REQ_DURATION, TagSet::new(), 40.0, Duration::from_millis(1800))?;

    let first = registry.snapshot()?;
    let second = registry.snapshot()?;
    if first != second {
        return Err(AppError::metrics("Snapshots differ without writes"));
    }
    registry.seal(secs(3));
    let sealed_first = registry.snapshot()?;
    let sealed_second = registry.snapshot()?;
    if sealed_first != sealed_second || sealed_first.elapsed_ms != 3000 {
        return Err(AppError::metrics(format!(
            "Unexpected sealed snapshot elapsed {}",
            sealed_first.elapsed_ms
        )));
    }
    Ok(())
}

#[test]
fn negated_filter_matches_absent_tag() -> AppResult<()> {
    let mut registry = MetricsRegistry::new();
    let not_found = TagSet::new().with("expectedError", "not_found");
    let other = TagSet::new().with("expectedError", "timeout");
    registry.observe(HTTP_REQ_FAILED, not_found, 1.0, secs(0))?;
    registry.observe(HTTP_REQ_FAILED, other, 0.0, secs(0))?;
    registry.observe(HTTP_REQ_FAILED, TagSet::new(), 0.0, secs(0))?;

    let filter = TagFilter::new(vec![TagClause::NotEquals {
        key: "expectedError".to_owned(),
        value: "not_found".to_owned(),
    }]);
    let aggregate = registry.aggregate(HTTP_REQ_FAILED, &filter, Window::Whole)?;
    match aggregate {
        Some(Aggregate::Rate { trues: 0, total: 2 }) => Ok(()),
        other => Err(AppError::metrics(format!(
            "Unexpected negated aggregate {:?}",
            other
        ))),
    }
}

#[test]
fn filter_without_matches_yields_none() -> AppResult<()> {
    let mut registry = MetricsRegistry::new();
    registry.observe(HTTP_REQ_FAILED, TagSet::new(), 1.0, secs(0))?;
    let filter = TagFilter::new(vec![TagClause::Equals {
        key: "expectedError".to_owned(),
        value: "not_found".to_owned(),
    }]);
    if registry
        .aggregate(HTTP_REQ_FAILED, &filter, Window::Whole)?
        .is_some()
    {
        return Err(AppError::metrics("Expected no aggregate for empty selection"));
    }
    Ok(())
}

#[test]
fn last_window_only_covers_recent_buckets() -> AppResult<()> {
    let mut registry = MetricsRegistry::new();
    for second in 0..10u64 {
        let value = if second < 8 { 10.0 } else { 500.0 };
        registry.observe(HTTP_REQ_DURATION, TagSet::new(), value, secs(second))?;
    }
    registry.seal(secs(10));

    let Some(Aggregate::Trend(recent)) =
        registry.aggregate(HTTP_REQ_DURATION, &TagFilter::default(), Window::Last(secs(2)))?
    else {
        return Err(AppError::metrics("Expected trend aggregate"));
    };
    if recent.count() != 2 || !close(recent.min(), 500.0) {
        return Err(AppError::metrics(format!(
            "Unexpected windowed trend count {} min {}",
            recent.count(),
            recent.min()
        )));
    }

    let Some(Aggregate::Trend(whole)) =
        registry.aggregate(HTTP_REQ_DURATION, &TagFilter::default(), Window::Whole)?
    else {
        return Err(AppError::metrics("Expected trend aggregate"));
    };
    if whole.count() != 10 || !close(whole.avg(), 108.0) {
        return Err(AppError::metrics(format!(
            "Unexpected whole-run trend count {} avg {}",
            whole.count(),
            whole.avg()
        )));
    }
    Ok(())
}

#[test]
fn trend_percentiles_follow_distribution() -> AppResult<()> {
    let mut registry = MetricsRegistry::new();
    for value in 1..=100u32 {
        registry.observe(
            HTTP_REQ_DURATION,
            TagSet::new(),
            f64::from(value),
            secs(0),
        )?;
    }
    let Some(Aggregate::Trend(trend)) =
        registry.aggregate(HTTP_REQ_DURATION, &TagFilter::default(), Window::Whole)?
    else {
        return Err(AppError::metrics("Expected trend aggregate"));
    };
    let p95 = trend.percentile(95.0);
    if !(94.0..=96.0).contains(&p95) || !close(trend.max(), 100.0) || !close(trend.min(), 1.0) {
        return Err(AppError::metrics(format!(
            "Unexpected percentiles p95={} min={} max={}",
            p95,
            trend.min(),
            trend.max()
        )));
    }
    Ok(())
}

#[test]
fn skewed_trend_reports_slow_tail() -> AppResult<()> {
    let mut registry = MetricsRegistry::new();
    for idx in 0..100u64 {
        let value = if idx < 10 { 5.0 } else { 1000.0 };
        registry.observe(HTTP_REQ_DURATION, TagSet::new(), value, secs(idx / 10))?;
    }
    let Some(Aggregate::Trend(trend)) =
        registry.aggregate(HTTP_REQ_DURATION, &TagFilter::default(), Window::Whole)?
    else {
        return Err(AppError::metrics("Expected trend aggregate"));
    };
    let (med, p95) = (trend.med(), trend.percentile(95.0));
    if !(999.0..=1001.0).contains(&med) || !(999.0..=1001.0).contains(&p95) {
        return Err(AppError::metrics(format!(
            "Expected slow tail, got med={} p95={}",
            med, p95
        )));
    }
    if !close(trend.min(), 5.0) {
        return Err(AppError::metrics(format!("Unexpected min {}", trend.min())));
    }
    Ok(())
}

#[test]
fn windowed_counter_rate_uses_covered_span() -> AppResult<()> {
    let mut registry = MetricsRegistry::new();
    for tenth in 0..105u64 {
        registry.increment(
            HTTP_REQS,
            TagSet::new(),
            1,
            Duration::from_millis(tenth.saturating_mul(100)),
        )?;
    }
    registry.seal(Duration::from_millis(10_500));
    let rate = registry
        .aggregate(HTTP_REQS, &TagFilter::default(), Window::Last(secs(1)))?
        .and_then(|aggregate| aggregate.rate());
    match rate {
        Some(rate) if (rate - 10.0).abs() < 1e-6 => Ok(()),
        other => Err(AppError::metrics(format!(
            "Expected 10 req/s over the last second, got {:?}",
            other
        ))),
    }
}

#[test]
fn counter_rate_uses_elapsed_seconds() -> AppResult<()> {
    let mut registry = MetricsRegistry::new();
    for second in 0..4u64 {
        registry.increment(HTTP_REQS, TagSet::new(), 5, secs(second))?;
    }
    registry.seal(secs(4));
    match registry.snapshot()?.get(HTTP_REQS) {
        Some(MetricSummary::Counter { count: 20, rate }) if close(*rate, 5.0) => Ok(()),
        other => Err(AppError::metrics(format!(
            "Unexpected counter summary {:?}",
            other
        ))),
    }
}

#[test]
fn undeclared_metric_takes_sample_kind() -> AppResult<()> {
    let mut registry = MetricsRegistry::new();
    registry.record(MetricSample::flag("custom_ok", TagSet::new(), true, secs(0)))?;
    if registry.kind_of("custom_ok") != Some(MetricKind::Rate) {
        return Err(AppError::metrics("Expected custom metric to become a rate"));
    }
    if registry.declare("custom_ok", MetricKind::Trend) != Some(MetricKind::Rate) {
        return Err(AppError::metrics("Expected conflicting declaration to report"));
    }
    Ok(())
}

#[test]
fn collector_folds_every_submitted_batch() -> AppResult<()> {
    run_async_test(async {
        let (shutdown_tx, _) = broadcast::channel::<()>(SHUTDOWN_CHANNEL_CAPACITY);
        let collector = spawn_metrics_collector(
            &CollectorConfig::default(),
            RunClock::start(),
            &shutdown_tx,
            None,
        );

        let mut workers = Vec::new();
        for _ in 0..8 {
            let handle = collector.handle();
            workers.push(tokio::spawn(async move {
                for _ in 0..50 {
                    let offset = handle.offset();
                    let batch = vec![
                        MetricSample::count(HTTP_REQS, TagSet::new(), 1, offset),
                        MetricSample::flag(HTTP_REQ_FAILED, TagSet::new(), false, offset),
                    ];
                    if handle.submit(batch).is_err() {
                        return false;
                    }
                }
                true
            }));
        }
        for worker in workers {
            if !worker.await? {
                return Err(AppError::metrics("Collector closed early"));
            }
        }

        let registry = collector.finish(secs(1)).await?;
        match registry.aggregate(HTTP_REQS, &TagFilter::default(), Window::Whole)? {
            Some(Aggregate::Counter { count: 400, .. }) => Ok(()),
            other => Err(AppError::metrics(format!(
                "Expected 400 requests, got {:?}",
                other
            ))),
        }
    })
}

#[test]
fn abort_probe_triggers_shutdown() -> AppResult<()> {
    run_async_test(async {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(SHUTDOWN_CHANNEL_CAPACITY);
        let config = CollectorConfig {
            progress_interval: Duration::from_millis(20),
            percentiles: Vec::new(),
        };
        let probe: AbortProbe = Box::new(|registry: &MetricsRegistry| {
            matches!(
                registry.aggregate(HTTP_REQS, &TagFilter::default(), Window::Whole),
                Ok(Some(_))
            )
        });
        let collector =
            spawn_metrics_collector(&config, RunClock::start(), &shutdown_tx, Some(probe));
        let handle = collector.handle();
        handle.submit(vec![MetricSample::count(
            HTTP_REQS,
            TagSet::new(),
            1,
            handle.offset(),
        )])?;

        tokio::time::timeout(Duration::from_secs(2), shutdown_rx.recv())
            .await
            .map_err(|err| AppError::metrics(format!("Probe never fired: {}", err)))?
            .map_err(|err| AppError::metrics(format!("Shutdown channel closed: {}", err)))?;

        drop(handle);
        let registry = collector.finish(secs(1)).await?;
        if registry.snapshot()?.get(HTTP_REQS).is_none() {
            return Err(AppError::metrics("Expected the request to be recorded"));
        }
        Ok(())
    })
}
