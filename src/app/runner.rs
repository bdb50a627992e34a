use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::http::{ClientSettings, HttpClient, TargetBase};
use crate::lifecycle::{LifecycleHooks, SetupData};
use crate::metrics::{
    CHECKS, CollectorConfig, MetricSummary, MetricsRegistry, MetricsSnapshot, RunClock,
    spawn_metrics_collector, tag_keys,
};
use crate::scenario::{Scenario, ScenarioExecutor};
use crate::scheduler::{ScheduleSummary, SchedulerConfig, run_scheduler};
use crate::shutdown::ShutdownSender;
use crate::thresholds::{Threshold, ThresholdOutcome, abort_probe, all_passed, evaluate_all};

use super::progress::spawn_progress_logger;

/// Everything a run needs, resolved from CLI, config and preset.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub base: TargetBase,
    pub client: ClientSettings,
    pub scenario: Scenario,
    pub scheduler: SchedulerConfig,
    pub thresholds: Vec<Threshold>,
    pub collector: CollectorConfig,
}

/// Pass and fail counts of one check within its group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckSummary {
    pub group: String,
    pub check: String,
    pub passes: u64,
    pub fails: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum HookStatus {
    Ok,
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub base_url: String,
    pub scenario: String,
    pub passed: bool,
    pub thresholds: Vec<ThresholdOutcome>,
    pub checks: Vec<CheckSummary>,
    pub metrics: MetricsSnapshot,
    pub schedule: ScheduleSummary,
    pub setup: SetupData,
    pub teardown: HookStatus,
}

impl RunResult {
    #[must_use]
    pub fn failed_thresholds(&self) -> impl Iterator<Item = &ThresholdOutcome> {
        self.thresholds.iter().filter(|outcome| !outcome.passed)
    }
}

/// Runs setup, the scheduled load, teardown and threshold evaluation.
///
/// # Errors
///
/// Returns an error when setup fails or the metrics cannot be finalized.
/// Per-request failures and teardown failures never surface here.
pub async fn run_load(
    plan: &RunPlan,
    client: Arc<dyn HttpClient>,
    hooks: &dyn LifecycleHooks,
    shutdown_tx: &ShutdownSender,
) -> AppResult<RunResult> {
    let setup = hooks.setup().await.map_err(AppError::setup)?;

    let started_at = Utc::now();
    let clock = RunClock::start();
    let collector = spawn_metrics_collector(
        &plan.collector,
        clock,
        shutdown_tx,
        abort_probe(&plan.thresholds),
    );
    let progress = spawn_progress_logger(collector.snapshots());

    info!(
        "Running scenario '{}' against {}",
        plan.scenario.name,
        plan.base.as_str()
    );
    let executor = ScenarioExecutor::new(plan.scenario.clone(), client, plan.base.clone());
    let schedule = run_scheduler(&plan.scheduler, executor, collector.handle(), shutdown_tx).await;

    let registry = collector.finish(clock.elapsed()).await?;
    progress.await?;

    let teardown = match hooks.teardown(&setup).await {
        Ok(()) => HookStatus::Ok,
        Err(err) => {
            warn!("Teardown failed: {}", err);
            HookStatus::Failed {
                message: err.to_string(),
            }
        }
    };

    let thresholds = evaluate_all(&plan.thresholds, &registry)?;
    let passed = all_passed(&thresholds);
    Ok(RunResult {
        started_at,
        finished_at: Utc::now(),
        base_url: plan.base.as_str().to_owned(),
        scenario: plan.scenario.name.clone(),
        passed,
        thresholds,
        checks: check_summaries(&plan.scenario, &registry)?,
        metrics: registry.snapshot()?,
        schedule,
        setup,
        teardown,
    })
}

/// Check counts in scenario order; checks that never ran report zero.
pub(crate) fn check_summaries(
    scenario: &Scenario,
    registry: &MetricsRegistry,
) -> AppResult<Vec<CheckSummary>> {
    let mut counts: BTreeMap<(String, String), (u64, u64)> = BTreeMap::new();
    for series in registry.series_summaries(CHECKS)? {
        let (Some(group), Some(check)) = (
            series.tags.get(tag_keys::GROUP),
            series.tags.get(tag_keys::CHECK),
        ) else {
            continue;
        };
        if let MetricSummary::Rate { trues, total, .. } = series.summary {
            let entry = counts
                .entry((group.to_owned(), check.to_owned()))
                .or_insert((0, 0));
            entry.0 = entry.0.saturating_add(trues);
            entry.1 = entry.1.saturating_add(total.saturating_sub(trues));
        }
    }

    let mut summaries = Vec::new();
    for group in &scenario.groups {
        for check in &group.checks {
            let (passes, fails) = counts
                .get(&(group.name.clone(), check.name.clone()))
                .copied()
                .unwrap_or((0, 0));
            summaries.push(CheckSummary {
                group: group.name.clone(),
                check: check.name.clone(),
                passes,
                fails,
            });
        }
    }
    Ok(summaries)
}
