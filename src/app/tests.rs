use super::runner::check_summaries;
use super::summary::summary_lines;
use super::*;
use crate::error::{AppError, AppResult, RequestError, SetupError, TeardownError};
use crate::http::{
    ClientSettings, HttpClient, HttpMethod, HttpRequest, HttpResponse, RequestTemplate,
    TargetBase,
};
use crate::lifecycle::{LifecycleHooks, SetupData};
use crate::metrics::{CollectorConfig, MetricsRegistry, TagSet, tag_keys};
use crate::scenario::{Check, CheckRule, Group, Preset, Scenario};
use crate::scheduler::{RampMode, RampPlan, SchedulerConfig, Stage, ThinkTime};
use crate::shutdown_handlers::shutdown_channel;
use crate::thresholds::{ThresholdSpec, build_thresholds};
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tempfile::tempdir;

const REQUEST_DELAY: Duration = Duration::from_millis(100);

fn run_paused_test<F>(future: F) -> AppResult<()>
where
    F: Future<Output = AppResult<()>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .map_err(|err| AppError::metrics(format!("Failed to build runtime: {}", err)))?;
    runtime.block_on(future)
}

struct HealthTarget {
    status: u16,
    delay: Duration,
    calls: AtomicU64,
}

impl HealthTarget {
    fn new(status: u16) -> Arc<Self> {
        Self::with_delay(status, REQUEST_DELAY)
    }

    fn with_delay(status: u16, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            status,
            delay,
            calls: AtomicU64::new(0),
        })
    }
}

#[async_trait]
impl HttpClient for HealthTarget {
    async fn request(&self, _request: &HttpRequest) -> Result<HttpResponse, RequestError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(self.delay).await;
        Ok(HttpResponse {
            status: self.status,
            headers: Vec::new(),
            body: "OK".to_owned(),
            duration: self.delay,
        })
    }
}

struct TestHooks {
    fail_setup: bool,
    fail_teardown: bool,
}

#[async_trait]
impl LifecycleHooks for TestHooks {
    async fn setup(&self) -> Result<SetupData, SetupError> {
        if self.fail_setup {
            return Err(SetupError::Hook {
                message: "target not ready".to_owned(),
            });
        }
        Ok(SetupData::default())
    }

    async fn teardown(&self, _data: &SetupData) -> Result<(), TeardownError> {
        if self.fail_teardown {
            return Err(TeardownError::Hook {
                message: "cleanup failed".to_owned(),
            });
        }
        Ok(())
    }
}

const OK_HOOKS: TestHooks = TestHooks {
    fail_setup: false,
    fail_teardown: false,
};

fn health_scenario() -> Scenario {
    Scenario {
        name: "smoke".to_owned(),
        groups: vec![
            Group::new("health", RequestTemplate::new(HttpMethod::Get, "/health"))
                .check(Check::new("status is 200", CheckRule::StatusEquals { status: 200 })),
        ],
    }
}

fn smoke_plan() -> AppResult<RunPlan> {
    Ok(RunPlan {
        base: TargetBase::parse("http://localhost")?,
        client: ClientSettings::default(),
        scenario: health_scenario(),
        scheduler: SchedulerConfig {
            plan: RampPlan {
                start_vus: 5,
                stages: vec![Stage::new(Duration::from_secs(10), 5)],
                mode: RampMode::Step,
            },
            tick: Duration::from_millis(100),
            graceful_stop: Duration::from_secs(1),
            think_time: ThinkTime::default(),
        },
        thresholds: build_thresholds(&[ThresholdSpec::new("http_req_failed", "rate<0.1")])?,
        collector: CollectorConfig::default(),
    })
}

#[test]
fn smoke_run_passes_when_health_is_ok() -> AppResult<()> {
    run_paused_test(async {
        let plan = smoke_plan()?;
        let (shutdown_tx, _) = shutdown_channel();
        let target = HealthTarget::new(200);
        let result = run_load(&plan, target.clone(), &OK_HOOKS, &shutdown_tx).await?;

        if !result.passed {
            return Err(AppError::metrics(format!(
                "Expected pass, got {:?}",
                result.thresholds
            )));
        }
        let check = result
            .checks
            .first()
            .ok_or_else(|| AppError::metrics("Missing check summary"))?;
        if check.fails != 0 || check.passes == 0 {
            return Err(AppError::metrics(format!("Unexpected checks {:?}", check)));
        }
        if check.passes != target.calls.load(Ordering::Relaxed) {
            return Err(AppError::metrics("Every request should record one check"));
        }
        if result.schedule.peak_vus != 5 || result.teardown != HookStatus::Ok {
            return Err(AppError::metrics("Unexpected schedule or teardown status"));
        }
        Ok(())
    })
}

#[test]
fn smoke_run_fails_when_health_is_down() -> AppResult<()> {
    run_paused_test(async {
        let plan = smoke_plan()?;
        let (shutdown_tx, _) = shutdown_channel();
        let result = run_load(&plan, HealthTarget::new(503), &OK_HOOKS, &shutdown_tx).await?;

        if result.passed {
            return Err(AppError::metrics("Expected threshold failure"));
        }
        let outcome = result
            .failed_thresholds()
            .next()
            .ok_or_else(|| AppError::metrics("Missing failed threshold"))?;
        if outcome.observed.is_none_or(|rate| (rate - 1.0).abs() > 1e-9) {
            return Err(AppError::metrics(format!(
                "Unexpected observed {:?}",
                outcome.observed
            )));
        }
        let lines = summary_lines(&result);
        if !lines.iter().any(|line| line.starts_with("Result: FAIL")) {
            return Err(AppError::metrics(format!("Missing FAIL verdict in {:?}", lines)));
        }
        if !lines
            .iter()
            .any(|line| line.contains("[FAIL] http_req_failed rate<0.1"))
        {
            return Err(AppError::metrics("Missing failed threshold line"));
        }
        Ok(())
    })
}

#[test]
fn slow_responses_fail_smoke_latency_threshold() -> AppResult<()> {
    run_paused_test(async {
        let mut plan = smoke_plan()?;
        let specs: Vec<ThresholdSpec> = Preset::Smoke
            .thresholds()
            .into_iter()
            .map(|(key, expression)| ThresholdSpec::new(key, expression))
            .collect();
        plan.thresholds = build_thresholds(&specs)?;
        let (shutdown_tx, _) = shutdown_channel();
        let target = HealthTarget::with_delay(200, Duration::from_millis(700));
        let result = run_load(&plan, target, &OK_HOOKS, &shutdown_tx).await?;

        if result.passed {
            return Err(AppError::metrics(format!(
                "Expected latency failure, got {:?}",
                result.thresholds
            )));
        }
        let latency = result
            .thresholds
            .iter()
            .find(|outcome| outcome.metric == "http_req_duration")
            .ok_or_else(|| AppError::metrics("Missing latency threshold"))?;
        if latency.passed || latency.observed.is_none_or(|p95| !(690.0..=710.0).contains(&p95)) {
            return Err(AppError::metrics(format!("Unexpected latency outcome {:?}", latency)));
        }
        if result
            .failed_thresholds()
            .any(|outcome| outcome.metric != "http_req_duration")
        {
            return Err(AppError::metrics(format!(
                "Only latency should fail: {:?}",
                result.thresholds
            )));
        }
        Ok(())
    })
}

#[test]
fn setup_failure_aborts_before_load() -> AppResult<()> {
    run_paused_test(async {
        let plan = smoke_plan()?;
        let (shutdown_tx, _) = shutdown_channel();
        let target = HealthTarget::new(200);
        let hooks = TestHooks {
            fail_setup: true,
            fail_teardown: false,
        };
        match run_load(&plan, target.clone(), &hooks, &shutdown_tx).await {
            Err(AppError::Setup(_)) => {}
            Err(err) => return Err(err),
            Ok(_) => return Err(AppError::metrics("Expected setup failure")),
        }
        if target.calls.load(Ordering::Relaxed) != 0 {
            return Err(AppError::metrics("No request may run after setup failed"));
        }
        Ok(())
    })
}

#[test]
fn teardown_failure_keeps_verdict() -> AppResult<()> {
    run_paused_test(async {
        let plan = smoke_plan()?;
        let (shutdown_tx, _) = shutdown_channel();
        let hooks = TestHooks {
            fail_setup: false,
            fail_teardown: true,
        };
        let result = run_load(&plan, HealthTarget::new(200), &hooks, &shutdown_tx).await?;
        if !result.passed {
            return Err(AppError::metrics("Teardown must not change the verdict"));
        }
        if !matches!(result.teardown, HookStatus::Failed { .. }) {
            return Err(AppError::metrics("Expected failed teardown status"));
        }
        Ok(())
    })
}

#[test]
fn export_writes_run_result_json() -> AppResult<()> {
    run_paused_test(async {
        let plan = smoke_plan()?;
        let (shutdown_tx, _) = shutdown_channel();
        let result = run_load(&plan, HealthTarget::new(200), &OK_HOOKS, &shutdown_tx).await?;

        let dir = tempdir()?;
        let path = dir.path().join("summary.json");
        let path_text = path.to_string_lossy().into_owned();
        export_json(&path_text, &result).await?;

        let content = std::fs::read_to_string(&path)?;
        let value: serde_json::Value = serde_json::from_str(&content)?;
        if value.get("passed") != Some(&serde_json::Value::Bool(true)) {
            return Err(AppError::metrics("Expected passed=true in export"));
        }
        let kind = value
            .pointer("/metrics/metrics/http_req_failed/kind")
            .and_then(serde_json::Value::as_str);
        if kind != Some("rate") {
            return Err(AppError::metrics(format!("Unexpected metric kind {:?}", kind)));
        }
        if value.pointer("/teardown/status").and_then(serde_json::Value::as_str) != Some("ok") {
            return Err(AppError::metrics("Expected teardown status ok"));
        }
        Ok(())
    })
}

#[test]
fn check_summaries_follow_scenario_order() -> AppResult<()> {
    let scenario = Scenario {
        name: "two".to_owned(),
        groups: vec![
            Group::new("b", RequestTemplate::new(HttpMethod::Get, "/b"))
                .check(Check::new("first", CheckRule::StatusEquals { status: 200 })),
            Group::new("a", RequestTemplate::new(HttpMethod::Get, "/a"))
                .check(Check::new("second", CheckRule::BodyIsJson)),
        ],
    };
    let mut registry = MetricsRegistry::new();
    let tags = TagSet::new().with(tag_keys::GROUP, "b");
    for passed in [true, true, false] {
        registry.add_check("first", tags.clone(), passed, Duration::ZERO)?;
    }
    let summaries = check_summaries(&scenario, &registry)?;
    let counts: Vec<(&str, u64, u64)> = summaries
        .iter()
        .map(|summary| (summary.check.as_str(), summary.passes, summary.fails))
        .collect();
    if counts != vec![("first", 2, 1), ("second", 0, 0)] {
        return Err(AppError::metrics(format!("Unexpected summaries {:?}", counts)));
    }
    Ok(())
}
