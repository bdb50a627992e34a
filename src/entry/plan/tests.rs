use super::build::build_plan;
use crate::args::test_support::parse_test_args;
use crate::error::{AppError, AppResult, ConfigError};
use crate::scenario::builtin::{HEALTH_GROUP, smoke_scenario};
use crate::scheduler::{RampMode, RampPlan, Stage};
use std::time::Duration;
use tempfile::tempdir;

#[test]
fn constant_plan_from_vus_and_duration() -> AppResult<()> {
    let (args, matches) = parse_test_args(["vuramp", "--vus", "5", "-t", "10s"])?;
    let plan = build_plan(args, &matches)?;

    if plan.run.scheduler.plan != RampPlan::constant(5, Duration::from_secs(10)) {
        return Err(AppError::config(format!(
            "Unexpected ramp plan {:?}",
            plan.run.scheduler.plan
        )));
    }
    if plan.run.scenario != smoke_scenario() {
        return Err(AppError::config("Expected the built-in smoke scenario"));
    }
    if !plan.run.thresholds.is_empty() || plan.output.quiet {
        return Err(AppError::config("Unexpected thresholds or quiet flag"));
    }
    Ok(())
}

#[test]
fn staged_plan_starts_from_vus() -> AppResult<()> {
    let (args, matches) = parse_test_args([
        "vuramp",
        "--vus",
        "2",
        "--stage",
        "30s:10",
        "--stage",
        "10s:0",
    ])?;
    let plan = build_plan(args, &matches)?;
    let expected = RampPlan {
        start_vus: 2,
        stages: vec![
            Stage::new(Duration::from_secs(30), 10),
            Stage::new(Duration::from_secs(10), 0),
        ],
        mode: RampMode::Linear,
    };
    if plan.run.scheduler.plan != expected {
        return Err(AppError::config(format!(
            "Unexpected ramp plan {:?}",
            plan.run.scheduler.plan
        )));
    }
    Ok(())
}

#[test]
fn zero_length_profile_is_rejected() -> AppResult<()> {
    let (args, matches) = parse_test_args(["vuramp", "--stage", "0s:5"])?;
    match build_plan(args, &matches) {
        Err(AppError::Config(ConfigError::RunDurationZero)) => Ok(()),
        Err(err) => Err(err),
        Ok(_) => Err(AppError::config("Expected zero duration failure")),
    }
}

#[test]
fn invalid_threshold_is_fatal() -> AppResult<()> {
    for threshold in ["http_req_duration=rate<1", "latency=p(95)<100", "checks=rate<"] {
        let (args, matches) = parse_test_args(["vuramp", "--threshold", threshold])?;
        if build_plan(args, &matches).is_ok() {
            return Err(AppError::config(format!(
                "Expected '{}' to be rejected",
                threshold
            )));
        }
    }
    Ok(())
}

#[test]
fn invalid_base_url_is_fatal() -> AppResult<()> {
    let (args, matches) = parse_test_args(["vuramp", "-u", "not a url"])?;
    match build_plan(args, &matches) {
        Err(AppError::Http(_)) => Ok(()),
        Err(err) => Err(err),
        Ok(_) => Err(AppError::config("Expected base URL failure")),
    }
}

#[test]
fn smoke_preset_plan() -> AppResult<()> {
    let (args, matches) = parse_test_args(["vuramp", "--preset", "smoke"])?;
    let plan = build_plan(args, &matches)?;
    if plan.run.scheduler.plan != RampPlan::constant(5, Duration::from_secs(30)) {
        return Err(AppError::config("Unexpected smoke shape"));
    }
    if plan.run.thresholds.len() != 3 {
        return Err(AppError::config("Expected three smoke thresholds"));
    }
    if plan
        .run
        .scenario
        .groups
        .first()
        .map(|group| group.name.as_str())
        != Some(HEALTH_GROUP)
    {
        return Err(AppError::config("Expected health group first"));
    }
    Ok(())
}

#[test]
fn config_file_feeds_plan() -> AppResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("run.toml");
    std::fs::write(
        &path,
        r#"
base_url = "http://127.0.0.1:1"
summary_export = "result.json"
timeout = "3s"

[setup]
path = "/ready"
expect_status = 204

[teardown]
message = "done"
"#,
    )?;
    let path_text = path.to_string_lossy().into_owned();
    let (args, matches) = parse_test_args(["vuramp", "-c", path_text.as_str(), "-q"])?;
    let plan = build_plan(args, &matches)?;

    if plan.run.base.as_str() != "http://127.0.0.1:1" {
        return Err(AppError::config("Unexpected base"));
    }
    if plan.run.client.timeout != Duration::from_secs(3) {
        return Err(AppError::config("Unexpected timeout"));
    }
    if plan.output.summary_export.as_deref() != Some("result.json") || !plan.output.quiet {
        return Err(AppError::config("Unexpected output options"));
    }
    let setup = plan
        .setup
        .ok_or_else(|| AppError::config("Expected setup probe"))?;
    if setup.expect_status != 204 || plan.teardown_message.as_deref() != Some("done") {
        return Err(AppError::config("Unexpected hooks"));
    }
    Ok(())
}
