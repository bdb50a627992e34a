use clap::ArgMatches;
use clap::parser::ValueSource;

use crate::args::{DriverArgs, check_percentile, parse_header};
use crate::error::{AppError, AppResult, ConfigError};
use crate::http::{RequestTemplate, SelectionStrategy, StatusSet, validate_header};
use crate::lifecycle::{DEFAULT_SETUP_STATUS, SetupProbe};
use crate::scenario::{Check, Group, Preset, Scenario};
use crate::scheduler::Stage;
use crate::thresholds::ThresholdSpec;

use super::types::{
    ConfigFile, GroupConfig, RequestConfig, ScenarioConfig, StageConfig, ThresholdConfig,
    ThresholdEntry,
};

const DEFAULT_SCENARIO_NAME: &str = "default";

/// Applies the preset and configuration values to CLI arguments. Values
/// given on the command line always win, then the config file, then the
/// preset.
///
/// # Errors
///
/// Returns an error when config values are invalid or conflict with each other.
pub fn apply_config(
    args: &mut DriverArgs,
    matches: &ArgMatches,
    config: &ConfigFile,
) -> AppResult<()> {
    if is_cli(matches, "duration") && is_cli(matches, "stages") {
        return Err(AppError::config(ConfigError::Conflict {
            left: "duration",
            right: "stages",
        }));
    }
    if config.duration.is_some() && config.stages.is_some() {
        return Err(AppError::config(ConfigError::Conflict {
            left: "duration",
            right: "stages",
        }));
    }

    if !is_cli(matches, "preset")
        && let Some(preset) = config.preset
    {
        args.preset = Some(preset);
    }

    let cli_thresholds = std::mem::take(&mut args.thresholds);
    let mut thresholds = Vec::new();
    if let Some(preset) = args.preset {
        apply_preset(args, matches, preset);
        thresholds = preset
            .thresholds()
            .into_iter()
            .map(|(key, expression)| ThresholdSpec::new(key, expression))
            .collect();
    }
    if let Some(configured) = config.thresholds.as_ref() {
        thresholds = layer_thresholds(thresholds, threshold_specs(configured)?);
    }
    args.thresholds = layer_thresholds(thresholds, cli_thresholds);

    if !is_explicit(matches, "base_url")
        && let Some(base_url) = config.base_url.clone()
    {
        args.base_url = base_url;
    }

    if !is_cli(matches, "vus")
        && let Some(vus) = config.vus
    {
        args.vus = vus;
    }

    let shape_on_cli = is_cli(matches, "duration") || is_cli(matches, "stages");
    if !shape_on_cli && let Some(duration) = config.duration.as_ref() {
        args.duration = duration.to_duration()?;
        args.stages.clear();
    }
    if !shape_on_cli && let Some(stages) = config.stages.as_ref() {
        args.stages = parse_stages(stages)?;
    }

    if !is_cli(matches, "ramp")
        && let Some(ramp) = config.ramp
    {
        args.ramp = ramp;
    }

    if !is_cli(matches, "tick")
        && let Some(tick) = config.tick.as_ref()
    {
        args.tick = tick.to_duration()?;
    }

    if !is_cli(matches, "graceful_stop")
        && let Some(graceful_stop) = config.graceful_stop.as_ref()
    {
        args.graceful_stop = graceful_stop.to_pause()?;
    }

    if !is_cli(matches, "timeout")
        && let Some(timeout) = config.timeout.as_ref()
    {
        args.timeout = timeout.to_duration()?;
    }

    if !is_cli(matches, "connect_timeout")
        && let Some(connect_timeout) = config.connect_timeout.as_ref()
    {
        args.connect_timeout = connect_timeout.to_duration()?;
    }

    if !is_cli(matches, "think_time")
        && let Some(think_time) = config.think_time.as_ref()
    {
        args.think_time = think_time.to_pause()?;
    }

    if !is_cli(matches, "think_jitter")
        && let Some(think_jitter) = config.think_jitter.as_ref()
    {
        args.think_jitter = think_jitter.to_pause()?;
    }

    if !is_cli(matches, "progress_interval")
        && let Some(interval) = config.progress_interval.as_ref()
    {
        args.progress_interval = interval.to_duration()?;
    }

    if !is_cli(matches, "summary_percentiles")
        && let Some(percentiles) = config.summary_percentiles.as_ref()
    {
        args.summary_percentiles = percentiles
            .iter()
            .map(|percentile| check_percentile(*percentile))
            .collect::<Result<Vec<_>, _>>()?;
    }

    if !is_cli(matches, "summary_export")
        && let Some(path) = config.summary_export.clone()
    {
        args.summary_export = Some(path);
    }

    if let Some(scenario) = config.scenario.as_ref() {
        args.scenario = Some(build_scenario(scenario)?);
    }

    if let Some(setup) = config.setup.as_ref() {
        args.setup = Some(SetupProbe {
            path: setup.path.clone(),
            expect_status: setup.expect_status.unwrap_or(DEFAULT_SETUP_STATUS),
        });
    }

    if let Some(message) = config
        .teardown
        .as_ref()
        .and_then(|teardown| teardown.message.clone())
    {
        args.teardown_message = Some(message);
    }

    Ok(())
}

fn is_cli(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(ValueSource::CommandLine)
}

// Environment-backed flags outrank the config file too.
fn is_explicit(matches: &ArgMatches, name: &str) -> bool {
    matches!(
        matches.value_source(name),
        Some(ValueSource::CommandLine | ValueSource::EnvVariable)
    )
}

fn apply_preset(args: &mut DriverArgs, matches: &ArgMatches, preset: Preset) {
    if !is_cli(matches, "vus") {
        args.vus = preset.vus();
    }
    if !is_cli(matches, "duration") && !is_cli(matches, "stages") {
        if let Some(duration) = preset.duration() {
            args.duration = duration;
        }
        args.stages = preset
            .stages()
            .into_iter()
            .map(|(duration, target)| Stage::new(duration, target))
            .collect();
    }
    args.scenario = Some(preset.scenario());
}

/// Keeps `base` entries whose key `overrides` does not mention, then appends
/// `overrides`.
fn layer_thresholds(base: Vec<ThresholdSpec>, overrides: Vec<ThresholdSpec>) -> Vec<ThresholdSpec> {
    let mut layered: Vec<ThresholdSpec> = base
        .into_iter()
        .filter(|spec| !overrides.iter().any(|other| other.key == spec.key))
        .collect();
    layered.extend(overrides);
    layered
}

fn parse_stages(stages: &[StageConfig]) -> Result<Vec<Stage>, ConfigError> {
    stages
        .iter()
        .map(|stage| Ok(Stage::new(stage.duration.to_pause()?, stage.target)))
        .collect()
}

pub(super) fn threshold_specs(
    thresholds: &std::collections::BTreeMap<String, ThresholdConfig>,
) -> Result<Vec<ThresholdSpec>, ConfigError> {
    let mut specs = Vec::new();
    for (key, config) in thresholds {
        let entries = match config {
            ThresholdConfig::Single(entry) => std::slice::from_ref(entry),
            ThresholdConfig::List(entries) => entries.as_slice(),
        };
        if entries.is_empty() {
            return Err(ConfigError::ThresholdWithoutExpressions { key: key.clone() });
        }
        for entry in entries {
            specs.push(match entry {
                ThresholdEntry::Expression(expression) => {
                    ThresholdSpec::new(key.as_str(), expression.as_str())
                }
                ThresholdEntry::Detailed(detail) => ThresholdSpec {
                    key: key.clone(),
                    expression: detail.threshold.clone(),
                    abort_on_fail: detail.abort_on_fail,
                    window: detail
                        .window
                        .as_ref()
                        .map(super::types::DurationValue::to_duration)
                        .transpose()?,
                },
            });
        }
    }
    Ok(specs)
}

pub(super) fn build_scenario(config: &ScenarioConfig) -> Result<Scenario, ConfigError> {
    if config.groups.is_empty() {
        return Err(ConfigError::ScenarioMissingGroups);
    }
    let groups = config
        .groups
        .iter()
        .map(build_group)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Scenario {
        name: config
            .name
            .clone()
            .unwrap_or_else(|| DEFAULT_SCENARIO_NAME.to_owned()),
        groups,
    })
}

fn build_group(config: &GroupConfig) -> Result<Group, ConfigError> {
    if config.requests.is_empty() {
        return Err(ConfigError::GroupMissingRequests {
            group: config.name.clone(),
        });
    }
    let requests = config
        .requests
        .iter()
        .map(build_request)
        .collect::<Result<Vec<_>, _>>()?;
    if config.strategy == SelectionStrategy::Weighted
        && requests
            .iter()
            .all(|request: &RequestTemplate| request.weight == 0)
    {
        return Err(ConfigError::GroupZeroWeights {
            group: config.name.clone(),
        });
    }

    let mut group = Group {
        name: config.name.clone(),
        requests,
        strategy: config.strategy,
        tags: config.tags.iter().collect(),
        checks: Vec::with_capacity(config.checks.len()),
    };
    for check in &config.checks {
        group.checks.push(match check.name.as_ref() {
            Some(name) => Check::new(name.as_str(), check.rule.clone()),
            None => Check::from(check.rule.clone()),
        });
    }
    Ok(group)
}

fn build_request(config: &RequestConfig) -> Result<RequestTemplate, ConfigError> {
    let mut request = RequestTemplate::new(config.method, config.path.as_str());
    for header in &config.headers {
        let (name, value) = parse_header(header).map_err(|_err| ConfigError::InvalidHeader {
            value: header.clone(),
        })?;
        validate_header(&name, &value).map_err(|_err| ConfigError::InvalidHeader {
            value: header.clone(),
        })?;
        request = request.header(name, value);
    }
    if let Some(body) = config.body.as_ref() {
        request = request.body(body.as_str());
    }
    if let Some(weight) = config.weight {
        request.weight = weight;
    }
    if let Some(statuses) = config.expected_statuses.as_ref() {
        let entries: Vec<String> = statuses.iter().map(|status| status.as_text()).collect();
        request = request.with_expected_statuses(StatusSet::parse(&entries)?);
    }
    Ok(request)
}
