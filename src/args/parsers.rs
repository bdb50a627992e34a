use std::time::Duration;

use crate::config::{parse_duration_value, parse_stage_value, parse_zero_duration_value};
use crate::error::{AppError, AppResult, ConfigError, ValidationError};
use crate::scheduler::Stage;
use crate::thresholds::ThresholdSpec;

pub(crate) fn parse_header(s: &str) -> Result<(String, String), ValidationError> {
    match s.split_once(':') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.trim().to_owned()))
        }
        Some(_) | None => Err(ValidationError::InvalidHeaderFormat {
            value: s.to_owned(),
        }),
    }
}

pub(super) fn parse_duration_arg(s: &str) -> AppResult<Duration> {
    parse_duration_value(s).map_err(AppError::config)
}

pub(super) fn parse_pause_arg(s: &str) -> AppResult<Duration> {
    parse_zero_duration_value(s).map_err(AppError::config)
}

pub(super) fn parse_stage_arg(s: &str) -> AppResult<Stage> {
    parse_stage_value(s).map_err(AppError::config)
}

/// Parses `KEY=EXPR`, splitting at the first `=` so expressions such as
/// `rate<=0.1` stay intact.
pub(crate) fn parse_threshold_arg(s: &str) -> AppResult<ThresholdSpec> {
    match s.split_once('=') {
        Some((key, expression)) if !key.trim().is_empty() && !expression.trim().is_empty() => {
            Ok(ThresholdSpec::new(key.trim(), expression.trim()))
        }
        Some(_) | None => Err(AppError::config(ConfigError::InvalidThresholdArg {
            value: s.to_owned(),
        })),
    }
}

pub(super) fn parse_vus(s: &str) -> AppResult<u64> {
    s.trim()
        .parse::<u64>()
        .map_err(|err| AppError::validation(ValidationError::InvalidNumber { source: err }))
}

pub(crate) fn parse_percentile(s: &str) -> Result<f64, ConfigError> {
    let value = s
        .trim()
        .parse::<f64>()
        .map_err(|_err| ConfigError::PercentileOutOfRange {
            value: s.to_owned(),
        })?;
    check_percentile(value)
}

pub(crate) fn check_percentile(value: f64) -> Result<f64, ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::PercentileOutOfRange {
            value: value.to_string(),
        })
    }
}

pub(super) fn parse_percentile_arg(s: &str) -> AppResult<f64> {
    parse_percentile(s).map_err(AppError::config)
}
