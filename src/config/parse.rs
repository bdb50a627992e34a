use std::time::Duration;

use crate::error::ConfigError;
use crate::scheduler::Stage;

/// Parses `500ms`, `30s`, `2m` or `1h`; bare numbers are seconds. Zero is rejected.
pub(crate) fn parse_duration_value(value: &str) -> Result<Duration, ConfigError> {
    let duration = parse_zero_duration_value(value)?;
    if duration.as_millis() == 0 {
        return Err(ConfigError::DurationZero);
    }
    Ok(duration)
}

pub(crate) fn parse_zero_duration_value(value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ConfigError::DurationEmpty);
    }

    let mut digits_len = 0usize;
    for ch in value.chars() {
        if ch.is_ascii_digit() {
            digits_len = digits_len.saturating_add(1);
        } else {
            break;
        }
    }
    if digits_len == 0 {
        return Err(ConfigError::InvalidDurationFormat {
            value: value.to_owned(),
        });
    }
    let (num_part, unit_part) = value.split_at(digits_len);
    let number: u64 = num_part
        .parse()
        .map_err(|err| ConfigError::InvalidDurationNumber {
            value: value.to_owned(),
            source: err,
        })?;

    let unit = if unit_part.is_empty() { "s" } else { unit_part };
    match unit {
        "ms" => Ok(Duration::from_millis(number)),
        "s" => Ok(Duration::from_secs(number)),
        "m" => number
            .checked_mul(60)
            .map(Duration::from_secs)
            .ok_or(ConfigError::DurationOverflow),
        "h" => number
            .checked_mul(60)
            .and_then(|minutes| minutes.checked_mul(60))
            .map(Duration::from_secs)
            .ok_or(ConfigError::DurationOverflow),
        _ => Err(ConfigError::InvalidDurationUnit {
            unit: unit.to_owned(),
        }),
    }
}

/// Parses a `DURATION:TARGET` stage such as `30s:10`.
pub(crate) fn parse_stage_value(value: &str) -> Result<Stage, ConfigError> {
    let (duration, target) =
        value
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidStageFormat {
                value: value.to_owned(),
            })?;
    if target.trim().is_empty() {
        return Err(ConfigError::InvalidStageFormat {
            value: value.to_owned(),
        });
    }
    let duration = parse_zero_duration_value(duration)?;
    let target = target
        .trim()
        .parse::<u64>()
        .map_err(|err| ConfigError::InvalidStageTarget {
            value: value.to_owned(),
            source: err,
        })?;
    Ok(Stage::new(duration, target))
}
