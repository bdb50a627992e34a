use std::path::PathBuf;
use thiserror::Error;

use super::ThresholdError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse TOML config '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Failed to parse JSON config '{path}': {source}")]
    ParseJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Unsupported config extension '{ext}'. Use .toml or .json.")]
    UnsupportedExtension { ext: String },
    #[error("Config file must have .toml or .json extension.")]
    MissingExtension,
    #[error("Cannot set both '{left}' and '{right}'.")]
    Conflict {
        left: &'static str,
        right: &'static str,
    },
    #[error("Duration must not be empty.")]
    DurationEmpty,
    #[error("Invalid duration '{value}'.")]
    InvalidDurationFormat { value: String },
    #[error("Invalid duration '{value}': {source}")]
    InvalidDurationNumber {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Duration overflow.")]
    DurationOverflow,
    #[error("Invalid duration unit '{unit}'.")]
    InvalidDurationUnit { unit: String },
    #[error("Duration must be > 0.")]
    DurationZero,
    #[error("Invalid stage '{value}'. Expected 'DURATION:TARGET' (e.g. 30s:10).")]
    InvalidStageFormat { value: String },
    #[error("Invalid stage target in '{value}': {source}")]
    InvalidStageTarget {
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("Total run duration must be > 0.")]
    RunDurationZero,
    #[error("Invalid threshold '{key}': {source}")]
    Threshold {
        key: String,
        #[source]
        source: ThresholdError,
    },
    #[error("Invalid threshold argument '{value}'. Expected 'METRIC{{TAGS}}=EXPRESSION'.")]
    InvalidThresholdArg { value: String },
    #[error("Threshold references unknown metric '{metric}'.")]
    UnknownMetric { metric: String },
    #[error("Threshold aggregation '{aggregation}' is not valid for {kind} metric '{metric}'.")]
    AggregationNotSupported {
        metric: String,
        kind: &'static str,
        aggregation: String,
    },
    #[error("Threshold '{key}' has no expressions.")]
    ThresholdWithoutExpressions { key: String },
    #[error("Scenario must include at least one group.")]
    ScenarioMissingGroups,
    #[error("Group '{group}' must include at least one request.")]
    GroupMissingRequests { group: String },
    #[error("Group '{group}' uses weighted selection but its weights sum to zero.")]
    GroupZeroWeights { group: String },
    #[error("Invalid status range '{value}'. Expected a code (404) or a range (200-399).")]
    InvalidStatusRange { value: String },
    #[error("Invalid header '{value}'. Expected 'Key: Value'.")]
    InvalidHeader { value: String },
    #[error("Summary percentile {value} must be within 0-100.")]
    PercentileOutOfRange { value: String },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
