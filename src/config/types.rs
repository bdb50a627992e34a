use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::http::{HttpMethod, SelectionStrategy};
use crate::scenario::{CheckRule, Preset};
use crate::scheduler::RampMode;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(alias = "url")]
    pub base_url: Option<String>,
    pub preset: Option<Preset>,
    pub vus: Option<u64>,
    pub duration: Option<DurationValue>,
    pub stages: Option<Vec<StageConfig>>,
    pub ramp: Option<RampMode>,
    pub tick: Option<DurationValue>,
    pub graceful_stop: Option<DurationValue>,
    pub timeout: Option<DurationValue>,
    pub connect_timeout: Option<DurationValue>,
    pub think_time: Option<DurationValue>,
    pub think_jitter: Option<DurationValue>,
    pub progress_interval: Option<DurationValue>,
    pub summary_percentiles: Option<Vec<f64>>,
    pub summary_export: Option<String>,
    pub thresholds: Option<BTreeMap<String, ThresholdConfig>>,
    pub scenario: Option<ScenarioConfig>,
    pub setup: Option<SetupConfig>,
    pub teardown: Option<TeardownConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StageConfig {
    pub duration: DurationValue,
    pub target: u64,
}

/// `key = "expr"` or `key = ["expr", { threshold = "expr", abort_on_fail = true }]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ThresholdConfig {
    Single(ThresholdEntry),
    List(Vec<ThresholdEntry>),
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ThresholdEntry {
    Expression(String),
    Detailed(ThresholdObject),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThresholdObject {
    pub threshold: String,
    #[serde(default, alias = "abortOnFail")]
    pub abort_on_fail: bool,
    pub window: Option<DurationValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub name: Option<String>,
    pub groups: Vec<GroupConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupConfig {
    pub name: String,
    #[serde(default)]
    pub strategy: SelectionStrategy,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    pub requests: Vec<RequestConfig>,
    #[serde(default)]
    pub checks: Vec<CheckConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestConfig {
    #[serde(default)]
    pub method: HttpMethod,
    pub path: String,
    #[serde(default)]
    pub headers: Vec<String>,
    pub body: Option<String>,
    pub weight: Option<u32>,
    pub expected_statuses: Option<Vec<StatusValue>>,
}

/// `404` or `"200-399"`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum StatusValue {
    Code(u16),
    Range(String),
}

impl StatusValue {
    pub(crate) fn as_text(&self) -> String {
        match self {
            StatusValue::Code(code) => code.to_string(),
            StatusValue::Range(range) => range.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckConfig {
    pub name: Option<String>,
    #[serde(flatten)]
    pub rule: CheckRule,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetupConfig {
    pub path: String,
    pub expect_status: Option<u16>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TeardownConfig {
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    /// Strictly positive duration.
    pub(crate) fn to_duration(&self) -> Result<Duration, ConfigError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ConfigError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => super::parse_duration_value(text),
        }
    }

    /// Duration that may be zero, such as a pause or a stage.
    pub(crate) fn to_pause(&self) -> Result<Duration, ConfigError> {
        match self {
            DurationValue::Seconds(secs) => Ok(Duration::from_secs(*secs)),
            DurationValue::Text(text) => super::parse_zero_duration_value(text),
        }
    }
}
