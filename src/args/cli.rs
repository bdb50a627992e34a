use clap::Parser;
use std::time::Duration;

use crate::lifecycle::SetupProbe;
use crate::scenario::{Preset, Scenario};
use crate::scheduler::{RampMode, Stage};
use crate::thresholds::ThresholdSpec;

use super::defaults::{
    DEFAULT_BASE_URL, DEFAULT_CONNECT_TIMEOUT, DEFAULT_DURATION, DEFAULT_GRACEFUL_STOP,
    DEFAULT_PROGRESS_INTERVAL, DEFAULT_THINK_TIME, DEFAULT_TICK, DEFAULT_TIMEOUT, DEFAULT_VUS,
};
use super::parsers::{
    parse_duration_arg, parse_pause_arg, parse_percentile_arg, parse_stage_arg,
    parse_threshold_arg, parse_vus,
};

#[derive(Debug, Parser, Clone)]
#[clap(
    version,
    about = "Staged virtual-user HTTP load driver - ramp profiles, per-response checks, tagged metrics, and threshold verdicts for CI smoke and load tests."
)]
pub struct DriverArgs {
    /// Base URL of the service under test
    #[arg(
        long = "base-url",
        short = 'u',
        env = "BASE_URL",
        default_value = DEFAULT_BASE_URL
    )]
    pub base_url: String,

    /// Path to config file (TOML/JSON). Defaults to ./vuramp.toml or ./vuramp.json if present.
    #[arg(long, short = 'c')]
    pub config: Option<String>,

    /// Built-in scenario, load shape and thresholds
    #[arg(long, value_enum)]
    pub preset: Option<Preset>,

    /// Concurrent virtual users (start level when stages are given)
    #[arg(long, default_value = DEFAULT_VUS, value_parser = parse_vus)]
    pub vus: u64,

    /// Run length when no stages are given (supports ms/s/m/h)
    #[arg(
        long = "duration",
        short = 't',
        default_value = DEFAULT_DURATION,
        value_parser = parse_duration_arg
    )]
    pub duration: Duration,

    /// Ramp stage as DURATION:TARGET (repeatable, e.g. --stage 30s:10 --stage 1m:50)
    #[arg(long = "stage", value_parser = parse_stage_arg)]
    pub stages: Vec<Stage>,

    /// How desired VUs move between stage targets
    #[arg(long, value_enum, default_value_t = RampMode::Linear)]
    pub ramp: RampMode,

    /// Scheduler tick; VU counts are reconciled once per tick
    #[arg(long, default_value = DEFAULT_TICK, value_parser = parse_duration_arg)]
    pub tick: Duration,

    /// Time in-flight iterations get to finish once the profile ends
    #[arg(
        long = "graceful-stop",
        default_value = DEFAULT_GRACEFUL_STOP,
        value_parser = parse_pause_arg
    )]
    pub graceful_stop: Duration,

    /// Per-request timeout
    #[arg(long, default_value = DEFAULT_TIMEOUT, value_parser = parse_duration_arg)]
    pub timeout: Duration,

    /// Connection timeout
    #[arg(
        long = "connect-timeout",
        default_value = DEFAULT_CONNECT_TIMEOUT,
        value_parser = parse_duration_arg
    )]
    pub connect_timeout: Duration,

    /// Pause between iterations of one VU
    #[arg(
        long = "think-time",
        default_value = DEFAULT_THINK_TIME,
        value_parser = parse_pause_arg
    )]
    pub think_time: Duration,

    /// Random extra pause added to think time, up to this value
    #[arg(
        long = "think-jitter",
        default_value = DEFAULT_THINK_TIME,
        value_parser = parse_pause_arg
    )]
    pub think_jitter: Duration,

    /// Threshold as KEY=EXPR (repeatable, e.g. --threshold 'http_req_duration=p(95)<500')
    #[arg(long = "threshold", value_parser = parse_threshold_arg)]
    pub thresholds: Vec<ThresholdSpec>,

    /// How often progress is logged and abort thresholds are checked
    #[arg(
        long = "progress-interval",
        default_value = DEFAULT_PROGRESS_INTERVAL,
        value_parser = parse_duration_arg
    )]
    pub progress_interval: Duration,

    /// Percentiles reported for trend metrics (comma separated)
    #[arg(
        long = "summary-percentiles",
        value_delimiter = ',',
        value_parser = parse_percentile_arg
    )]
    pub summary_percentiles: Vec<f64>,

    /// Write the run result as JSON to this path
    #[arg(long = "summary-export")]
    pub summary_export: Option<String>,

    /// Skip the text summary on stdout
    #[arg(long, short = 'q')]
    pub quiet: bool,

    /// Enable verbose logging (sets log level to debug unless overridden by VURAMP_LOG/RUST_LOG)
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long = "no-color")]
    pub no_color: bool,

    #[arg(skip)]
    pub scenario: Option<Scenario>,

    #[arg(skip)]
    pub setup: Option<SetupProbe>,

    #[arg(skip)]
    pub teardown_message: Option<String>,
}
