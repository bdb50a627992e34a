use clap::ArgMatches;

use crate::app::RunPlan;
use crate::args::DriverArgs;
use crate::config::{apply_config, load_config};
use crate::error::{AppError, AppResult, ConfigError};
use crate::http::{ClientSettings, DEFAULT_USER_AGENT, TargetBase};
use crate::metrics::CollectorConfig;
use crate::scenario::builtin::smoke_scenario;
use crate::scheduler::{RampPlan, SchedulerConfig, ThinkTime};
use crate::thresholds::build_thresholds;

use super::types::{ExecutionPlan, OutputOptions};

/// Resolves CLI arguments, config file and preset into an executable plan.
pub(crate) fn build_plan(mut args: DriverArgs, matches: &ArgMatches) -> AppResult<ExecutionPlan> {
    let config = load_config(args.config.as_deref())?.unwrap_or_default();
    apply_config(&mut args, matches, &config)?;

    let base = TargetBase::parse(&args.base_url)?;
    let plan = if args.stages.is_empty() {
        RampPlan::constant(args.vus, args.duration)
    } else {
        RampPlan {
            start_vus: args.vus,
            stages: args.stages,
            mode: args.ramp,
        }
    };
    if plan.total_duration().is_zero() {
        return Err(AppError::config(ConfigError::RunDurationZero));
    }
    let thresholds = build_thresholds(&args.thresholds)?;

    let run = RunPlan {
        base,
        client: ClientSettings {
            timeout: args.timeout,
            connect_timeout: args.connect_timeout,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        },
        scenario: args.scenario.unwrap_or_else(smoke_scenario),
        scheduler: SchedulerConfig {
            plan,
            tick: args.tick,
            graceful_stop: args.graceful_stop,
            think_time: ThinkTime {
                base: args.think_time,
                jitter: args.think_jitter,
            },
        },
        thresholds,
        collector: CollectorConfig {
            progress_interval: args.progress_interval,
            percentiles: args.summary_percentiles,
        },
    };

    Ok(ExecutionPlan {
        run,
        setup: args.setup,
        teardown_message: args.teardown_message,
        output: OutputOptions {
            summary_export: args.summary_export,
            quiet: args.quiet,
        },
    })
}
