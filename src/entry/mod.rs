mod plan;

use std::process::ExitCode;

use clap::{ArgMatches, CommandFactory, FromArgMatches};

use crate::args::DriverArgs;
use crate::error::AppResult;
use plan::{Verdict, build_plan, execute_plan};

/// Exit code when the run finished but at least one threshold failed.
pub const EXIT_THRESHOLDS_FAILED: u8 = 99;

/// Parses the command line, runs the load test and maps the outcome to a
/// process exit code: 0 on pass, 99 on failed thresholds, 1 on errors.
#[must_use]
pub fn run() -> ExitCode {
    match try_run() {
        Ok(Verdict::Passed) => ExitCode::SUCCESS,
        Ok(Verdict::ThresholdsFailed) => ExitCode::from(EXIT_THRESHOLDS_FAILED),
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn try_run() -> AppResult<Verdict> {
    let matches = DriverArgs::command().get_matches();
    let args = DriverArgs::from_arg_matches(&matches)?;

    crate::system::logger::init_logging(args.verbose, args.no_color);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(run_async(args, &matches))
}

async fn run_async(args: DriverArgs, matches: &ArgMatches) -> AppResult<Verdict> {
    let plan = build_plan(args, matches)?;
    execute_plan(plan).await
}
