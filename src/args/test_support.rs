use clap::{CommandFactory, FromArgMatches};

use crate::error::{AppError, AppResult};

use super::DriverArgs;

/// Parses test arguments and keeps the matches for value-source checks.
pub(crate) fn parse_test_args<I, T>(args: I) -> AppResult<(DriverArgs, clap::ArgMatches)>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let matches = DriverArgs::command().try_get_matches_from(args)?;
    let args = DriverArgs::from_arg_matches(&matches).map_err(AppError::from)?;
    Ok((args, matches))
}
