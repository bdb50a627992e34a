//! Scenarios: ordered groups of requests and checks run once per iteration.
pub mod builtin;
mod executor;
mod types;


pub use builtin::Preset;
pub use executor::{IterationContext, IterationOutcome, ScenarioExecutor};
pub use types::{Check, CheckResult, CheckRule, Group, Scenario};
