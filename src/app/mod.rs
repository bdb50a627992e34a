//! Run orchestration and result reporting.
mod export;
mod progress;
mod runner;
mod summary;

#[cfg(test)]
mod tests;

pub(crate) use export::export_json;
pub use runner::{CheckSummary, HookStatus, RunPlan, RunResult, run_load};
pub(crate) use summary::print_summary;
