use crate::app::RunPlan;
use crate::lifecycle::SetupProbe;

pub(crate) struct ExecutionPlan {
    pub(crate) run: RunPlan,
    pub(crate) setup: Option<SetupProbe>,
    pub(crate) teardown_message: Option<String>,
    pub(crate) output: OutputOptions,
}

pub(crate) struct OutputOptions {
    pub(crate) summary_export: Option<String>,
    pub(crate) quiet: bool,
}

/// Overall outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    Passed,
    ThresholdsFailed,
}
