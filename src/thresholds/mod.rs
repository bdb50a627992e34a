//! Pass/fail criteria over aggregated metrics.
mod evaluate;
mod parse;


pub use evaluate::{ThresholdOutcome, abort_probe, all_passed, evaluate, evaluate_all};
pub use parse::{
    Aggregation, Comparison, Threshold, ThresholdExpression, ThresholdKey, ThresholdSpec,
    build_thresholds, parse_expression, parse_key,
};
