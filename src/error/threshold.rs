use thiserror::Error;

#[derive(Debug, Error)]
pub enum ThresholdError {
    #[error("metric name must not be empty")]
    EmptyMetric,
    #[error("tag filter is missing a closing '}}'")]
    UnclosedTagFilter,
    #[error("unexpected characters after tag filter: '{rest}'")]
    TrailingAfterTagFilter { rest: String },
    #[error("invalid tag clause '{clause}', expected 'key:value' or 'key:!value'")]
    InvalidTagClause { clause: String },
    #[error("expression must not be empty")]
    EmptyExpression,
    #[error("expression '{expression}' has no comparison operator")]
    MissingOperator { expression: String },
    #[error("unknown aggregation '{name}'")]
    UnknownAggregation { name: String },
    #[error("invalid percentile '{value}', expected p(0..=100)")]
    InvalidPercentile { value: String },
    #[error("invalid bound '{value}': {source}")]
    InvalidBound {
        value: String,
        #[source]
        source: std::num::ParseFloatError,
    },
}
