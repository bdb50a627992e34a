use std::fmt;
use std::time::Duration;

use serde::Serialize;

use crate::error::{ConfigError, ThresholdError};
use crate::metrics::{MetricKind, TagClause, TagFilter, Window, builtin_kind};

/// Metric name plus tag filter, e.g. `http_req_failed{expectedError:!not_found}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdKey {
    pub metric: String,
    pub filter: TagFilter,
}

impl fmt::Display for ThresholdKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.metric, self.filter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Count,
    Rate,
    Avg,
    Min,
    Max,
    Med,
    Percentile(f64),
}

impl Aggregation {
    #[must_use]
    pub const fn supported_by(self, kind: MetricKind) -> bool {
        match kind {
            MetricKind::Counter => matches!(self, Aggregation::Count | Aggregation::Rate),
            MetricKind::Rate => matches!(self, Aggregation::Rate),
            MetricKind::Trend => matches!(
                self,
                Aggregation::Avg
                    | Aggregation::Min
                    | Aggregation::Max
                    | Aggregation::Med
                    | Aggregation::Percentile(_)
            ),
        }
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Aggregation::Count => f.write_str("count"),
            Aggregation::Rate => f.write_str("rate"),
            Aggregation::Avg => f.write_str("avg"),
            Aggregation::Min => f.write_str("min"),
            Aggregation::Max => f.write_str("max"),
            Aggregation::Med => f.write_str("med"),
            Aggregation::Percentile(percent) => write!(f, "p({})", percent),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Comparison {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
}

/// Two-character operators come first so `<=` never parses as `<`.
const OPERATORS: [(&str, Comparison); 6] = [
    ("<=", Comparison::Le),
    (">=", Comparison::Ge),
    ("==", Comparison::Eq),
    ("!=", Comparison::Ne),
    ("<", Comparison::Lt),
    (">", Comparison::Gt),
];

const EQUALITY_TOLERANCE: f64 = 1e-9;

impl Comparison {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }

    #[must_use]
    pub fn holds(self, observed: f64, bound: f64) -> bool {
        let equal = (observed - bound).abs() <= EQUALITY_TOLERANCE;
        match self {
            Comparison::Lt => observed < bound && !equal,
            Comparison::Le => observed < bound || equal,
            Comparison::Gt => observed > bound && !equal,
            Comparison::Ge => observed > bound || equal,
            Comparison::Eq => equal,
            Comparison::Ne => !equal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdExpression {
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub bound: f64,
}

impl fmt::Display for ThresholdExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.aggregation,
            self.comparison.as_str(),
            self.bound
        )
    }
}

/// Unvalidated threshold as written in config or on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdSpec {
    pub key: String,
    pub expression: String,
    pub abort_on_fail: bool,
    pub window: Option<Duration>,
}

impl ThresholdSpec {
    #[must_use]
    pub fn new(key: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expression: expression.into(),
            abort_on_fail: false,
            window: None,
        }
    }
}

/// A validated threshold, ready to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct Threshold {
    pub key: ThresholdKey,
    pub expression: ThresholdExpression,
    pub window: Window,
    pub abort_on_fail: bool,
}

impl Threshold {
    /// Parses and validates one threshold against the built-in metrics.
    ///
    /// # Errors
    ///
    /// Returns an error for malformed syntax, unknown metrics or an
    /// aggregation the metric kind does not support.
    pub fn from_spec(spec: &ThresholdSpec) -> Result<Self, ConfigError> {
        let wrap = |source: ThresholdError| ConfigError::Threshold {
            key: spec.key.clone(),
            source,
        };
        let key = parse_key(&spec.key).map_err(wrap)?;
        let expression = parse_expression(&spec.expression).map_err(wrap)?;
        let kind = builtin_kind(&key.metric).ok_or_else(|| ConfigError::UnknownMetric {
            metric: key.metric.clone(),
        })?;
        if !expression.aggregation.supported_by(kind) {
            return Err(ConfigError::AggregationNotSupported {
                metric: key.metric.clone(),
                kind: kind.as_str(),
                aggregation: expression.aggregation.to_string(),
            });
        }
        Ok(Self {
            key,
            expression,
            window: spec.window.map_or(Window::Whole, Window::Last),
            abort_on_fail: spec.abort_on_fail,
        })
    }
}

/// Validates every spec, keeping input order.
///
/// # Errors
///
/// Returns the first invalid threshold.
pub fn build_thresholds(specs: &[ThresholdSpec]) -> Result<Vec<Threshold>, ConfigError> {
    specs.iter().map(Threshold::from_spec).collect()
}

/// Parses `metric` or `metric{tag:value,tag:!value}`.
///
/// # Errors
///
/// Returns an error if the metric is empty or the tag filter is malformed.
pub fn parse_key(input: &str) -> Result<ThresholdKey, ThresholdError> {
    let input = input.trim();
    let (metric, filter) = match input.split_once('{') {
        Some((metric, rest)) => {
            let Some((inner, trailing)) = rest.rsplit_once('}') else {
                return Err(ThresholdError::UnclosedTagFilter);
            };
            if !trailing.trim().is_empty() {
                return Err(ThresholdError::TrailingAfterTagFilter {
                    rest: trailing.trim().to_owned(),
                });
            }
            (metric.trim(), parse_clauses(inner)?)
        }
        None => (input, TagFilter::default()),
    };
    if metric.is_empty() {
        return Err(ThresholdError::EmptyMetric);
    }
    Ok(ThresholdKey {
        metric: metric.to_owned(),
        filter,
    })
}

fn parse_clauses(inner: &str) -> Result<TagFilter, ThresholdError> {
    let mut clauses = Vec::new();
    for raw in inner.split(',') {
        let clause = raw.trim();
        if clause.is_empty() {
            continue;
        }
        let invalid = || ThresholdError::InvalidTagClause {
            clause: clause.to_owned(),
        };
        let (key, value) = clause.split_once(':').ok_or_else(invalid)?;
        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            return Err(invalid());
        }
        let parsed = match value.strip_prefix('!') {
            Some(negated) if !negated.trim().is_empty() => TagClause::NotEquals {
                key: key.to_owned(),
                value: negated.trim().to_owned(),
            },
            Some(_) => return Err(invalid()),
            None if value.is_empty() => return Err(invalid()),
            None => TagClause::Equals {
                key: key.to_owned(),
                value: value.to_owned(),
            },
        };
        clauses.push(parsed);
    }
    Ok(TagFilter::new(clauses))
}

/// Parses `<aggregation><operator><number>`, e.g. `p(95)<500`.
///
/// # Errors
///
/// Returns an error for an unknown aggregation, a missing operator or a
/// non-numeric bound.
pub fn parse_expression(input: &str) -> Result<ThresholdExpression, ThresholdError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ThresholdError::EmptyExpression);
    }
    let (position, token, comparison) = OPERATORS
        .iter()
        .filter_map(|(token, comparison)| {
            input
                .find(token)
                .map(|position| (position, *token, *comparison))
        })
        .min_by_key(|(position, token, _)| (*position, std::cmp::Reverse(token.len())))
        .ok_or_else(|| ThresholdError::MissingOperator {
            expression: input.to_owned(),
        })?;
    let (head, tail) = input.split_at(position);
    let bound_text = tail.get(token.len()..).unwrap_or_default().trim();
    let aggregation = parse_aggregation(head.trim())?;
    let bound = bound_text
        .parse::<f64>()
        .map_err(|err| ThresholdError::InvalidBound {
            value: bound_text.to_owned(),
            source: err,
        })?;
    Ok(ThresholdExpression {
        aggregation,
        comparison,
        bound,
    })
}

fn parse_aggregation(name: &str) -> Result<Aggregation, ThresholdError> {
    let aggregation = match name {
        "count" => Aggregation::Count,
        "rate" => Aggregation::Rate,
        "avg" => Aggregation::Avg,
        "min" => Aggregation::Min,
        "max" => Aggregation::Max,
        "med" => Aggregation::Med,
        other => {
            let Some(inner) = other
                .strip_prefix("p(")
                .and_then(|rest| rest.strip_suffix(')'))
            else {
                return Err(ThresholdError::UnknownAggregation {
                    name: other.to_owned(),
                });
            };
            let percent = inner
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|percent| (0.0..=100.0).contains(percent))
                .ok_or_else(|| ThresholdError::InvalidPercentile {
                    value: inner.to_owned(),
                })?;
            Aggregation::Percentile(percent)
        }
    };
    Ok(aggregation)
}
