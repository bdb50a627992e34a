use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, HttpError};

use super::{HttpMethod, HttpRequest, TargetBase};

/// Set of status codes a template treats as a successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusSet {
    ranges: Vec<RangeInclusive<u16>>,
}

impl Default for StatusSet {
    fn default() -> Self {
        Self {
            ranges: vec![200..=399],
        }
    }
}

impl StatusSet {
    #[must_use]
    pub const fn new(ranges: Vec<RangeInclusive<u16>>) -> Self {
        Self { ranges }
    }

    /// Parses entries such as `"200-399"` or `"404"`. Empty input yields the
    /// default `200-399`.
    ///
    /// # Errors
    ///
    /// Returns an error if an entry is not a code or an ordered range.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, ConfigError> {
        if entries.is_empty() {
            return Ok(Self::default());
        }
        let mut ranges = Vec::with_capacity(entries.len());
        for entry in entries {
            ranges.push(parse_status_range(entry.as_ref())?);
        }
        Ok(Self { ranges })
    }

    #[must_use]
    pub fn contains(&self, status: u16) -> bool {
        self.ranges.iter().any(|range| range.contains(&status))
    }
}

impl fmt::Display for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, range) in self.ranges.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            if range.start() == range.end() {
                write!(f, "{}", range.start())?;
            } else {
                write!(f, "{}-{}", range.start(), range.end())?;
            }
        }
        Ok(())
    }
}

fn parse_status_range(value: &str) -> Result<RangeInclusive<u16>, ConfigError> {
    let invalid = || ConfigError::InvalidStatusRange {
        value: value.to_owned(),
    };
    let trimmed = value.trim();
    let (low, high) = match trimmed.split_once('-') {
        Some((low, high)) => (low.trim(), high.trim()),
        None => (trimmed, trimmed),
    };
    let low: u16 = low.parse().map_err(|_parse| invalid())?;
    let high: u16 = high.parse().map_err(|_parse| invalid())?;
    if low < 100 || high > 999 || low > high {
        return Err(invalid());
    }
    Ok(low..=high)
}

/// One request variant of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub weight: u32,
    pub expected_statuses: StatusSet,
}

impl RequestTemplate {
    #[must_use]
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
            weight: 1,
            expected_statuses: StatusSet::default(),
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[must_use]
    pub fn with_expected_statuses(mut self, statuses: StatusSet) -> Self {
        self.expected_statuses = statuses;
        self
    }

    /// Builds the concrete request, substituting `{{var}}` placeholders in
    /// the path, header values and body.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting URL does not parse.
    pub fn render(
        &self,
        base: &TargetBase,
        vars: &BTreeMap<String, String>,
    ) -> Result<HttpRequest, HttpError> {
        let url = base.join(&render_template(&self.path, vars))?;
        Ok(HttpRequest {
            method: self.method,
            url,
            headers: self
                .headers
                .iter()
                .map(|(name, value)| (name.clone(), render_template(value, vars)))
                .collect(),
            body: self.body.as_deref().map(|body| render_template(body, vars)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStrategy {
    /// Round-robin by iteration number.
    #[default]
    Sequential,
    Random,
    Weighted,
}

impl SelectionStrategy {
    /// Index of the template to send for `iteration`, or `None` when there
    /// are no templates.
    #[must_use]
    pub fn pick(self, templates: &[RequestTemplate], iteration: u64) -> Option<usize> {
        let len = templates.len();
        if len == 0 {
            return None;
        }
        if len == 1 {
            return Some(0);
        }
        match self {
            SelectionStrategy::Sequential => {
                let len_u64 = u64::try_from(len).unwrap_or(u64::MAX);
                let idx = iteration.checked_rem(len_u64).unwrap_or(0);
                Some(usize::try_from(idx).unwrap_or(0))
            }
            SelectionStrategy::Random => Some(rand::thread_rng().gen_range(0..len)),
            SelectionStrategy::Weighted => Some(pick_weighted(templates)),
        }
    }
}

fn pick_weighted(templates: &[RequestTemplate]) -> usize {
    let total = templates
        .iter()
        .fold(0u64, |acc, template| acc.saturating_add(u64::from(template.weight)));
    if total == 0 {
        return 0;
    }
    let mut roll = rand::thread_rng().gen_range(0..total);
    for (idx, template) in templates.iter().enumerate() {
        let weight = u64::from(template.weight);
        if roll < weight {
            return idx;
        }
        roll = roll.saturating_sub(weight);
    }
    templates.len().saturating_sub(1)
}

pub(crate) fn render_template(input: &str, vars: &BTreeMap<String, String>) -> String {
    if vars.is_empty() || !input.contains("{{") {
        return input.to_owned();
    }
    let mut rest = input;
    let mut output = String::with_capacity(input.len());

    loop {
        let Some(start) = rest.find("{{") else {
            output.push_str(rest);
            break;
        };
        let (before, after_start) = rest.split_at(start);
        output.push_str(before);
        let after = after_start.strip_prefix("{{").unwrap_or(after_start);
        let Some(end) = after.find("}}") else {
            output.push_str("{{");
            output.push_str(after);
            break;
        };
        let (key_part, after_end) = after.split_at(end);
        let key = key_part.trim();
        if let Some(value) = vars.get(key) {
            output.push_str(value);
        } else {
            output.push_str("{{");
            output.push_str(key);
            output.push_str("}}");
        }
        rest = after_end.strip_prefix("}}").unwrap_or(after_end);
    }

    output
}
