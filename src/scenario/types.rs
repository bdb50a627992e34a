use serde::{Deserialize, Serialize};

use crate::http::{HttpResponse, RequestTemplate, SelectionStrategy};
use crate::metrics::TagSet;

/// Predicate evaluated against a completed response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CheckRule {
    StatusEquals { status: u16 },
    StatusIn { statuses: Vec<u16> },
    StatusAtLeast { status: u16 },
    StatusBelow { status: u16 },
    BodyContains { text: String },
    /// Header names compare case-insensitively.
    HeaderPresent { header: String },
    BodyIsJson,
}

impl CheckRule {
    #[must_use]
    pub fn evaluate(&self, response: &HttpResponse) -> bool {
        match self {
            CheckRule::StatusEquals { status } => response.status == *status,
            CheckRule::StatusIn { statuses } => statuses.contains(&response.status),
            CheckRule::StatusAtLeast { status } => response.status >= *status,
            CheckRule::StatusBelow { status } => response.status < *status,
            CheckRule::BodyContains { text } => response.body.contains(text.as_str()),
            CheckRule::HeaderPresent { header } => response.header(header).is_some(),
            CheckRule::BodyIsJson => {
                serde_json::from_str::<serde_json::Value>(&response.body).is_ok()
            }
        }
    }

    /// Name used when a check is configured without one.
    #[must_use]
    pub fn default_name(&self) -> String {
        match self {
            CheckRule::StatusEquals { status } => format!("status is {}", status),
            CheckRule::StatusIn { statuses } => {
                let list: Vec<String> = statuses.iter().map(u16::to_string).collect();
                format!("status in [{}]", list.join(","))
            }
            CheckRule::StatusAtLeast { status } => format!("status >= {}", status),
            CheckRule::StatusBelow { status } => format!("status < {}", status),
            CheckRule::BodyContains { text } => format!("body contains {}", text),
            CheckRule::HeaderPresent { header } => format!("has {} header", header),
            CheckRule::BodyIsJson => "body is JSON".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Check {
    pub name: String,
    pub rule: CheckRule,
}

impl Check {
    #[must_use]
    pub fn new(name: impl Into<String>, rule: CheckRule) -> Self {
        Self {
            name: name.into(),
            rule,
        }
    }
}

impl From<CheckRule> for Check {
    fn from(rule: CheckRule) -> Self {
        Self {
            name: rule.default_name(),
            rule,
        }
    }
}

/// Named unit of work inside an iteration: one request, then its checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub requests: Vec<RequestTemplate>,
    pub strategy: SelectionStrategy,
    pub tags: TagSet,
    pub checks: Vec<Check>,
}

impl Group {
    #[must_use]
    pub fn new(name: impl Into<String>, request: RequestTemplate) -> Self {
        Self {
            name: name.into(),
            requests: vec![request],
            strategy: SelectionStrategy::default(),
            tags: TagSet::new(),
            checks: Vec::new(),
        }
    }

    #[must_use]
    pub fn check(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key, value);
        self
    }
}

/// Ordered list of groups run once per iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub groups: Vec<Group>,
}

/// Outcome of a single check in one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    pub check: String,
    pub group: String,
    /// Tags of the group that ran the check.
    pub tags: TagSet,
    pub passed: bool,
    pub offset: std::time::Duration,
}
