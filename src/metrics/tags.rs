use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// Ordered tag map attached to a metric series. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TagSet(BTreeMap<String, String>);

impl TagSet {
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Adds every tag of `other`, overwriting keys already present.
    pub fn extend_from(&mut self, other: &TagSet) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for TagSet
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl fmt::Display for TagSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (idx, (key, value)) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}:{}", key, value)?;
        }
        f.write_str("}")
    }
}

/// One clause of a tag filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagClause {
    /// The tag must be present with exactly this value.
    Equals { key: String, value: String },
    /// The tag must be absent or carry a different value.
    NotEquals { key: String, value: String },
}

impl TagClause {
    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        match self {
            TagClause::Equals { key, value } => tags.get(key) == Some(value.as_str()),
            TagClause::NotEquals { key, value } => tags.get(key) != Some(value.as_str()),
        }
    }
}

impl fmt::Display for TagClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagClause::Equals { key, value } => write!(f, "{}:{}", key, value),
            TagClause::NotEquals { key, value } => write!(f, "{}:!{}", key, value),
        }
    }
}

/// Conjunction of tag clauses. An empty filter matches every series.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagFilter {
    clauses: Vec<TagClause>,
}

impl TagFilter {
    #[must_use]
    pub const fn new(clauses: Vec<TagClause>) -> Self {
        Self { clauses }
    }

    #[must_use]
    pub fn matches(&self, tags: &TagSet) -> bool {
        self.clauses.iter().all(|clause| clause.matches(tags))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    #[must_use]
    pub fn clauses(&self) -> &[TagClause] {
        &self.clauses
    }
}

impl fmt::Display for TagFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return Ok(());
        }
        f.write_str("{")?;
        for (idx, clause) in self.clauses.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", clause)?;
        }
        f.write_str("}")
    }
}
