use std::time::Duration;

use thiserror::Error;

/// Errors raised while building the HTTP client or resolving targets.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Invalid base URL '{url}': {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Base URL '{url}' cannot carry relative paths.")]
    BaseUrlCannotBeABase { url: String },
    #[error("Failed to join URL '{path}': {source}")]
    JoinUrlFailed {
        path: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Invalid header name '{header}': {source}")]
    InvalidHeaderName {
        header: String,
        #[source]
        source: reqwest::header::InvalidHeaderName,
    },
    #[error("Invalid header value for '{header}': {source}")]
    InvalidHeaderValue {
        header: String,
        #[source]
        source: reqwest::header::InvalidHeaderValue,
    },
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
}

/// Per-request failures. These are recorded as metrics and never abort a run.
#[derive(Debug, Clone, Error)]
pub enum RequestError {
    #[error("network error after {elapsed:?}: {message}")]
    Network { message: String, elapsed: Duration },
    #[error("request timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },
}

impl RequestError {
    #[must_use]
    pub const fn elapsed(&self) -> Duration {
        match self {
            RequestError::Network { elapsed, .. } | RequestError::Timeout { elapsed } => *elapsed,
        }
    }

    /// Tag value used for the `error` metric tag.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            RequestError::Network { .. } => "network",
            RequestError::Timeout { .. } => "timeout",
        }
    }
}
