use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::HttpError;

pub(crate) const DEFAULT_USER_AGENT: &str = concat!("vuramp/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    #[serde(alias = "get")]
    Get,
    #[serde(alias = "post")]
    Post,
    #[serde(alias = "put")]
    Put,
    #[serde(alias = "options")]
    Options,
    #[serde(alias = "patch")]
    Patch,
    #[serde(alias = "delete")]
    Delete,
    #[serde(alias = "head")]
    Head,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
        }
    }

    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Options => reqwest::Method::OPTIONS,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    #[must_use]
    pub const fn new(method: HttpMethod, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// A completed response. Header names are stored lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub duration: Duration,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
        }
    }
}

/// Base URL that request paths are appended to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetBase {
    raw: String,
}

impl TargetBase {
    /// Validates `value` as an absolute base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is malformed or cannot take paths.
    pub fn parse(value: &str) -> Result<Self, HttpError> {
        let trimmed = value.trim();
        let parsed = Url::parse(trimmed).map_err(|err| HttpError::InvalidBaseUrl {
            url: trimmed.to_owned(),
            source: err,
        })?;
        if parsed.cannot_be_a_base() {
            return Err(HttpError::BaseUrlCannotBeABase {
                url: trimmed.to_owned(),
            });
        }
        Ok(Self {
            raw: trimmed.trim_end_matches('/').to_owned(),
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Appends `path` to the base. Absolute `http(s)://` paths are used as is.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined URL does not parse.
    pub fn join(&self, path: &str) -> Result<Url, HttpError> {
        let combined = if path.starts_with("http://") || path.starts_with("https://") {
            path.to_owned()
        } else if path.starts_with('/') {
            format!("{}{}", self.raw, path)
        } else {
            format!("{}/{}", self.raw, path)
        };
        Url::parse(&combined).map_err(|err| HttpError::JoinUrlFailed {
            path: path.to_owned(),
            source: err,
        })
    }
}

/// Checks that a header pair is representable on the wire.
///
/// # Errors
///
/// Returns an error for an invalid header name or value.
pub fn validate_header(name: &str, value: &str) -> Result<(), HttpError> {
    reqwest::header::HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
        HttpError::InvalidHeaderName {
            header: name.to_owned(),
            source: err,
        }
    })?;
    reqwest::header::HeaderValue::from_str(value).map_err(|err| {
        HttpError::InvalidHeaderValue {
            header: name.to_owned(),
            source: err,
        }
    })?;
    Ok(())
}
