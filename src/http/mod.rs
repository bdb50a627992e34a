//! HTTP client adapter and request templates.
mod client;
mod template;
mod types;


pub use client::{HttpClient, ReqwestClient};
pub use template::{RequestTemplate, SelectionStrategy, StatusSet};
pub use types::{
    ClientSettings, HttpMethod, HttpRequest, HttpResponse, TargetBase, validate_header,
};

pub(crate) use types::DEFAULT_USER_AGENT;
