use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{HttpError, RequestError};

use super::{ClientSettings, HttpRequest, HttpResponse};

/// Sends one request and reports the outcome. Implementations must time the
/// call with a monotonic clock for both success and failure.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError>;
}

#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    /// Builds a pooled client with the configured timeouts.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying client cannot be built.
    pub fn new(settings: &ClientSettings) -> Result<Self, HttpError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .connect_timeout(settings.connect_timeout)
            .user_agent(settings.user_agent.as_str())
            .build()
            .map_err(|err| HttpError::BuildClientFailed { source: err })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
        let mut builder = self
            .client
            .request(request.method.to_reqwest(), request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body.as_ref() {
            builder = builder.body(body.clone());
        }

        let start = Instant::now();
        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                debug!("{} {} failed: {}", request.method, request.url, err);
                return Err(classify(&err, start));
            }
        };
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_owned(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = match read_body(response).await {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(err) => {
                debug!("Failed to read body of {} {}: {}", request.method, request.url, err);
                return Err(classify(&err, start));
            }
        };

        Ok(HttpResponse {
            status,
            headers,
            body,
            duration: start.elapsed(),
        })
    }
}

async fn read_body(response: reqwest::Response) -> Result<Vec<u8>, reqwest::Error> {
    let mut stream = response.bytes_stream();
    let mut body = Vec::new();
    while let Some(chunk) = stream.next().await {
        body.extend_from_slice(&chunk?);
    }
    Ok(body)
}

fn classify(err: &reqwest::Error, start: Instant) -> RequestError {
    let elapsed = start.elapsed();
    if err.is_timeout() {
        RequestError::Timeout { elapsed }
    } else {
        RequestError::Network {
            message: err.to_string(),
            elapsed,
        }
    }
}
