//! Setup and teardown hooks run once around the scheduled load.
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::{SetupError, TeardownError};
use crate::http::{HttpClient, HttpMethod, HttpRequest, TargetBase};

pub const DEFAULT_SETUP_STATUS: u16 = 200;
pub const DEFAULT_TEARDOWN_MESSAGE: &str = "Load test completed.";

/// Request issued once before any VU starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupProbe {
    pub path: String,
    pub expect_status: u16,
}

/// Values produced by setup and handed to teardown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetupData {
    pub values: BTreeMap<String, String>,
}

impl SetupData {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    /// Runs before load generation.
    ///
    /// # Errors
    ///
    /// A setup error aborts the run before any VU starts.
    async fn setup(&self) -> Result<SetupData, SetupError>;

    /// Runs after every VU stopped.
    ///
    /// # Errors
    ///
    /// Teardown errors are reported but never change the verdict.
    async fn teardown(&self, data: &SetupData) -> Result<(), TeardownError>;
}

/// Hooks driven by the `setup` and `teardown` config sections.
pub struct ConfiguredHooks {
    client: Arc<dyn HttpClient>,
    base: TargetBase,
    probe: Option<SetupProbe>,
    teardown_message: String,
}

impl std::fmt::Debug for ConfiguredHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfiguredHooks")
            .field("base", &self.base)
            .field("probe", &self.probe)
            .field("teardown_message", &self.teardown_message)
            .finish_non_exhaustive()
    }
}

impl ConfiguredHooks {
    #[must_use]
    pub fn new(
        client: Arc<dyn HttpClient>,
        base: TargetBase,
        probe: Option<SetupProbe>,
        teardown_message: Option<String>,
    ) -> Self {
        Self {
            client,
            base,
            probe,
            teardown_message: teardown_message
                .unwrap_or_else(|| DEFAULT_TEARDOWN_MESSAGE.to_owned()),
        }
    }
}

#[async_trait]
impl LifecycleHooks for ConfiguredHooks {
    async fn setup(&self) -> Result<SetupData, SetupError> {
        let mut data = SetupData::default();
        let Some(probe) = self.probe.as_ref() else {
            return Ok(data);
        };
        let url = self.base.join(&probe.path).map_err(|err| SetupError::Hook {
            message: err.to_string(),
        })?;
        let url_text = url.to_string();
        let response = self
            .client
            .request(&HttpRequest::new(HttpMethod::Get, url))
            .await
            .map_err(|err| SetupError::Request {
                url: url_text.clone(),
                source: err,
            })?;
        if response.status != probe.expect_status {
            return Err(SetupError::UnexpectedStatus {
                url: url_text,
                status: response.status,
                expected: probe.expect_status,
            });
        }
        info!("Setup probe {} returned {}", url_text, response.status);
        data.values
            .insert("setup_status".to_owned(), response.status.to_string());
        Ok(data)
    }

    async fn teardown(&self, _data: &SetupData) -> Result<(), TeardownError> {
        info!("{}", self.teardown_message);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RequestError;
    use crate::http::HttpResponse;
    use std::sync::Mutex;
    use std::time::Duration;

    struct StatusTarget {
        status: u16,
        seen: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpClient for StatusTarget {
        async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, RequestError> {
            if let Ok(mut seen) = self.seen.lock() {
                seen.push(request.url.to_string());
            }
            Ok(HttpResponse {
                status: self.status,
                headers: Vec::new(),
                body: String::new(),
                duration: Duration::from_millis(1),
            })
        }
    }

    fn configured(
        status: u16,
        probe: Option<SetupProbe>,
    ) -> Result<(ConfiguredHooks, Arc<StatusTarget>), String> {
        let target = Arc::new(StatusTarget {
            status,
            seen: Mutex::new(Vec::new()),
        });
        let base = TargetBase::parse("http://127.0.0.1:9000/api")
            .map_err(|err| format!("Unexpected base error: {}", err))?;
        let client: Arc<dyn HttpClient> = target.clone();
        Ok((ConfiguredHooks::new(client, base, probe, None), target))
    }

    fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, String> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| format!("Failed to build runtime: {}", err))?;
        Ok(runtime.block_on(future))
    }

    #[test]
    fn setup_without_probe_sends_nothing() -> Result<(), String> {
        let (hooks, target) = configured(500, None)?;
        let data = block_on(hooks.setup())?.map_err(|err| format!("Unexpected error: {}", err))?;
        if !data.values.is_empty() {
            return Err(format!("Expected empty setup data, got {:?}", data));
        }
        let calls = target.seen.lock().map(|seen| seen.len()).unwrap_or(usize::MAX);
        if calls != 0 {
            return Err(format!("Expected no requests, got {}", calls));
        }
        Ok(())
    }

    #[test]
    fn setup_probe_records_status() -> Result<(), String> {
        let probe = SetupProbe {
            path: "/health".to_owned(),
            expect_status: DEFAULT_SETUP_STATUS,
        };
        let (hooks, target) = configured(200, Some(probe))?;
        let data = block_on(hooks.setup())?.map_err(|err| format!("Unexpected error: {}", err))?;
        if data.get("setup_status") != Some("200") {
            return Err(format!("Unexpected setup data: {:?}", data));
        }
        let seen = target
            .seen
            .lock()
            .map(|seen| seen.clone())
            .map_err(|_err| "Request log poisoned".to_owned())?;
        if seen != ["http://127.0.0.1:9000/api/health"] {
            return Err(format!("Unexpected probe URL: {:?}", seen));
        }
        Ok(())
    }

    #[test]
    fn setup_probe_rejects_unexpected_status() -> Result<(), String> {
        let probe = SetupProbe {
            path: "/health".to_owned(),
            expect_status: 200,
        };
        let (hooks, _target) = configured(503, Some(probe))?;
        match block_on(hooks.setup())? {
            Err(SetupError::UnexpectedStatus {
                status: 503,
                expected: 200,
                ..
            }) => Ok(()),
            other => Err(format!("Expected unexpected-status error, got {:?}", other)),
        }
    }

    #[test]
    fn teardown_logs_and_succeeds() -> Result<(), String> {
        let (hooks, _target) = configured(200, None)?;
        if hooks.teardown_message != DEFAULT_TEARDOWN_MESSAGE {
            return Err(format!("Unexpected message: {}", hooks.teardown_message));
        }
        block_on(hooks.teardown(&SetupData::default()))?
            .map_err(|err| format!("Unexpected teardown error: {}", err))
    }
}
