pub(crate) const DEFAULT_BASE_URL: &str = "http://localhost";
pub(crate) const DEFAULT_VUS: &str = "1";
pub(crate) const DEFAULT_DURATION: &str = "30s";
pub(crate) const DEFAULT_TICK: &str = "1s";
pub(crate) const DEFAULT_GRACEFUL_STOP: &str = "30s";
pub(crate) const DEFAULT_TIMEOUT: &str = "60s";
pub(crate) const DEFAULT_CONNECT_TIMEOUT: &str = "10s";
pub(crate) const DEFAULT_THINK_TIME: &str = "0s";
pub(crate) const DEFAULT_PROGRESS_INTERVAL: &str = "1s";
