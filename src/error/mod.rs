mod app;
mod config;
mod http;
mod metrics;
mod setup;
mod threshold;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use http::{HttpError, RequestError};
pub use metrics::MetricsError;
pub use setup::{SetupError, TeardownError};
pub use threshold::ThresholdError;
pub use validation::ValidationError;
