use thiserror::Error;

use super::RequestError;

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Setup request to '{url}' failed: {source}")]
    Request {
        url: String,
        #[source]
        source: RequestError,
    },
    #[error("Setup request to '{url}' returned status {status} (expected {expected}).")]
    UnexpectedStatus {
        url: String,
        status: u16,
        expected: u16,
    },
    #[error("{message}")]
    Hook { message: String },
}

#[derive(Debug, Error)]
pub enum TeardownError {
    #[error("{message}")]
    Hook { message: String },
}
