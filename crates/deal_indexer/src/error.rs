//! Client error taxonomy.

use crate::chain::fetch::FetchError;
use crate::mapper::IntegrityError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    /// Endpoint configuration is malformed. Never retried.
    #[error("configuration: {0}")]
    Configuration(String),
    /// Caller input rejected before any network call. Never retried.
    #[error("validation: {0}")]
    Validation(String),
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
    /// Backing sources violate an invariant or disagree. Never retried.
    #[error("data integrity: {0}")]
    DataIntegrity(#[from] IntegrityError),
    /// Network or upstream failure after retries were exhausted.
    #[error("transport: {0}")]
    Transport(#[from] FetchError),
    #[error("operation cancelled")]
    Cancelled,
}

impl ClientError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_retryable())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
