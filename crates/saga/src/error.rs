//! Saga error types.

use messaging::ChannelError;
use store::StoreError;
use thiserror::Error;

/// Errors that can occur while producing or handling saga events.
#[derive(Debug, Error)]
pub enum SagaError {
    /// An event payload could not be decoded for its key.
    #[error("Failed to decode '{key}' payload: {reason}")]
    Decode { key: &'static str, reason: String },

    /// Store error.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Message channel error.
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The startup health check of a reactor failed.
    #[error("Reactor '{reactor}' cannot reach its store: {source}")]
    StoreUnavailable {
        reactor: &'static str,
        #[source]
        source: StoreError,
    },
}

impl SagaError {
    /// Returns true if the error wraps a store `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, SagaError::Store(e) if e.is_not_found())
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
