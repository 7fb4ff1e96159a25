//! Store-level errors. Per §4.2, no operation may throw across the
//! `TransactionStore` boundary — internal failures are logged by the
//! implementation and mapped to `false`/`None` at the call site. This type
//! exists for the implementations themselves to reason about *why* an
//! operation failed before they swallow it.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transient connection error: {0}")]
    Connection(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("record not found")]
    NotFound,
    #[error("backend error: {0}")]
    Backend(String),
}

impl From<redis::RedisError> for StoreError {
    fn from(e: redis::RedisError) -> Self {
        if e.is_connection_dropped() || e.is_timeout() || e.is_io_error() {
            StoreError::Connection(e.to_string())
        } else {
            StoreError::Backend(e.to_string())
        }
    }
}
