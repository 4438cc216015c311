use std::time;

use thiserror::Error;

/// A failed request to the record store, carrying the store's own message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct StoreError {
    pub message: String,
}

impl StoreError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Enumeration of reasons a key's retrieval failed. Pages fetched before the failure are
/// never returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RetrievalError {
    #[error("query for {key} failed on page {page}: {error}")]
    Store {
        key: String,
        page: usize,
        #[source]
        error: StoreError,
    },
    #[error("query for {key} timed out on page {page} after {timeout:?}")]
    Timeout {
        key: String,
        page: usize,
        timeout: time::Duration,
    },
}
