use std::io;

use thiserror::Error;

/// A failed send, carrying the queue's own message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct QueueError {
    pub message: String,
}

impl QueueError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Enumeration of reasons an envelope could not be published.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The envelope cannot be sent as is; the queue was never called.
    #[error("invalid envelope: {0}")]
    Validation(String),
    /// The queue rejected the message or did not answer in time.
    #[error("failed to send message: {0}")]
    Transport(#[from] QueueError),
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to create report {path}: {error}")]
    Create {
        path: String,
        #[source]
        error: io::Error,
    },
    #[error("failed to write report: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush report: {0}")]
    Flush(#[from] io::Error),
}
