use async_trait::async_trait;
use aws_sdk_sqs::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_sqs::Client as SqsClient;
use tracing::debug;

use crate::error::QueueError;

/// A message ready for a FIFO queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub body: String,
    /// Messages sharing a group are delivered in send order.
    pub group_id: String,
    pub deduplication_id: String,
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Send one message, returning the id the queue assigned to it.
    async fn send_message(&self, message: OutgoingMessage) -> Result<String, QueueError>;
}

pub struct SqsQueue {
    client: SqsClient,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(client: SqsClient, queue_url: &str) -> Self {
        Self {
            client,
            queue_url: queue_url.to_owned(),
        }
    }
}

fn describe_error<E>(error: &E) -> String
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match (error.code(), error.message()) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (None, Some(message)) => message.to_owned(),
        _ => DisplayErrorContext(error).to_string(),
    }
}

#[async_trait]
impl MessageQueue for SqsQueue {
    async fn send_message(&self, message: OutgoingMessage) -> Result<String, QueueError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(message.body)
            .message_group_id(message.group_id)
            .message_deduplication_id(message.deduplication_id)
            .send()
            .await
            .map_err(|sdk_error| QueueError::new(describe_error(&sdk_error)))?;

        debug!("queue accepted message {:?}", output.message_id);

        output
            .message_id
            .ok_or_else(|| QueueError::new("queue did not return a message id"))
    }
}
