use std::time;

use backfill_common::envelope::EventEnvelope;
use tracing::debug;
use uuid::Uuid;

use crate::error::{PublishError, QueueError};
use crate::queue::{MessageQueue, OutgoingMessage};

/// What the queue gave back for a published envelope, plus the tokens it was sent with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub message_id: String,
    pub group_id: String,
    pub deduplication_id: String,
}

pub struct QueuePublisher<Q> {
    queue: Q,
    request_timeout: time::Duration,
}

impl<Q: MessageQueue> QueuePublisher<Q> {
    pub fn new(queue: Q, request_timeout: time::Duration) -> Self {
        Self {
            queue,
            request_timeout,
        }
    }

    pub fn queue(&self) -> &Q {
        &self.queue
    }

    /// Send `envelope` grouped under its idempotency key.
    ///
    /// Every call uses a fresh deduplication id, so publishing the same envelope twice
    /// delivers it twice.
    pub async fn publish(&self, envelope: &EventEnvelope) -> Result<PublishReceipt, PublishError> {
        let Some(group_id) = envelope.group_key() else {
            return Err(PublishError::Validation(
                "idempotencyKey is missing or empty".to_owned(),
            ));
        };

        let body = serde_json::to_string(envelope)?;
        debug!("publishing envelope {}", body);

        let message = OutgoingMessage {
            body,
            group_id: group_id.to_owned(),
            deduplication_id: Uuid::new_v4().to_string(),
        };
        let group_id = message.group_id.clone();
        let deduplication_id = message.deduplication_id.clone();

        let message_id = tokio::time::timeout(
            self.request_timeout,
            self.queue.send_message(message),
        )
        .await
        .map_err(|_| {
            QueueError::new(format!(
                "no response from queue after {:?}",
                self.request_timeout
            ))
        })??;

        Ok(PublishReceipt {
            message_id,
            group_id,
            deduplication_id,
        })
    }
}
