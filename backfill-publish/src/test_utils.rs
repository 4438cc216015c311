//! In-memory queue and staged-row builders for exercising publishing without SQS.
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use backfill_common::envelope::transform_record;
use backfill_common::staging::{encode_envelope_pretty, StagedRow};
use backfill_common::time::SystemTime;
use backfill_common::value::StoreValue;
use tokio::sync::Mutex;

use crate::error::QueueError;
use crate::queue::{MessageQueue, OutgoingMessage};

/// Accepts every message unless its group was told to fail, remembering what was sent.
#[derive(Default)]
pub struct RecordingQueue {
    sent: Mutex<Vec<OutgoingMessage>>,
    failing_groups: HashSet<String>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_for(mut self, group_id: &str) -> Self {
        self.failing_groups.insert(group_id.to_owned());
        self
    }

    /// Accepted messages, in the order they arrived.
    pub async fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl MessageQueue for RecordingQueue {
    async fn send_message(&self, message: OutgoingMessage) -> Result<String, QueueError> {
        if self.failing_groups.contains(&message.group_id) {
            return Err(QueueError::new(format!(
                "ServiceUnavailable: group {} is unavailable",
                message.group_id
            )));
        }

        let mut sent = self.sent.lock().await;
        sent.push(message);
        Ok(format!("msg-{}", sent.len()))
    }
}

/// A staged row holding a freshly transformed envelope for `key`, with extra attributes.
pub fn staged_envelope_with(key: &str, fields: &[(&str, &str)]) -> StagedRow {
    let mut record: HashMap<String, StoreValue> = fields
        .iter()
        .map(|(name, value)| (name.to_string(), StoreValue::from(*value)))
        .collect();
    record.insert("PK".to_owned(), StoreValue::from(key));

    let envelope = transform_record(&record, &SystemTime::default());
    StagedRow {
        searched_key: key.to_owned(),
        body: encode_envelope_pretty(&envelope).unwrap_or_default(),
    }
}

pub fn staged_envelope(key: &str) -> StagedRow {
    staged_envelope_with(key, &[])
}
