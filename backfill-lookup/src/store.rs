use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client as DynamoClient;
use backfill_common::envelope::RawRecord;
use backfill_common::value::StoreValue;
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::error::StoreError;

/// Opaque cursor handed back by the store while more pages remain.
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuationToken(HashMap<String, AttributeValue>);

impl ContinuationToken {
    pub fn new(last_evaluated_key: HashMap<String, AttributeValue>) -> Self {
        Self(last_evaluated_key)
    }

    pub fn as_attributes(&self) -> &HashMap<String, AttributeValue> {
        &self.0
    }
}

/// One page of query results.
#[derive(Debug, Default)]
pub struct Page {
    pub items: Vec<RawRecord>,
    pub next: Option<ContinuationToken>,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one page of records whose partition key equals `partition_key`, starting after
    /// `start` if given.
    async fn query(
        &self,
        partition_key: &str,
        start: Option<ContinuationToken>,
    ) -> Result<Page, StoreError>;
}

pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
    partition_key_name: String,
}

impl DynamoStore {
    pub fn new(client: DynamoClient, table_name: &str, partition_key_name: &str) -> Self {
        Self {
            client,
            table_name: table_name.to_owned(),
            partition_key_name: partition_key_name.to_owned(),
        }
    }
}

// The service's own message when there is one (e.g. "Requested resource not found"), the
// whole error chain otherwise (timeouts, dispatch failures).
fn describe_error<E>(error: &E) -> String
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match error.message() {
        Some(message) => message.to_owned(),
        None => DisplayErrorContext(error).to_string(),
    }
}

#[async_trait]
impl RecordStore for DynamoStore {
    async fn query(
        &self,
        partition_key: &str,
        start: Option<ContinuationToken>,
    ) -> Result<Page, StoreError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#pk = :pk")
            .expression_attribute_names("#pk", &self.partition_key_name)
            .expression_attribute_values(":pk", AttributeValue::S(partition_key.to_owned()))
            .set_exclusive_start_key(start.map(|token| token.0))
            .send()
            .await
            .map_err(|sdk_error| StoreError::new(describe_error(&sdk_error)))?;

        let items: Vec<RawRecord> = output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(record_from_item)
            .collect();

        debug!(
            "got {} items from {} for {}",
            items.len(),
            self.table_name,
            partition_key
        );

        Ok(Page {
            items,
            next: output
                .last_evaluated_key
                .filter(|key| !key.is_empty())
                .map(ContinuationToken),
        })
    }
}

pub fn record_from_item(item: HashMap<String, AttributeValue>) -> RawRecord {
    item.into_iter()
        .map(|(name, value)| (name, store_value_from_attribute(value)))
        .collect()
}

/// Decode a DynamoDB attribute. Sets become lists and binary values base64 strings, since
/// neither has a JSON counterpart.
pub fn store_value_from_attribute(value: AttributeValue) -> StoreValue {
    match value {
        AttributeValue::S(s) => StoreValue::String(s),
        AttributeValue::N(n) => StoreValue::Number(n),
        AttributeValue::Bool(b) => StoreValue::Bool(b),
        AttributeValue::Null(_) => StoreValue::Null,
        AttributeValue::L(items) => {
            StoreValue::List(items.into_iter().map(store_value_from_attribute).collect())
        }
        AttributeValue::M(entries) => StoreValue::Map(
            entries
                .into_iter()
                .map(|(name, value)| (name, store_value_from_attribute(value)))
                .collect(),
        ),
        AttributeValue::Ss(values) => {
            StoreValue::List(values.into_iter().map(StoreValue::String).collect())
        }
        AttributeValue::Ns(values) => {
            StoreValue::List(values.into_iter().map(StoreValue::Number).collect())
        }
        AttributeValue::B(blob) => StoreValue::String(STANDARD.encode(blob.into_inner())),
        AttributeValue::Bs(blobs) => StoreValue::List(
            blobs
                .into_iter()
                .map(|blob| StoreValue::String(STANDARD.encode(blob.into_inner())))
                .collect(),
        ),
        // Attribute kinds added to the service after this SDK version
        _ => StoreValue::Null,
    }
}
