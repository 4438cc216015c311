//! Scripted record store for exercising retrieval without DynamoDB.
use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use backfill_common::envelope::RawRecord;
use backfill_common::value::StoreValue;
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::store::{ContinuationToken, Page, RecordStore};

const PAGE_ATTRIBUTE: &str = "page";

pub enum ScriptedPage {
    Items(Vec<RawRecord>),
    Fail(String),
    /// Never answers, to trip the request timeout.
    Hang,
}

/// Serves pre-scripted pages per partition key and records every request it receives.
/// Keys without a script have no records.
#[derive(Default)]
pub struct ScriptedStore {
    pages: HashMap<String, Vec<ScriptedPage>>,
    requests: Mutex<Vec<(String, usize)>>,
}

impl ScriptedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pages(mut self, key: &str, pages: Vec<ScriptedPage>) -> Self {
        self.pages.insert(key.to_owned(), pages);
        self
    }

    /// Every (partition key, page index) requested so far, in order.
    pub async fn requests(&self) -> Vec<(String, usize)> {
        self.requests.lock().await.clone()
    }

    /// How many retrievals were started for `key`, i.e. requests for its first page.
    pub async fn retrievals_of(&self, key: &str) -> usize {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|(k, page)| k == key && *page == 0)
            .count()
    }
}

fn page_token(page: usize) -> ContinuationToken {
    ContinuationToken::new(HashMap::from([(
        PAGE_ATTRIBUTE.to_owned(),
        AttributeValue::N(page.to_string()),
    )]))
}

fn page_index(token: Option<&ContinuationToken>) -> usize {
    token
        .and_then(|t| t.as_attributes().get(PAGE_ATTRIBUTE))
        .and_then(|value| value.as_n().ok())
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

#[async_trait]
impl RecordStore for ScriptedStore {
    async fn query(
        &self,
        partition_key: &str,
        start: Option<ContinuationToken>,
    ) -> Result<Page, StoreError> {
        let index = page_index(start.as_ref());
        self.requests
            .lock()
            .await
            .push((partition_key.to_owned(), index));

        let Some(pages) = self.pages.get(partition_key) else {
            return Ok(Page::default());
        };

        let next = (index + 1 < pages.len()).then(|| page_token(index + 1));
        match pages.get(index) {
            Some(ScriptedPage::Items(items)) => Ok(Page {
                items: items.clone(),
                next,
            }),
            Some(ScriptedPage::Fail(message)) => Err(StoreError::new(message.as_str())),
            Some(ScriptedPage::Hang) => std::future::pending().await,
            None => Ok(Page::default()),
        }
    }
}

/// A record with the given partition key and string attributes.
pub fn record(partition_key: &str, fields: &[(&str, &str)]) -> RawRecord {
    let mut record: RawRecord = fields
        .iter()
        .map(|(name, value)| (name.to_string(), StoreValue::from(*value)))
        .collect();
    record.insert("PK".to_owned(), StoreValue::from(partition_key));
    record
}
