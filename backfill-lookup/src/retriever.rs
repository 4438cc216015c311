use std::time;

use backfill_common::envelope::RawRecord;
use tracing::debug;

use crate::error::RetrievalError;
use crate::store::{Page, RecordStore};

/// Fetches every record stored under a partition key, following continuation tokens until
/// the store runs out of pages.
pub struct PartitionedRetriever<S> {
    store: S,
    /// Upper bound for each individual page request.
    request_timeout: time::Duration,
}

impl<S: RecordStore> PartitionedRetriever<S> {
    pub fn new(store: S, request_timeout: time::Duration) -> Self {
        Self {
            store,
            request_timeout,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Retrieve all records for `key`, in page then item order.
    ///
    /// A failure on any page fails the whole key: records from earlier pages are dropped
    /// rather than returned partially.
    pub async fn retrieve(&self, key: &str) -> Result<Vec<RawRecord>, RetrievalError> {
        let mut records = Vec::new();
        let mut continuation = None;
        let mut page = 0;

        loop {
            page += 1;
            let response = tokio::time::timeout(
                self.request_timeout,
                self.store.query(key, continuation.take()),
            )
            .await
            .map_err(|_| RetrievalError::Timeout {
                key: key.to_owned(),
                page,
                timeout: self.request_timeout,
            })?;

            let Page { items, next } = response.map_err(|error| RetrievalError::Store {
                key: key.to_owned(),
                page,
                error,
            })?;

            debug!("page {} for {} had {} items", page, key, items.len());
            records.extend(items);

            match next {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }

        Ok(records)
    }
}
