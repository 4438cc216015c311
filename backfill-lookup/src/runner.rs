use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use backfill_common::envelope::{transform_record, unknown_fields};
use backfill_common::locale::{Locale, LookupSummary};
use backfill_common::staging::{LookupOutcome, StagedOutcome, StagingError, StagingSink};
use backfill_common::time::TimeSource;
use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::retriever::PartitionedRetriever;
use crate::store::RecordStore;

/// Looks up a batch of keys and stages one outcome per distinct key.
pub struct BatchLookupRunner<S> {
    retriever: PartitionedRetriever<S>,
    time: Arc<dyn TimeSource + Send + Sync>,
    max_concurrent_lookups: usize,
    locale: Locale,
}

impl<S: RecordStore> BatchLookupRunner<S> {
    pub fn new(
        retriever: PartitionedRetriever<S>,
        time: Arc<dyn TimeSource + Send + Sync>,
        max_concurrent_lookups: usize,
    ) -> Self {
        Self {
            retriever,
            time,
            max_concurrent_lookups: max_concurrent_lookups.max(1),
            locale: Locale::default(),
        }
    }

    /// Language of the per-key status lines.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn retriever(&self) -> &PartitionedRetriever<S> {
        &self.retriever
    }

    /// Look up every distinct key in `keys`, writing each outcome to `staging` as soon as it is
    /// known. Duplicates are dropped here, so callers pass keys as read. Outcomes come back in
    /// first-occurrence order of their key.
    ///
    /// Failed lookups are recorded as outcomes. Only a staging failure aborts the batch, and
    /// everything staged before it stays in place.
    pub async fn run<K: StagingSink>(
        &self,
        keys: Vec<String>,
        staging: &mut K,
    ) -> Result<Vec<StagedOutcome>, StagingError> {
        let keys = dedup_keys(keys);
        info!("{}", self.locale.unique_keys(keys.len()));
        let mut outcomes = Vec::with_capacity(keys.len());

        let mut lookups = futures::stream::iter(keys)
            .map(|key| self.lookup(key))
            .buffered(self.max_concurrent_lookups);

        while let Some(outcome) = lookups.next().await {
            staging.stage(&outcome)?;
            outcomes.push(outcome);
        }

        Ok(outcomes)
    }

    async fn lookup(&self, key: String) -> StagedOutcome {
        let started = Instant::now();
        info!("{}", self.locale.querying_key(&key));

        let outcome = match self.retriever.retrieve(&key).await {
            Err(error) => {
                let reason = error.to_string();
                warn!("{}", self.locale.key_failed(&key, &reason));
                LookupOutcome::QueryError(reason)
            }
            Ok(records) if records.is_empty() => {
                info!("{}", self.locale.key_not_found(&key));
                LookupOutcome::NotFound
            }
            Ok(records) => {
                info!("{}", self.locale.key_found(&key, records.len()));
                metrics::counter!("backfill_lookup_records_total").increment(records.len() as u64);
                let envelopes = records
                    .iter()
                    .map(|record| {
                        let unknown = unknown_fields(record);
                        if !unknown.is_empty() {
                            debug!("record for {} has unmapped fields {:?}", key, unknown);
                        }
                        transform_record(record, self.time.as_ref())
                    })
                    .collect();
                LookupOutcome::Found(envelopes)
            }
        };

        let labels = [("outcome", outcome_label(&outcome).to_string())];
        metrics::counter!("backfill_lookup_keys_total", &labels).increment(1);
        metrics::histogram!("backfill_lookup_duration_seconds", &labels)
            .record(started.elapsed().as_secs_f64());

        StagedOutcome { key, outcome }
    }
}

fn outcome_label(outcome: &LookupOutcome) -> &'static str {
    match outcome {
        LookupOutcome::Found(_) => "found",
        LookupOutcome::NotFound => "not_found",
        LookupOutcome::QueryError(_) => "query_error",
    }
}

/// Drop repeated keys, keeping the first occurrence of each.
pub fn dedup_keys(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::with_capacity(keys.len());
    keys.into_iter()
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

pub fn summarize(outcomes: &[StagedOutcome]) -> LookupSummary {
    let mut summary = LookupSummary {
        keys: outcomes.len(),
        ..Default::default()
    };
    for StagedOutcome { outcome, .. } in outcomes {
        match outcome {
            LookupOutcome::Found(envelopes) => {
                summary.found += 1;
                summary.staged_rows += envelopes.len();
            }
            LookupOutcome::NotFound => {
                summary.not_found += 1;
                summary.staged_rows += 1;
            }
            LookupOutcome::QueryError(_) => {
                summary.query_errors += 1;
                summary.staged_rows += 1;
            }
        }
    }
    summary
}
