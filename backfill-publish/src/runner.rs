use std::collections::HashMap;
use std::time::Instant;

use backfill_common::envelope::EventEnvelope;
use backfill_common::locale::{Locale, PublishSummary};
use backfill_common::staging::{Marker, StagedBody, StagedRow};
use futures::StreamExt;
use tracing::{error, info, warn};

use crate::error::PublishError;
use crate::publisher::{PublishReceipt, QueuePublisher};
use crate::queue::MessageQueue;

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Published(PublishReceipt),
    /// The row records a lookup that found nothing to publish.
    Skipped(Marker),
    /// The body is neither a marker nor an envelope.
    StructuralError(String),
    ValidationFailure(String),
    TransportFailure(String),
}

impl RowOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RowOutcome::Published(_) => "published",
            RowOutcome::Skipped(_) => "skipped",
            RowOutcome::StructuralError(_) => "structural_error",
            RowOutcome::ValidationFailure(_) => "validation_failure",
            RowOutcome::TransportFailure(_) => "transport_failure",
        }
    }

    pub fn detail(&self) -> String {
        match self {
            RowOutcome::Published(receipt) => format!(
                "message {} (dedup {})",
                receipt.message_id, receipt.deduplication_id
            ),
            RowOutcome::Skipped(marker) => marker.as_str().to_owned(),
            RowOutcome::StructuralError(reason)
            | RowOutcome::ValidationFailure(reason)
            | RowOutcome::TransportFailure(reason) => reason.clone(),
        }
    }
}

impl From<Result<PublishReceipt, PublishError>> for RowOutcome {
    fn from(result: Result<PublishReceipt, PublishError>) -> Self {
        match result {
            Ok(receipt) => RowOutcome::Published(receipt),
            Err(PublishError::Validation(reason)) => RowOutcome::ValidationFailure(reason),
            Err(PublishError::Transport(error)) => RowOutcome::TransportFailure(error.message),
            Err(PublishError::Encode(error)) => RowOutcome::StructuralError(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportEntry {
    /// 1-based position of the row in the staged file, header excluded.
    pub row: usize,
    pub searched_key: String,
    pub outcome: RowOutcome,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PublishReport {
    /// One entry per staged row, in row order.
    pub entries: Vec<ReportEntry>,
}

impl PublishReport {
    pub fn summary(&self) -> PublishSummary {
        let mut summary = PublishSummary {
            rows: self.entries.len(),
            ..Default::default()
        };
        for entry in &self.entries {
            match entry.outcome {
                RowOutcome::Published(_) => summary.published += 1,
                RowOutcome::Skipped(_) => summary.skipped += 1,
                RowOutcome::StructuralError(_) => summary.structural_errors += 1,
                RowOutcome::ValidationFailure(_) => summary.validation_failures += 1,
                RowOutcome::TransportFailure(_) => summary.transport_failures += 1,
            }
        }
        summary
    }
}

struct PendingRow {
    row: usize,
    searched_key: String,
    envelope: EventEnvelope,
}

/// Publishes staged rows, one outcome per row.
pub struct BatchPublishRunner<Q> {
    publisher: QueuePublisher<Q>,
    max_concurrent_groups: usize,
    locale: Locale,
}

impl<Q: MessageQueue> BatchPublishRunner<Q> {
    pub fn new(publisher: QueuePublisher<Q>, max_concurrent_groups: usize) -> Self {
        Self {
            publisher,
            max_concurrent_groups: max_concurrent_groups.max(1),
            locale: Locale::default(),
        }
    }

    /// Language of the per-row status lines.
    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn publisher(&self) -> &QueuePublisher<Q> {
        &self.publisher
    }

    /// Publish every envelope in `rows`.
    ///
    /// Rows sharing an idempotency key are sent one after another in staged order; distinct
    /// keys are sent concurrently. A row's failure is recorded in the report and never stops
    /// the rest.
    pub async fn run(&self, rows: Vec<StagedRow>) -> PublishReport {
        let mut entries = Vec::with_capacity(rows.len());
        let mut units: Vec<Vec<PendingRow>> = Vec::new();
        let mut unit_by_key: HashMap<String, usize> = HashMap::new();

        for (index, row) in rows.into_iter().enumerate() {
            let position = index + 1;
            let envelope = match row.parse_body() {
                StagedBody::Envelope(envelope) => *envelope,
                StagedBody::Marker(marker) => {
                    info!(
                        "{}",
                        self.locale
                            .row_skipped(position, &row.searched_key, marker.as_str())
                    );
                    entries.push(finish(position, row.searched_key, RowOutcome::Skipped(marker)));
                    continue;
                }
                StagedBody::Malformed(reason) => {
                    error!(
                        "{}",
                        self.locale
                            .row_malformed(position, &row.searched_key, &reason)
                    );
                    entries.push(finish(
                        position,
                        row.searched_key,
                        RowOutcome::StructuralError(reason),
                    ));
                    continue;
                }
            };

            let pending = PendingRow {
                row: position,
                searched_key: row.searched_key,
                envelope,
            };
            match pending.envelope.group_key().map(str::to_owned) {
                Some(key) => {
                    let unit = *unit_by_key.entry(key).or_insert_with(|| {
                        units.push(Vec::new());
                        units.len() - 1
                    });
                    units[unit].push(pending);
                }
                None => units.push(vec![pending]),
            }
        }

        let published: Vec<Vec<ReportEntry>> = futures::stream::iter(units)
            .map(|unit| self.publish_unit(unit))
            .buffer_unordered(self.max_concurrent_groups)
            .collect()
            .await;

        entries.extend(published.into_iter().flatten());
        entries.sort_by_key(|entry| entry.row);

        PublishReport { entries }
    }

    async fn publish_unit(&self, unit: Vec<PendingRow>) -> Vec<ReportEntry> {
        let mut entries = Vec::with_capacity(unit.len());
        for pending in unit {
            let started = Instant::now();
            let outcome = RowOutcome::from(self.publisher.publish(&pending.envelope).await);
            metrics::histogram!("backfill_publish_duration_seconds")
                .record(started.elapsed().as_secs_f64());

            match &outcome {
                RowOutcome::Published(receipt) => info!(
                    "{}",
                    self.locale
                        .row_published(pending.row, &pending.searched_key, &receipt.message_id)
                ),
                other => warn!(
                    "{}",
                    self.locale
                        .row_not_published(pending.row, &pending.searched_key, &other.detail())
                ),
            }

            entries.push(finish(pending.row, pending.searched_key, outcome));
        }
        entries
    }
}

fn finish(row: usize, searched_key: String, outcome: RowOutcome) -> ReportEntry {
    let labels = [("outcome", outcome.label().to_string())];
    metrics::counter!("backfill_publish_rows_total", &labels).increment(1);
    ReportEntry {
        row,
        searched_key,
        outcome,
    }
}
