use std::fs::File;
use std::io;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::envelope::EventEnvelope;

pub const SEARCHED_KEY_HEADER: &str = "Searched_PK";
pub const BODY_HEADER: &str = "Found_Item_Body";

pub const NOT_FOUND_MARKER: &str = "NOT_FOUND";
pub const QUERY_ERROR_MARKER: &str = "QUERY_ERROR";
// Written by the first generation of the export tooling.
const LEGACY_QUERY_ERROR_MARKER: &str = "ERROR_DURING_QUERY";

#[derive(Error, Debug)]
pub enum StagingError {
    #[error("failed to open {path}: {error}")]
    Open { path: String, error: io::Error },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("input has no column named '{0}'")]
    MissingColumn(String),
    #[error("failed to encode envelope: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to flush staged rows: {0}")]
    Flush(#[from] io::Error),
}

/// What a lookup produced for one unique key.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(Vec<EventEnvelope>),
    NotFound,
    /// The retrieval failed, with the store's reason.
    QueryError(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StagedOutcome {
    pub key: String,
    pub outcome: LookupOutcome,
}

/// A single staged line: the key that was searched and either an envelope or a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedRow {
    pub searched_key: String,
    pub body: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    NotFound,
    QueryError,
}

impl Marker {
    pub fn parse(body: &str) -> Option<Self> {
        match body.trim() {
            NOT_FOUND_MARKER => Some(Marker::NotFound),
            QUERY_ERROR_MARKER | LEGACY_QUERY_ERROR_MARKER => Some(Marker::QueryError),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Marker::NotFound => NOT_FOUND_MARKER,
            Marker::QueryError => QUERY_ERROR_MARKER,
        }
    }
}

/// The body of a staged row, once classified.
#[derive(Debug, Clone, PartialEq)]
pub enum StagedBody {
    Marker(Marker),
    Envelope(Box<EventEnvelope>),
    /// Not an envelope, with the parser's complaint.
    Malformed(String),
}

impl StagedRow {
    pub fn parse_body(&self) -> StagedBody {
        if let Some(marker) = Marker::parse(&self.body) {
            return StagedBody::Marker(marker);
        }
        match serde_json::from_str::<EventEnvelope>(&self.body) {
            Ok(envelope) => StagedBody::Envelope(Box::new(envelope)),
            Err(e) => StagedBody::Malformed(e.to_string()),
        }
    }
}

impl StagedOutcome {
    /// One row per found record, or a single marker row.
    pub fn rows(&self) -> Result<Vec<StagedRow>, StagingError> {
        let row = |body: String| StagedRow {
            searched_key: self.key.clone(),
            body,
        };

        match &self.outcome {
            LookupOutcome::Found(envelopes) => envelopes
                .iter()
                .map(|envelope| {
                    encode_envelope_pretty(envelope)
                        .map(&row)
                        .map_err(StagingError::from)
                })
                .collect(),
            LookupOutcome::NotFound => Ok(vec![row(NOT_FOUND_MARKER.to_owned())]),
            LookupOutcome::QueryError(_) => Ok(vec![row(QUERY_ERROR_MARKER.to_owned())]),
        }
    }
}

/// Envelope JSON as staged: four space indent, non-ASCII left as is.
pub fn encode_envelope_pretty(envelope: &EventEnvelope) -> Result<String, serde_json::Error> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    envelope.serialize(&mut serializer)?;

    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// Destination for lookup outcomes. Implementations must make an outcome durable before
/// returning, so an interrupted batch keeps everything staged so far.
pub trait StagingSink {
    fn stage(&mut self, outcome: &StagedOutcome) -> Result<(), StagingError>;
}

pub struct CsvStagingWriter<W: io::Write> {
    writer: csv::Writer<W>,
}

impl CsvStagingWriter<File> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, StagingError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|error| StagingError::Open {
            path: path.display().to_string(),
            error,
        })?;
        Self::new(file)
    }
}

impl<W: io::Write> CsvStagingWriter<W> {
    /// Wrap `inner` and write the header row.
    pub fn new(inner: W) -> Result<Self, StagingError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);
        writer.write_record([SEARCHED_KEY_HEADER, BODY_HEADER])?;
        writer.flush()?;

        Ok(Self { writer })
    }

    pub fn into_inner(self) -> Result<W, StagingError> {
        self.writer
            .into_inner()
            .map_err(|e| StagingError::Flush(e.into_error()))
    }
}

impl<W: io::Write> StagingSink for CsvStagingWriter<W> {
    fn stage(&mut self, outcome: &StagedOutcome) -> Result<(), StagingError> {
        for row in outcome.rows()? {
            self.writer
                .write_record([row.searched_key.as_str(), row.body.as_str()])?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps staged outcomes in memory.
#[derive(Debug, Default)]
pub struct MemoryStaging {
    pub outcomes: Vec<StagedOutcome>,
}

impl StagingSink for MemoryStaging {
    fn stage(&mut self, outcome: &StagedOutcome) -> Result<(), StagingError> {
        self.outcomes.push(outcome.clone());
        Ok(())
    }
}

pub fn open_input(path: impl AsRef<Path>) -> Result<File, StagingError> {
    let path = path.as_ref();
    File::open(path).map_err(|error| StagingError::Open {
        path: path.display().to_string(),
        error,
    })
}

/// Read every value of `column` from a headed CSV, duplicates included.
pub fn read_lookup_keys<R: io::Read>(reader: R, column: &str) -> Result<Vec<String>, StagingError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let index = reader
        .headers()?
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| StagingError::MissingColumn(column.to_owned()))?;

    let mut keys = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(key) = record.get(index) {
            keys.push(key.to_owned());
        }
    }

    Ok(keys)
}

/// Read staged rows back. Short rows get empty fields and invalid UTF-8 is replaced, so that
/// a bad row surfaces as a malformed body instead of failing the whole read.
pub fn read_staged_rows<R: io::Read>(reader: R) -> Result<Vec<StagedRow>, StagingError> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record?;
        let field = |i: usize| {
            record
                .get(i)
                .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
                .unwrap_or_default()
        };
        rows.push(StagedRow {
            searched_key: field(0),
            body: field(1),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{transform_record, RawRecord};
    use crate::time::FixedTime;
    use crate::value::StoreValue;
    use chrono::{TimeZone, Utc};

    fn envelope(key: &str) -> EventEnvelope {
        let record: RawRecord = [
            ("PK".to_owned(), StoreValue::from(key)),
            ("member_id".to_owned(), StoreValue::from("José")),
        ]
        .into_iter()
        .collect();
        let time = FixedTime {
            time: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
        };
        transform_record(&record, &time)
    }

    #[test]
    fn test_outcome_rows() {
        let found = StagedOutcome {
            key: "a".to_owned(),
            outcome: LookupOutcome::Found(vec![envelope("a"), envelope("a")]),
        };
        let rows = found.rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.searched_key == "a"));

        let missing = StagedOutcome {
            key: "b".to_owned(),
            outcome: LookupOutcome::NotFound,
        };
        assert_eq!(missing.rows().unwrap()[0].body, "NOT_FOUND");

        let failed = StagedOutcome {
            key: "c".to_owned(),
            outcome: LookupOutcome::QueryError("throttled".to_owned()),
        };
        assert_eq!(failed.rows().unwrap()[0].body, "QUERY_ERROR");
    }

    #[test]
    fn test_pretty_encoding_keeps_non_ascii() {
        let encoded = encode_envelope_pretty(&envelope("k")).unwrap();

        assert!(encoded.contains("\n    \"eventType\": \"EVENT_CREATED\""));
        assert!(encoded.contains("José"));
    }

    #[test]
    fn test_csv_staging_round_trip() {
        let mut writer = CsvStagingWriter::new(Vec::new()).unwrap();
        writer
            .stage(&StagedOutcome {
                key: "a".to_owned(),
                outcome: LookupOutcome::Found(vec![envelope("a")]),
            })
            .unwrap();
        writer
            .stage(&StagedOutcome {
                key: "b".to_owned(),
                outcome: LookupOutcome::NotFound,
            })
            .unwrap();

        let written = writer.into_inner().unwrap();
        assert!(written.starts_with(b"Searched_PK,Found_Item_Body\n"));

        let rows = read_staged_rows(written.as_slice()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0].parse_body(),
            StagedBody::Envelope(Box::new(envelope("a")))
        );
        assert_eq!(rows[1].parse_body(), StagedBody::Marker(Marker::NotFound));
    }

    #[test]
    fn test_csv_staging_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staged.csv");

        let mut writer = CsvStagingWriter::create(&path).unwrap();
        writer
            .stage(&StagedOutcome {
                key: "x".to_owned(),
                outcome: LookupOutcome::QueryError("boom".to_owned()),
            })
            .unwrap();

        // Flushed per outcome, readable before the writer is dropped
        let rows = read_staged_rows(open_input(&path).unwrap()).unwrap();
        assert_eq!(
            rows,
            vec![StagedRow {
                searched_key: "x".to_owned(),
                body: "QUERY_ERROR".to_owned()
            }]
        );
    }

    #[test]
    fn test_parse_body_classification() {
        let row = |body: &str| StagedRow {
            searched_key: "k".to_owned(),
            body: body.to_owned(),
        };

        assert_eq!(
            row("ERROR_DURING_QUERY").parse_body(),
            StagedBody::Marker(Marker::QueryError)
        );
        assert!(matches!(
            row("{not json").parse_body(),
            StagedBody::Malformed(_)
        ));
        assert!(matches!(
            row(r#"{"eventType": "EVENT_CREATED"}"#).parse_body(),
            StagedBody::Malformed(_)
        ));
        assert!(matches!(row("").parse_body(), StagedBody::Malformed(_)));
    }

    #[test]
    fn test_read_lookup_keys_keeps_duplicates() {
        let input = "Name,Idempotency Key\nfirst,k1\nsecond,k2\nthird,k1\n";

        let keys = read_lookup_keys(input.as_bytes(), "Idempotency Key").unwrap();

        assert_eq!(keys, vec!["k1", "k2", "k1"]);
    }

    #[test]
    fn test_read_lookup_keys_missing_column() {
        let input = "Name,Other\nfirst,k1\n";

        let result = read_lookup_keys(input.as_bytes(), "Idempotency Key");

        assert!(matches!(result, Err(StagingError::MissingColumn(c)) if c == "Idempotency Key"));
    }

    #[test]
    fn test_read_staged_rows_tolerates_short_rows() {
        let input = "Searched_PK,Found_Item_Body\nonly-a-key\n";

        let rows = read_staged_rows(input.as_bytes()).unwrap();

        assert_eq!(rows[0].searched_key, "only-a-key");
        assert!(matches!(rows[0].parse_body(), StagedBody::Malformed(_)));
    }

    #[test]
    fn test_open_input_missing_file() {
        let result = open_input("/definitely/not/here.csv");
        assert!(matches!(result, Err(StagingError::Open { .. })));
    }
}
