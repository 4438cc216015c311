use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::time::{format_timestamp, TimeSource};
use crate::value::{coerce_string, StoreValue};

pub const EVENT_TYPE: &str = "EVENT_CREATED";
pub const ENVELOPE_VERSION: &str = "v1.0";

pub const PARTITION_KEY_FIELD: &str = "PK";
pub const REPORTED_DATE_FIELD: &str = "reported_date";
pub const BUSINESS_UNIT_FIELD: &str = "business_unit";
pub const MEMBER_ID_FIELD: &str = "member_id";
pub const EVENT_TYPE_FIELD: &str = "event_type";
pub const AMOUNT_FIELD: &str = "amount";
pub const IS_REFUND_FIELD: &str = "is_refund";

/// Every attribute a stored record is expected to carry. Only used to flag unexpected
/// attributes, the transform never filters on it.
pub const KNOWN_FIELDS: [&str; 13] = [
    "PK",
    "SK",
    "reported_date",
    "business_unit",
    "member_id",
    "event_type",
    "amount",
    "is_refund",
    "created_at",
    "entity_type",
    "transaction_id",
    "transaction_code",
    "currency",
];

/// A record as returned by the store, attribute name to value.
pub type RawRecord = HashMap<String, StoreValue>;

/// The canonical event published for every stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_type: String,
    pub date_time: String,
    pub version: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    pub data: Vec<DataObject>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataObject {
    #[serde(default)]
    pub reported_date: Option<StoreValue>,
    pub business_unit_id: String,
    #[serde(default)]
    pub member_id: Option<StoreValue>,
    #[serde(default)]
    pub event_type_id: Option<StoreValue>,
    #[serde(default)]
    pub amount: Option<StoreValue>,
    #[serde(default)]
    pub is_refund: Option<StoreValue>,
    #[serde(default)]
    pub batch: Option<String>,
}

impl EventEnvelope {
    /// The idempotency key, if it is usable for grouping (present and non-empty).
    pub fn group_key(&self) -> Option<&str> {
        self.idempotency_key
            .as_deref()
            .filter(|key| !key.is_empty())
    }
}

/// Map one stored record into an event envelope. Missing attributes become nulls, never
/// errors, and attributes outside the mapping are dropped.
pub fn transform_record(record: &RawRecord, time: &dyn TimeSource) -> EventEnvelope {
    let partition_key = record.get(PARTITION_KEY_FIELD).and_then(StoreValue::as_key);
    let field = |name: &str| record.get(name).cloned();

    let data = DataObject {
        reported_date: field(REPORTED_DATE_FIELD),
        business_unit_id: coerce_string(record.get(BUSINESS_UNIT_FIELD)),
        member_id: field(MEMBER_ID_FIELD),
        event_type_id: field(EVENT_TYPE_FIELD),
        amount: field(AMOUNT_FIELD),
        is_refund: field(IS_REFUND_FIELD),
        batch: partition_key.clone(),
    };

    EventEnvelope {
        event_type: EVENT_TYPE.to_owned(),
        date_time: format_timestamp(&time.current_time()),
        version: ENVELOPE_VERSION.to_owned(),
        idempotency_key: partition_key,
        data: vec![data],
    }
}

/// Attributes of `record` that aren't in [`KNOWN_FIELDS`], sorted.
pub fn unknown_fields(record: &RawRecord) -> Vec<&str> {
    let mut unknown: Vec<&str> = record
        .keys()
        .map(String::as_str)
        .filter(|name| !KNOWN_FIELDS.contains(name))
        .collect();
    unknown.sort_unstable();
    unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::FixedTime;
    use chrono::{DateTime, Utc};
    use serde_json::json;

    fn fixed_time() -> FixedTime {
        FixedTime {
            time: DateTime::parse_from_rfc3339("2024-05-06T07:08:09.123456Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    fn record(fields: &[(&str, StoreValue)]) -> RawRecord {
        fields
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_transform_copies_present_fields_and_nulls_missing_ones() {
        let record = record(&[
            ("PK", StoreValue::from("batch-1")),
            ("SK", StoreValue::from("item#1")),
            ("reported_date", StoreValue::from("2024-05-01")),
            ("business_unit", StoreValue::Number("42".to_owned())),
            ("member_id", StoreValue::from("m-9")),
            ("event_type", StoreValue::Number("7".to_owned())),
        ]);

        let envelope = transform_record(&record, &fixed_time());

        assert_eq!(
            serde_json::to_value(&envelope).unwrap(),
            json!({
                "eventType": "EVENT_CREATED",
                "dateTime": "2024-05-06T07:08:09.123456Z",
                "version": "v1.0",
                "idempotencyKey": "batch-1",
                "data": [{
                    "reportedDate": "2024-05-01",
                    "businessUnitId": "42",
                    "memberId": "m-9",
                    "eventTypeId": 7,
                    "amount": null,
                    "isRefund": null,
                    "batch": "batch-1",
                }]
            })
        );
    }

    #[test]
    fn test_transform_without_partition_key() {
        let record = record(&[("amount", StoreValue::Number("10.50".to_owned()))]);

        let envelope = transform_record(&record, &fixed_time());

        assert_eq!(envelope.idempotency_key, None);
        assert_eq!(envelope.group_key(), None);
        assert_eq!(envelope.data[0].batch, None);
        assert_eq!(envelope.data[0].business_unit_id, "None");

        let encoded = serde_json::to_value(&envelope).unwrap();
        assert_eq!(encoded["idempotencyKey"], json!(null));
        assert_eq!(encoded["data"][0]["amount"], json!(10.5));
    }

    #[test]
    fn test_transform_drops_unknown_fields() {
        let record = record(&[
            ("PK", StoreValue::from("batch-2")),
            ("currency", StoreValue::from("EUR")),
            ("surprise", StoreValue::Bool(true)),
        ]);

        let envelope = transform_record(&record, &fixed_time());
        let encoded = serde_json::to_string(&envelope).unwrap();

        assert!(!encoded.contains("surprise"));
        assert!(!encoded.contains("EUR"));
        assert_eq!(unknown_fields(&record), vec!["surprise"]);
    }

    #[test]
    fn test_envelope_has_exactly_the_wire_fields() {
        let envelope = transform_record(&record(&[]), &fixed_time());
        let encoded = serde_json::to_value(&envelope).unwrap();

        let mut top: Vec<&str> = encoded
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        top.sort_unstable();
        assert_eq!(
            top,
            vec!["data", "dateTime", "eventType", "idempotencyKey", "version"]
        );
        assert_eq!(encoded["data"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_group_key_rejects_empty_key() {
        let mut envelope = transform_record(
            &record(&[("PK", StoreValue::from(""))]),
            &fixed_time(),
        );
        assert_eq!(envelope.group_key(), None);

        envelope.idempotency_key = Some("k".to_owned());
        assert_eq!(envelope.group_key(), Some("k"));
    }

    #[test]
    fn test_envelope_parses_without_idempotency_key() {
        let parsed: EventEnvelope = serde_json::from_value(json!({
            "eventType": "EVENT_CREATED",
            "dateTime": "2024-05-06T07:08:09Z",
            "version": "v1.0",
            "data": [{"businessUnitId": "1"}]
        }))
        .unwrap();

        assert_eq!(parsed.idempotency_key, None);
        assert_eq!(parsed.data[0].amount, None);
    }
}
