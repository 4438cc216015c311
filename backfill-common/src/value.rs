use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Literal written for a null or missing value when a field must be rendered as a string.
/// This is what the legacy export produced, and downstream consumers already match on it.
pub const NULL_STRING_LITERAL: &str = "None";

// u64::MAX has 20 digits, anything longer can only be a float.
const MAX_INTEGER_DIGITS: usize = 20;

/// A value read from the record store.
///
/// Numbers keep the store's decimal text, so nothing is rounded until the value is encoded;
/// the `Serialize` impl is where numbers get coerced into JSON integers or floats.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreValue {
    String(String),
    Number(String),
    Bool(bool),
    Null,
    List(Vec<StoreValue>),
    Map(BTreeMap<String, StoreValue>),
}

/// Result of coercing a store decimal into something JSON can carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoercedNumber {
    Integer(i64),
    Unsigned(u64),
    Float(f64),
}

impl StoreValue {
    pub fn is_null(&self) -> bool {
        matches!(self, StoreValue::Null)
    }

    /// The value as a key-like string. Only scalar strings and numbers qualify.
    pub fn as_key(&self) -> Option<String> {
        match self {
            StoreValue::String(s) => Some(s.clone()),
            StoreValue::Number(text) => Some(text.clone()),
            _ => None,
        }
    }
}

/// Render an optional store value as a string, whatever its kind.
pub fn coerce_string(value: Option<&StoreValue>) -> String {
    match value {
        None | Some(StoreValue::Null) => NULL_STRING_LITERAL.to_owned(),
        Some(StoreValue::String(s)) => s.clone(),
        Some(StoreValue::Number(text)) => text.clone(),
        Some(StoreValue::Bool(true)) => "True".to_owned(),
        Some(StoreValue::Bool(false)) => "False".to_owned(),
        Some(composite) => serde_json::to_string(composite).unwrap_or_default(),
    }
}

/// Coerce a decimal string into an integer if it has no fractional part, or a float otherwise.
///
/// Integrality is decided on the text itself (exponent included), so `1.0`, `100e-2` and `1e3`
/// are all integers. Integers that don't fit in 64 bits fall back to a float. Returns `None`
/// for text that isn't a finite decimal.
pub fn coerce_number(text: &str) -> Option<CoercedNumber> {
    let text = text.trim();

    if let Some(integer) = integer_text(text) {
        if let Ok(value) = integer.parse::<i64>() {
            return Some(CoercedNumber::Integer(value));
        }
        if let Ok(value) = integer.parse::<u64>() {
            return Some(CoercedNumber::Unsigned(value));
        }
    }

    text.parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .map(CoercedNumber::Float)
}

/// Canonical integer digits for `text`, if it is a decimal with a zero fractional part.
fn integer_text(text: &str) -> Option<String> {
    let (negative, unsigned) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i64>().ok()?),
        None => (unsigned, 0),
    };

    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return None;
    }

    // Position of the decimal point within the significant digits, once leading and trailing
    // zeros are gone.
    let digits = format!("{whole}{fraction}");
    let leading = digits.len() - digits.trim_start_matches('0').len();
    let significant = digits.trim_matches('0');
    if significant.is_empty() {
        return Some("0".to_owned());
    }
    let point = i64::try_from(whole.len())
        .ok()?
        .checked_sub(i64::try_from(leading).ok()?)?
        .checked_add(exponent)?;

    let point = usize::try_from(point).ok()?;
    if point < significant.len() || point > MAX_INTEGER_DIGITS {
        return None;
    }

    let sign = if negative { "-" } else { "" };
    Some(format!(
        "{sign}{significant}{}",
        "0".repeat(point - significant.len())
    ))
}

impl Serialize for StoreValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StoreValue::String(s) => serializer.serialize_str(s),
            StoreValue::Number(text) => match coerce_number(text) {
                Some(CoercedNumber::Integer(value)) => serializer.serialize_i64(value),
                Some(CoercedNumber::Unsigned(value)) => serializer.serialize_u64(value),
                Some(CoercedNumber::Float(value)) => serializer.serialize_f64(value),
                None => serializer.serialize_str(text),
            },
            StoreValue::Bool(b) => serializer.serialize_bool(*b),
            StoreValue::Null => serializer.serialize_unit(),
            StoreValue::List(items) => serializer.collect_seq(items),
            StoreValue::Map(entries) => serializer.collect_map(entries),
        }
    }
}

impl<'de> Deserialize<'de> for StoreValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(StoreValue::from)
    }
}

impl From<serde_json::Value> for StoreValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => StoreValue::Null,
            serde_json::Value::Bool(b) => StoreValue::Bool(b),
            serde_json::Value::Number(n) => StoreValue::Number(n.to_string()),
            serde_json::Value::String(s) => StoreValue::String(s),
            serde_json::Value::Array(items) => {
                StoreValue::List(items.into_iter().map(StoreValue::from).collect())
            }
            serde_json::Value::Object(entries) => StoreValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, StoreValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&str> for StoreValue {
    fn from(value: &str) -> Self {
        StoreValue::String(value.to_owned())
    }
}
