//! # Record Identifiers

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a record: a string or an integer.
///
/// Serialized untagged, so `"abc"` and `42` both round-trip as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Text(String),
}

impl RecordId {
    /// Read an id out of a JSON value. Only strings and integers qualify.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(RecordId::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(RecordId::Number),
            _ => None,
        }
    }

    /// JSON representation of this id
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Number(n) => Value::from(*n),
            RecordId::Text(s) => Value::from(s.as_str()),
        }
    }

    /// Parse user input: integers become `Number`, anything else `Text`.
    pub fn parse(input: &str) -> Self {
        input
            .parse::<i64>()
            .map(RecordId::Number)
            .unwrap_or_else(|_| RecordId::Text(input.to_string()))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Number(n) => write!(f, "{}", n),
            RecordId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::Text(s.to_string())
    }
}

impl From<String> for RecordId {
    fn from(s: String) -> Self {
        RecordId::Text(s)
    }
}

impl From<i64> for RecordId {
    fn from(n: i64) -> Self {
        RecordId::Number(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_value() {
        assert_eq!(RecordId::from_value(&json!("a1")), Some(RecordId::from("a1")));
        assert_eq!(RecordId::from_value(&json!(7)), Some(RecordId::Number(7)));
        assert_eq!(RecordId::from_value(&json!(1.5)), None);
        assert_eq!(RecordId::from_value(&json!(null)), None);
    }

    #[test]
    fn test_untagged_serde() {
        let text: RecordId = serde_json::from_value(json!("abc")).unwrap();
        let num: RecordId = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(text, RecordId::from("abc"));
        assert_eq!(num, RecordId::Number(42));
        assert_eq!(serde_json::to_value(&num).unwrap(), json!(42));
    }

    #[test]
    fn test_parse_user_input() {
        assert_eq!(RecordId::parse("12"), RecordId::Number(12));
        assert_eq!(RecordId::parse("x-12"), RecordId::from("x-12"));
        assert_eq!(RecordId::parse("12").to_string(), "12");
    }
}
