//! # Schemaless Records

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use super::codec::coerce_timestamp;
use super::errors::{RecordError, RecordResult};
use super::id::RecordId;
use super::Record;

/// Field holding the creation timestamp
pub const CREATED_AT: &str = "created_at";

/// A record with no fixed schema beyond `id` and an optional `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRecord {
    pub id: RecordId,
    pub created_at: Option<DateTime<Utc>>,
    pub fields: Map<String, Value>,
}

impl JsonRecord {
    /// Look up a non-reserved field
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl Record for JsonRecord {
    fn id(&self) -> RecordId {
        self.id.clone()
    }

    fn decode(row: Value) -> RecordResult<Self> {
        let Value::Object(mut fields) = row else {
            return Err(RecordError::NotAnObject);
        };

        let raw_id = fields.remove("id").ok_or(RecordError::MissingId)?;
        let id = RecordId::from_value(&raw_id).ok_or_else(|| RecordError::InvalidId(raw_id.to_string()))?;

        let created_at = match fields.remove(CREATED_AT) {
            None | Some(Value::Null) => None,
            Some(value) => Some(coerce_timestamp(&value).map_err(|reason| {
                RecordError::InvalidTimestamp {
                    field: CREATED_AT.to_string(),
                    reason,
                }
            })?),
        };

        Ok(Self { id, created_at, fields })
    }

    fn encode(&self) -> RecordResult<Value> {
        let mut row = Map::with_capacity(self.fields.len() + 2);
        row.insert("id".to_string(), self.id.to_value());
        if let Some(ts) = self.created_at {
            row.insert(CREATED_AT.to_string(), Value::String(ts.to_rfc3339()));
        }
        for (key, value) in &self.fields {
            row.insert(key.clone(), value.clone());
        }
        Ok(Value::Object(row))
    }
}

impl Serialize for JsonRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.encode()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_splits_reserved_fields() {
        let record = JsonRecord::decode(json!({
            "id": "1",
            "name": "x",
            "created_at": "2024-01-02T03:04:05Z"
        }))
        .unwrap();

        assert_eq!(record.id, RecordId::from("1"));
        assert_eq!(record.field("name"), Some(&json!("x")));
        assert!(record.field("id").is_none());
        assert_eq!(record.created_at.unwrap().timestamp(), 1704164645);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(JsonRecord::decode(json!([])), Err(RecordError::NotAnObject));
        assert_eq!(JsonRecord::decode(json!({"name": "x"})), Err(RecordError::MissingId));
        assert!(matches!(
            JsonRecord::decode(json!({"id": true})),
            Err(RecordError::InvalidId(_))
        ));
        assert!(matches!(
            JsonRecord::decode(json!({"id": 1, "created_at": "later"})),
            Err(RecordError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_encode_roundtrips_shape() {
        let row = json!({"id": 3, "name": "x", "created_at": 0});
        let record = JsonRecord::decode(row).unwrap();
        let encoded = record.encode().unwrap();
        assert_eq!(encoded["id"], json!(3));
        assert_eq!(encoded["name"], json!("x"));
        assert_eq!(encoded["created_at"], json!("1970-01-01T00:00:00+00:00"));
        assert_eq!(serde_json::to_value(&record).unwrap(), encoded);
    }
}
