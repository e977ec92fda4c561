//! # Row Codec
//!
//! Helpers for writing [`Record`](super::Record) implementations:
//! serde-backed decode/encode, timestamp coercion and partial-update merging.
//!
//! Remote stores disagree on how they ship timestamps. Supabase sends RFC 3339
//! strings, Postgres text output drops the `T` and sometimes the offset
//! minutes, Firestore sends `{seconds, nanoseconds}` and local-storage apps
//! usually store epoch milliseconds. [`coerce_timestamp`] accepts all of them.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::errors::{RecordError, RecordResult};

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];
const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Coerce a JSON value into a UTC timestamp.
pub fn coerce_timestamp(value: &Value) -> Result<DateTime<Utc>, String> {
    match value {
        Value::String(s) => parse_timestamp_str(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .ok_or_else(|| format!("epoch millis out of range: {}", n)),
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)
                .ok_or_else(|| "object timestamp without seconds".to_string())?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let nanos = u32::try_from(nanos).map_err(|_| format!("nanoseconds out of range: {}", nanos))?;
            Utc.timestamp_opt(seconds, nanos)
                .single()
                .ok_or_else(|| format!("seconds out of range: {}", seconds))
        }
        other => Err(format!("unsupported timestamp value: {}", other)),
    }
}

fn parse_timestamp_str(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    Err(format!("unrecognized timestamp string: '{}'", s))
}

/// Coerce `row[field]` in place into an RFC 3339 string.
///
/// Missing and `null` fields are left untouched.
pub fn normalize_timestamp_field(row: &mut Value, field: &str) -> RecordResult<()> {
    let Some(map) = row.as_object_mut() else {
        return Err(RecordError::NotAnObject);
    };
    if let Some(value) = map.get_mut(field) {
        if value.is_null() {
            return Ok(());
        }
        let ts = coerce_timestamp(value).map_err(|reason| RecordError::InvalidTimestamp {
            field: field.to_string(),
            reason,
        })?;
        *value = Value::String(ts.to_rfc3339());
    }
    Ok(())
}

/// Decode a row through serde.
pub fn decode_serde<T: DeserializeOwned>(row: Value) -> RecordResult<T> {
    if !row.is_object() {
        return Err(RecordError::NotAnObject);
    }
    serde_json::from_value(row).map_err(|e| RecordError::Decode(e.to_string()))
}

/// Encode a record through serde.
pub fn encode_serde<T: Serialize>(record: &T) -> RecordResult<Value> {
    serde_json::to_value(record).map_err(|e| RecordError::Encode(e.to_string()))
}

/// Shallow-merge `patch` onto `target`.
///
/// Fields present in the patch replace the target's, the rest are kept.
/// The `id` field of the target is never overwritten.
pub fn merge_patch(target: &mut Value, patch: &Value) -> RecordResult<()> {
    let (Some(target), Some(patch)) = (target.as_object_mut(), patch.as_object()) else {
        return Err(RecordError::NotAnObject);
    };
    for (key, value) in patch {
        if key == "id" && target.contains_key("id") {
            continue;
        }
        target.insert(key.clone(), value.clone());
    }
    Ok(())
}

/// Serde adapter for `DateTime<Utc>` fields fed by [`coerce_timestamp`].
///
/// ```ignore
/// #[serde(with = "rtmirror::record::codec::timestamp")]
/// created_at: DateTime<Utc>,
/// ```
pub mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&ts.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let value = Value::deserialize(deserializer)?;
        super::coerce_timestamp(&value).map_err(D::Error::custom)
    }
}

/// Same as [`timestamp`] for optional fields. Pair with `#[serde(default)]`.
pub mod timestamp_opt {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(
        ts: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => serializer.serialize_str(&ts.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            value => super::coerce_timestamp(&value).map(Some).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use serde::Deserialize;
    use serde_json::json;

    fn expected() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_coerce_rfc3339() {
        assert_eq!(coerce_timestamp(&json!("2024-03-01T12:30:00Z")).unwrap(), expected());
        assert_eq!(
            coerce_timestamp(&json!("2024-03-01T14:30:00+02:00")).unwrap(),
            expected()
        );
    }

    #[test]
    fn test_coerce_postgres_text() {
        assert_eq!(coerce_timestamp(&json!("2024-03-01 12:30:00+00")).unwrap(), expected());
        assert_eq!(coerce_timestamp(&json!("2024-03-01 12:30:00")).unwrap(), expected());
        let with_fraction = coerce_timestamp(&json!("2024-03-01T12:30:00.250")).unwrap();
        assert_eq!(with_fraction.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_coerce_epoch_millis() {
        let ms = expected().timestamp_millis();
        assert_eq!(coerce_timestamp(&json!(ms)).unwrap(), expected());
    }

    #[test]
    fn test_coerce_seconds_object() {
        let secs = expected().timestamp();
        assert_eq!(
            coerce_timestamp(&json!({"seconds": secs, "nanoseconds": 0})).unwrap(),
            expected()
        );
        assert_eq!(coerce_timestamp(&json!({"_seconds": secs})).unwrap(), expected());
    }

    #[test]
    fn test_coerce_rejects_garbage() {
        assert!(coerce_timestamp(&json!("yesterday")).is_err());
        assert!(coerce_timestamp(&json!(true)).is_err());
        assert!(coerce_timestamp(&json!({"nanoseconds": 5})).is_err());
    }

    #[test]
    fn test_normalize_field() {
        let mut row = json!({"id": 1, "created_at": {"seconds": expected().timestamp()}});
        normalize_timestamp_field(&mut row, "created_at").unwrap();
        assert_eq!(row["created_at"], json!(expected().to_rfc3339()));

        let mut untouched = json!({"id": 1, "created_at": null});
        normalize_timestamp_field(&mut untouched, "created_at").unwrap();
        assert!(untouched["created_at"].is_null());

        let mut bad = json!({"id": 1, "created_at": "soon"});
        let err = normalize_timestamp_field(&mut bad, "created_at").unwrap_err();
        assert_eq!(err.code(), "RTM_RECORD_INVALID_TIMESTAMP");
    }

    #[test]
    fn test_merge_patch_keeps_unpatched_fields() {
        let mut target = json!({"id": "1", "name": "x", "done": false});
        merge_patch(&mut target, &json!({"done": true, "id": "2"})).unwrap();
        assert_eq!(target, json!({"id": "1", "name": "x", "done": true}));
    }

    #[test]
    fn test_merge_patch_requires_objects() {
        let mut target = json!({"id": "1"});
        assert_eq!(merge_patch(&mut target, &json!([1])), Err(RecordError::NotAnObject));
    }

    #[derive(Debug, Deserialize)]
    struct Stamped {
        #[serde(with = "timestamp")]
        created_at: DateTime<Utc>,
        #[serde(default, with = "timestamp_opt")]
        done_at: Option<DateTime<Utc>>,
    }

    #[test]
    fn test_serde_adapters() {
        let stamped: Stamped = decode_serde(json!({"created_at": "2024-03-01 12:30:00"})).unwrap();
        assert_eq!(stamped.created_at.year(), 2024);
        assert!(stamped.done_at.is_none());

        let err = decode_serde::<Stamped>(json!({"created_at": false})).unwrap_err();
        assert_eq!(err.code(), "RTM_RECORD_DECODE");
    }
}
