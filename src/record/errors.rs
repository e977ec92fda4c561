//! # Record Errors

use thiserror::Error;

/// Result type for record decoding and encoding
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors raised at the record ingestion boundary
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// Row is not a JSON object
    #[error("Record is not a JSON object")]
    NotAnObject,

    /// Row has no `id` field
    #[error("Record has no id")]
    MissingId,

    /// `id` is neither a string nor an integer
    #[error("Invalid record id: {0}")]
    InvalidId(String),

    /// A timestamp field could not be coerced
    #[error("Invalid timestamp in field '{field}': {reason}")]
    InvalidTimestamp { field: String, reason: String },

    /// Schema-level decode failure
    #[error("Decode failed: {0}")]
    Decode(String),

    /// Schema-level encode failure
    #[error("Encode failed: {0}")]
    Encode(String),
}

impl RecordError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RecordError::NotAnObject => "RTM_RECORD_NOT_OBJECT",
            RecordError::MissingId => "RTM_RECORD_MISSING_ID",
            RecordError::InvalidId(_) => "RTM_RECORD_INVALID_ID",
            RecordError::InvalidTimestamp { .. } => "RTM_RECORD_INVALID_TIMESTAMP",
            RecordError::Decode(_) => "RTM_RECORD_DECODE",
            RecordError::Encode(_) => "RTM_RECORD_ENCODE",
        }
    }
}
