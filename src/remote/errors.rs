//! # Remote Store Errors

use std::time::Duration;

use thiserror::Error;

use crate::realtime::RealtimeError;

/// Result type for remote store operations
pub type RemoteResult<T> = Result<T, RemoteError>;

/// Errors reported by a remote store
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// Target record does not exist remotely
    #[error("Record not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Request refused by the store (bad payload, constraint, permission)
    #[error("Rejected by remote: {0}")]
    Rejected(String),

    /// Store could not be reached
    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    /// Local persistence failure
    #[error("I/O error: {0}")]
    Io(String),

    /// Stored or received data could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Request did not complete in time
    #[error("Remote call timed out after {0:?}")]
    Timeout(Duration),

    /// Change feed failure
    #[error("Change feed error: {0}")]
    Feed(#[from] RealtimeError),
}

impl RemoteError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            RemoteError::NotFound { .. } => "RTM_REMOTE_NOT_FOUND",
            RemoteError::Rejected(_) => "RTM_REMOTE_REJECTED",
            RemoteError::Unavailable(_) => "RTM_REMOTE_UNAVAILABLE",
            RemoteError::Io(_) => "RTM_REMOTE_IO",
            RemoteError::Serialization(_) => "RTM_REMOTE_SERIALIZATION",
            RemoteError::Timeout(_) => "RTM_REMOTE_TIMEOUT",
            RemoteError::Feed(_) => "RTM_REMOTE_FEED",
        }
    }

    pub(crate) fn not_found(collection: &str, id: impl ToString) -> Self {
        RemoteError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}

impl From<std::io::Error> for RemoteError {
    fn from(e: std::io::Error) -> Self {
        RemoteError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for RemoteError {
    fn from(e: serde_json::Error) -> Self {
        RemoteError::Serialization(e.to_string())
    }
}
