//! # Mirror Errors

use thiserror::Error;

use super::mutation::MutationKind;
use crate::record::RecordId;
use crate::remote::RemoteError;

/// Result type for mirror operations
pub type MirrorResult<T> = Result<T, MirrorError>;

/// Mirror errors.
///
/// None of these are fatal: a mirror can always be torn down and
/// initialized again. Nothing is retried automatically.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MirrorError {
    /// Initial fetch failed; the mirror is empty
    #[error("Initial fetch of '{collection}' failed: {source}")]
    Fetch {
        collection: String,
        source: RemoteError,
    },

    /// Change feed could not be opened
    #[error("Subscribing to '{collection}' failed: {source}")]
    Subscribe {
        collection: String,
        source: RemoteError,
    },

    /// Remote rejected a mutation; local state is unchanged
    #[error("Remote {operation} failed: {source}")]
    RemoteWrite {
        operation: MutationKind,
        source: RemoteError,
    },

    /// Update/delete target absent from a live mirror (strict lookup only)
    #[error("Record {0} not found locally")]
    NotFoundLocally(RecordId),

    /// Mutation payload is malformed
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Teardown happened while initialization was in flight
    #[error("Initialization cancelled by teardown")]
    Cancelled,

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl MirrorError {
    /// Returns the stable error code
    pub fn code(&self) -> &'static str {
        match self {
            MirrorError::Fetch { .. } => "RTM_MIRROR_FETCH",
            MirrorError::Subscribe { .. } => "RTM_MIRROR_SUBSCRIBE",
            MirrorError::RemoteWrite { .. } => "RTM_MIRROR_REMOTE_WRITE",
            MirrorError::NotFoundLocally(_) => "RTM_MIRROR_NOT_FOUND_LOCALLY",
            MirrorError::InvalidPayload(_) => "RTM_MIRROR_INVALID_PAYLOAD",
            MirrorError::Cancelled => "RTM_MIRROR_CANCELLED",
            MirrorError::InvalidConfig(_) => "RTM_MIRROR_INVALID_CONFIG",
        }
    }

    /// Underlying remote failure, if any
    pub fn remote_cause(&self) -> Option<&RemoteError> {
        match self {
            MirrorError::Fetch { source, .. }
            | MirrorError::Subscribe { source, .. }
            | MirrorError::RemoteWrite { source, .. } => Some(source),
            _ => None,
        }
    }
}
