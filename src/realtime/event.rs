//! # Change Events
//!
//! Events pushed by a remote store to its subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::record::RecordId;

/// Type of change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventType {
    /// New record inserted
    Insert,
    /// Existing record updated
    Update,
    /// Record deleted
    Delete,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Insert => write!(f, "INSERT"),
            EventType::Update => write!(f, "UPDATE"),
            EventType::Delete => write!(f, "DELETE"),
        }
    }
}

/// The change itself: `{type: insert|update|delete, record|id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Change {
    /// Full row of a newly inserted record
    Insert { record: Value },
    /// Row (or partial row) of an updated record. Always carries `id`.
    Update { record: Value },
    /// Id of a removed record
    Delete { id: RecordId },
}

impl Change {
    /// Event type of this change
    pub fn event_type(&self) -> EventType {
        match self {
            Change::Insert { .. } => EventType::Insert,
            Change::Update { .. } => EventType::Update,
            Change::Delete { .. } => EventType::Delete,
        }
    }

    /// Id of the record this change targets, if it can be read
    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            Change::Insert { record } | Change::Update { record } => {
                record.get("id").and_then(RecordId::from_value)
            }
            Change::Delete { id } => Some(id.clone()),
        }
    }
}

/// A sequenced change on one collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Commit sequence assigned by the publishing store, strictly increasing
    pub sequence: u64,

    /// Collection name
    pub collection: String,

    /// What changed
    pub change: Change,

    /// Commit time
    pub timestamp: DateTime<Utc>,
}

impl ChangeEvent {
    /// Create an event stamped with the current time
    pub fn new(sequence: u64, collection: impl Into<String>, change: Change) -> Self {
        Self {
            sequence,
            collection: collection.into(),
            change,
            timestamp: Utc::now(),
        }
    }

    /// Create an INSERT event
    pub fn insert(sequence: u64, collection: impl Into<String>, record: Value) -> Self {
        Self::new(sequence, collection, Change::Insert { record })
    }

    /// Create an UPDATE event
    pub fn update(sequence: u64, collection: impl Into<String>, record: Value) -> Self {
        Self::new(sequence, collection, Change::Update { record })
    }

    /// Create a DELETE event
    pub fn delete(sequence: u64, collection: impl Into<String>, id: impl Into<RecordId>) -> Self {
        Self::new(sequence, collection, Change::Delete { id: id.into() })
    }

    /// Event type
    pub fn event_type(&self) -> EventType {
        self.change.event_type()
    }
}
