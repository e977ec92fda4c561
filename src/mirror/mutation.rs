//! # Mutations
//!
//! Write requests forwarded to the remote store. They never touch the mirror
//! directly: the mirror changes when the resulting change event arrives.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

use super::errors::{MirrorError, MirrorResult};
use crate::record::RecordId;

/// A write request
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Create a record from every field except `id`
    Insert(Value),
    /// Merge `fields` onto the record with `id`
    Update { id: RecordId, fields: Value },
    /// Remove one record
    Delete(RecordId),
    /// Remove every record in the collection
    DeleteAll,
}

/// Kind of mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Insert,
    Update,
    Delete,
    DeleteAll,
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MutationKind::Insert => "insert",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
            MutationKind::DeleteAll => "delete_all",
        };
        write!(f, "{}", name)
    }
}

/// What the remote reported back
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum MutationOutcome {
    /// Id assigned by the remote
    Inserted(RecordId),
    Updated,
    Deleted,
    /// Number of records removed
    Cleared(u64),
}

impl Mutation {
    /// Kind of this mutation
    pub fn kind(&self) -> MutationKind {
        match self {
            Mutation::Insert(_) => MutationKind::Insert,
            Mutation::Update { .. } => MutationKind::Update,
            Mutation::Delete(_) => MutationKind::Delete,
            Mutation::DeleteAll => MutationKind::DeleteAll,
        }
    }

    /// Id this mutation targets, for update and delete
    pub fn target(&self) -> Option<&RecordId> {
        match self {
            Mutation::Update { id, .. } | Mutation::Delete(id) => Some(id),
            Mutation::Insert(_) | Mutation::DeleteAll => None,
        }
    }

    /// Check payload shape and drop any `id` from insert/update fields
    pub fn normalized(self) -> MirrorResult<Self> {
        match self {
            Mutation::Insert(fields) => Ok(Mutation::Insert(strip_id(fields, MutationKind::Insert)?)),
            Mutation::Update { id, fields } => Ok(Mutation::Update {
                id,
                fields: strip_id(fields, MutationKind::Update)?,
            }),
            other => Ok(other),
        }
    }
}

fn strip_id(fields: Value, kind: MutationKind) -> MirrorResult<Value> {
    match fields {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(Value::Object(map))
        }
        other => Err(MirrorError::InvalidPayload(format!(
            "{} payload must be a JSON object, got {}",
            kind, other
        ))),
    }
}
