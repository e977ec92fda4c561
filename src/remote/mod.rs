//! # Remote Stores
//!
//! The backend contract a mirror consumes, plus two bundled stores:
//!
//! - [`MemoryStore`]: in-process tables with fault injection
//! - [`LocalStore`]: one JSON file holding a full array per collection key

mod errors;
mod local;
mod memory;

pub use errors::{RemoteError, RemoteResult};
pub use local::{LocalStore, NEXT_IDS_KEY};
pub use memory::{Fault, MemoryStore};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::realtime::ChangeFeed;
use crate::record::RecordId;

/// Result of a full-collection fetch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedCollection {
    /// Raw rows
    pub rows: Vec<Value>,

    /// Sequence of the last change already reflected by `rows`
    pub watermark: u64,
}

/// A document/row store addressable by collection name.
///
/// Every write is expected to surface later as a change event on the
/// collection's feed; the mirror never applies writes itself.
#[async_trait]
pub trait RemoteStore: Send + Sync + std::fmt::Debug {
    /// Fetch every row of a collection
    async fn fetch_all(&self, collection: &str) -> RemoteResult<FetchedCollection>;

    /// Insert a row. The store assigns and returns its id.
    async fn insert(&self, collection: &str, fields: Value) -> RemoteResult<RecordId>;

    /// Merge `fields` onto the row with the given id
    async fn update(&self, collection: &str, id: &RecordId, fields: Value) -> RemoteResult<()>;

    /// Remove one row
    async fn delete(&self, collection: &str, id: &RecordId) -> RemoteResult<()>;

    /// Remove every row, returning how many were removed
    async fn delete_all(&self, collection: &str) -> RemoteResult<u64>;

    /// Open a change feed on a collection
    async fn subscribe(&self, collection: &str) -> RemoteResult<ChangeFeed>;

    /// Close a change feed
    fn unsubscribe(&self, subscription_id: &str) -> RemoteResult<()>;
}

/// Validate a write payload as a JSON object and strip any `id`
pub(crate) fn object_payload(fields: Value) -> RemoteResult<Map<String, Value>> {
    match fields {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(RemoteError::Rejected(format!(
            "payload must be a JSON object, got {}",
            other
        ))),
    }
}

/// Id of a stored row
pub(crate) fn row_id(row: &Value) -> Option<RecordId> {
    row.get("id").and_then(RecordId::from_value)
}
