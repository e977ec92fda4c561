//! # Local Store
//!
//! File-backed store in the style of browser `localStorage`: one JSON object
//! whose keys are collection names and whose values are the full array of
//! rows for that collection. There is no schema versioning.
//!
//! Ids are sequential integers drawn from a per-collection counter kept under
//! the reserved [`NEXT_IDS_KEY`]; an id is never handed out twice, even after
//! its row is deleted. `created_at` is stored as epoch milliseconds. Writes are serialized through an async mutex and replace the
//! file via temp-file + rename. Change events reach in-process subscribers
//! only.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use super::errors::{RemoteError, RemoteResult};
use super::{object_payload, row_id, FetchedCollection, RemoteStore};
use crate::realtime::{Change, ChangeFeed, ChangeHub};
use crate::record::codec::merge_patch;
use crate::record::RecordId;

type Collections = Map<String, Value>;

/// Reserved top-level key holding the next id of every collection
pub const NEXT_IDS_KEY: &str = "__next_ids";

/// File-backed remote store
#[derive(Debug)]
pub struct LocalStore {
    path: PathBuf,
    hub: ChangeHub,
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Open a store at `path`. The file is created on first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            hub: ChangeHub::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> RemoteResult<Collections> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(e.into()),
        };
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&content)? {
            Value::Object(map) => Ok(map),
            _ => Err(RemoteError::Serialization(format!(
                "{} does not hold a JSON object",
                self.path.display()
            ))),
        }
    }

    async fn save(&self, collections: &Collections) -> RemoteResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let data = serde_json::to_vec_pretty(collections)?;
        let tmp = self.path.with_extension("tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    fn rows_mut<'a>(collections: &'a mut Collections, collection: &str) -> RemoteResult<&'a mut Vec<Value>> {
        let entry = collections
            .entry(collection.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        entry.as_array_mut().ok_or_else(|| {
            RemoteError::Serialization(format!("key '{}' does not hold an array", collection))
        })
    }

    /// Hand out the next id of a collection and advance its counter.
    ///
    /// The counter never falls below one past the highest numeric id already
    /// stored, so hand-edited files without a counter stay consistent.
    fn allocate_id(collections: &mut Collections, collection: &str) -> RemoteResult<RecordId> {
        let exhausted = || RemoteError::Rejected(format!("id space of '{}' exhausted", collection));

        let highest = collections
            .get(collection)
            .and_then(Value::as_array)
            .and_then(|rows| {
                rows.iter()
                    .filter_map(row_id)
                    .filter_map(|id| match id {
                        RecordId::Number(n) => Some(n),
                        RecordId::Text(_) => None,
                    })
                    .max()
            });
        let floor = match highest {
            Some(n) => n.checked_add(1).ok_or_else(exhausted)?,
            None => 1,
        };

        let counters = collections
            .entry(NEXT_IDS_KEY.to_string())
            .or_insert_with(|| Value::Object(Map::new()))
            .as_object_mut()
            .ok_or_else(|| RemoteError::Serialization(format!("key '{}' does not hold an object", NEXT_IDS_KEY)))?;
        let stored = counters.get(collection).and_then(Value::as_i64).unwrap_or(1);

        let id = stored.max(floor);
        let next = id.checked_add(1).ok_or_else(exhausted)?;
        counters.insert(collection.to_string(), Value::from(next));
        Ok(RecordId::Number(id))
    }
}

#[async_trait]
impl RemoteStore for LocalStore {
    async fn fetch_all(&self, collection: &str) -> RemoteResult<FetchedCollection> {
        let _guard = self.write_lock.lock().await;
        let collections = self.load().await?;
        let rows = match collections.get(collection) {
            None => Vec::new(),
            Some(Value::Array(rows)) => rows.clone(),
            Some(_) => {
                return Err(RemoteError::Serialization(format!(
                    "key '{}' does not hold an array",
                    collection
                )))
            }
        };
        Ok(FetchedCollection {
            rows,
            watermark: self.hub.watermark(),
        })
    }

    async fn insert(&self, collection: &str, fields: Value) -> RemoteResult<RecordId> {
        let mut row = object_payload(fields)?;

        let _guard = self.write_lock.lock().await;
        let mut collections = self.load().await?;
        let id = Self::allocate_id(&mut collections, collection)?;
        let rows = Self::rows_mut(&mut collections, collection)?;

        row.insert("id".to_string(), id.to_value());
        row.entry("created_at")
            .or_insert_with(|| Value::from(Utc::now().timestamp_millis()));
        let row = Value::Object(row);
        rows.push(row.clone());

        self.save(&collections).await?;
        self.hub.publish(collection, Change::Insert { record: row });
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &RecordId, fields: Value) -> RemoteResult<()> {
        let patch = Value::Object(object_payload(fields)?);

        let _guard = self.write_lock.lock().await;
        let mut collections = self.load().await?;
        let rows = Self::rows_mut(&mut collections, collection)?;
        let row = rows
            .iter_mut()
            .find(|row| row_id(row).as_ref() == Some(id))
            .ok_or_else(|| RemoteError::not_found(collection, id))?;

        merge_patch(row, &patch).map_err(|e| RemoteError::Rejected(e.to_string()))?;
        let record = row.clone();

        self.save(&collections).await?;
        self.hub.publish(collection, Change::Update { record });
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &RecordId) -> RemoteResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut collections = self.load().await?;
        let rows = Self::rows_mut(&mut collections, collection)?;
        let before = rows.len();
        rows.retain(|row| row_id(row).as_ref() != Some(id));
        if rows.len() == before {
            return Err(RemoteError::not_found(collection, id));
        }

        self.save(&collections).await?;
        self.hub.publish(collection, Change::Delete { id: id.clone() });
        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> RemoteResult<u64> {
        let _guard = self.write_lock.lock().await;
        let mut collections = self.load().await?;
        let removed = std::mem::take(Self::rows_mut(&mut collections, collection)?);

        self.save(&collections).await?;
        for id in removed.iter().filter_map(row_id) {
            self.hub.publish(collection, Change::Delete { id });
        }
        Ok(removed.len() as u64)
    }

    async fn subscribe(&self, collection: &str) -> RemoteResult<ChangeFeed> {
        Ok(self.hub.subscribe(collection)?)
    }

    fn unsubscribe(&self, subscription_id: &str) -> RemoteResult<()> {
        Ok(self.hub.unsubscribe(subscription_id)?)
    }
}
