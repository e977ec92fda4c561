//! # In-Memory Store
//!
//! Tables held in process memory and wired to a [`ChangeHub`]. Each write
//! publishes its change while the table lock is held, so the watermark
//! returned by `fetch_all` always matches the rows it returns.

use std::collections::HashMap;
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use super::errors::{RemoteError, RemoteResult};
use super::{object_payload, row_id, FetchedCollection, RemoteStore};
use crate::realtime::{Change, ChangeFeed, ChangeHub};
use crate::record::codec::merge_patch;
use crate::record::RecordId;

/// One-shot failure to inject into the next matching call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Next `fetch_all` fails
    Fetch,
    /// Next write (insert/update/delete/delete_all) fails
    Write,
    /// Next `subscribe` fails
    Subscribe,
}

/// In-process remote store
#[derive(Debug, Default)]
pub struct MemoryStore {
    hub: ChangeHub,
    tables: RwLock<HashMap<String, Vec<Value>>>,
    faults: Mutex<Vec<Fault>>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// The hub this store publishes to.
    ///
    /// Publishing on it directly emits events with no matching table write.
    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    /// Load rows without publishing events. Every row must carry an `id`.
    pub fn seed(&self, collection: &str, rows: Vec<Value>) -> RemoteResult<()> {
        if let Some(row) = rows.iter().find(|row| row_id(row).is_none()) {
            return Err(RemoteError::Rejected(format!("seed row without id: {}", row)));
        }
        let mut tables = self.write_tables()?;
        tables.entry(collection.to_string()).or_default().extend(rows);
        Ok(())
    }

    /// Queue a one-shot failure
    pub fn inject_fault(&self, fault: Fault) {
        if let Ok(mut faults) = self.faults.lock() {
            faults.push(fault);
        }
    }

    /// Delay every remote call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        if let Ok(mut current) = self.latency.lock() {
            *current = latency;
        }
    }

    /// Number of rows currently stored in a collection
    pub fn row_count(&self, collection: &str) -> usize {
        self.tables
            .read()
            .map(|t| t.get(collection).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    async fn enter(&self, fault: Fault) -> RemoteResult<()> {
        let latency = self.latency.lock().ok().and_then(|l| *l);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let injected = match self.faults.lock() {
            Ok(mut faults) => match faults.iter().position(|f| *f == fault) {
                Some(pos) => {
                    faults.remove(pos);
                    true
                }
                None => false,
            },
            Err(_) => false,
        };
        if injected {
            return Err(RemoteError::Unavailable(format!("injected {:?} fault", fault)));
        }
        Ok(())
    }

    fn write_tables(
        &self,
    ) -> RemoteResult<std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<Value>>>> {
        self.tables
            .write()
            .map_err(|_| RemoteError::Unavailable("Lock poisoned".into()))
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn fetch_all(&self, collection: &str) -> RemoteResult<FetchedCollection> {
        self.enter(Fault::Fetch).await?;

        let tables = self
            .tables
            .read()
            .map_err(|_| RemoteError::Unavailable("Lock poisoned".into()))?;
        Ok(FetchedCollection {
            rows: tables.get(collection).cloned().unwrap_or_default(),
            watermark: self.hub.watermark(),
        })
    }

    async fn insert(&self, collection: &str, fields: Value) -> RemoteResult<RecordId> {
        self.enter(Fault::Write).await?;

        let mut row = object_payload(fields)?;
        let id = RecordId::Text(Uuid::new_v4().to_string());
        row.insert("id".to_string(), id.to_value());
        row.entry("created_at")
            .or_insert_with(|| Value::String(Utc::now().to_rfc3339()));
        let row = Value::Object(row);

        let mut tables = self.write_tables()?;
        tables.entry(collection.to_string()).or_default().push(row.clone());
        self.hub.publish(collection, Change::Insert { record: row });

        Ok(id)
    }

    async fn update(&self, collection: &str, id: &RecordId, fields: Value) -> RemoteResult<()> {
        self.enter(Fault::Write).await?;

        let patch = Value::Object(object_payload(fields)?);
        let mut tables = self.write_tables()?;
        let row = tables
            .get_mut(collection)
            .and_then(|rows| rows.iter_mut().find(|row| row_id(row).as_ref() == Some(id)))
            .ok_or_else(|| RemoteError::not_found(collection, id))?;

        merge_patch(row, &patch).map_err(|e| RemoteError::Rejected(e.to_string()))?;
        let record = row.clone();
        self.hub.publish(collection, Change::Update { record });

        Ok(())
    }

    async fn delete(&self, collection: &str, id: &RecordId) -> RemoteResult<()> {
        self.enter(Fault::Write).await?;

        let mut tables = self.write_tables()?;
        let rows = tables
            .get_mut(collection)
            .ok_or_else(|| RemoteError::not_found(collection, id))?;
        let pos = rows
            .iter()
            .position(|row| row_id(row).as_ref() == Some(id))
            .ok_or_else(|| RemoteError::not_found(collection, id))?;

        rows.remove(pos);
        self.hub.publish(collection, Change::Delete { id: id.clone() });

        Ok(())
    }

    async fn delete_all(&self, collection: &str) -> RemoteResult<u64> {
        self.enter(Fault::Write).await?;

        let mut tables = self.write_tables()?;
        let removed = tables.remove(collection).unwrap_or_default();
        for id in removed.iter().filter_map(row_id) {
            self.hub.publish(collection, Change::Delete { id });
        }

        Ok(removed.len() as u64)
    }

    async fn subscribe(&self, collection: &str) -> RemoteResult<ChangeFeed> {
        self.enter(Fault::Subscribe).await?;
        Ok(self.hub.subscribe(collection)?)
    }

    fn unsubscribe(&self, subscription_id: &str) -> RemoteResult<()> {
        Ok(self.hub.unsubscribe(subscription_id)?)
    }
}
