//! # Mirror Cache
//!
//! Insertion-ordered id -> record map and the rules for applying changes.
//!
//! - Insert and Update upsert by id; an Update is merged onto the existing
//!   record's encoded row before decoding
//! - Delete removes by id; deleting an absent id is a no-op
//! - A re-inserted id keeps its original position

use std::collections::HashMap;

use crate::realtime::Change;
use crate::record::codec::merge_patch;
use crate::record::{Record, RecordError, RecordId, RecordResult};

/// What applying a change did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// New id added
    Inserted,
    /// Existing id replaced
    Replaced,
    /// Id removed
    Removed,
    /// Delete of an id that was not present
    Absent,
}

/// Local copy of a collection
#[derive(Debug, Clone)]
pub struct MirrorCache<R> {
    order: Vec<RecordId>,
    records: HashMap<RecordId, R>,
}

impl<R> Default for MirrorCache<R> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            records: HashMap::new(),
        }
    }
}

impl<R: Record> MirrorCache<R> {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether `id` is present
    pub fn contains(&self, id: &RecordId) -> bool {
        self.records.contains_key(id)
    }

    /// Look up a record
    pub fn get(&self, id: &RecordId) -> Option<&R> {
        self.records.get(id)
    }

    /// All records in insertion order
    pub fn snapshot(&self) -> Vec<R> {
        self.order
            .iter()
            .filter_map(|id| self.records.get(id).cloned())
            .collect()
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.order.clear();
        self.records.clear();
    }

    /// Replace the contents. Duplicate ids keep the last record.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = R>) {
        self.clear();
        for record in records {
            self.upsert(record);
        }
    }

    /// Insert or replace by id
    pub fn upsert(&mut self, record: R) -> Applied {
        let id = record.id();
        match self.records.insert(id.clone(), record) {
            Some(_) => Applied::Replaced,
            None => {
                self.order.push(id);
                Applied::Inserted
            }
        }
    }

    /// Remove by id
    pub fn remove(&mut self, id: &RecordId) -> Option<R> {
        let removed = self.records.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(removed)
    }

    /// Apply one change. On error the cache is unchanged.
    pub fn apply(&mut self, change: &Change) -> RecordResult<Applied> {
        match change {
            Change::Insert { record } => {
                let record = R::decode(record.clone())?;
                Ok(self.upsert(record))
            }
            Change::Update { record: patch } => {
                let id = patch
                    .get("id")
                    .ok_or(RecordError::MissingId)
                    .and_then(|raw| {
                        RecordId::from_value(raw).ok_or_else(|| RecordError::InvalidId(raw.to_string()))
                    })?;
                let row = match self.records.get(&id) {
                    Some(existing) => {
                        let mut row = existing.encode()?;
                        merge_patch(&mut row, patch)?;
                        row
                    }
                    None => patch.clone(),
                };
                Ok(self.upsert(R::decode(row)?))
            }
            Change::Delete { id } => Ok(match self.remove(id) {
                Some(_) => Applied::Removed,
                None => Applied::Absent,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::JsonRecord;
    use serde_json::json;

    fn insert(row: serde_json::Value) -> Change {
        Change::Insert { record: row }
    }

    fn update(row: serde_json::Value) -> Change {
        Change::Update { record: row }
    }

    fn delete(id: &str) -> Change {
        Change::Delete { id: RecordId::from(id) }
    }

    fn ids(cache: &MirrorCache<JsonRecord>) -> Vec<String> {
        cache.snapshot().iter().map(|r| r.id.to_string()).collect()
    }

    #[test]
    fn test_sequence_of_changes() {
        let mut cache = MirrorCache::<JsonRecord>::new();
        let changes = [
            insert(json!({"id": "a", "v": 1})),
            insert(json!({"id": "b", "v": 1})),
            update(json!({"id": "a", "v": 2})),
            delete("b"),
            insert(json!({"id": "c", "v": 1})),
            insert(json!({"id": "b", "v": 3})),
        ];
        for change in &changes {
            cache.apply(change).unwrap();
        }

        assert_eq!(ids(&cache), vec!["a", "c", "b"]);
        assert_eq!(cache.get(&RecordId::from("a")).unwrap().field("v"), Some(&json!(2)));
        assert_eq!(cache.get(&RecordId::from("b")).unwrap().field("v"), Some(&json!(3)));
    }

    #[test]
    fn test_update_merges_onto_existing() {
        let mut cache = MirrorCache::<JsonRecord>::new();
        cache.apply(&insert(json!({"id": "1", "name": "x", "done": false}))).unwrap();

        assert_eq!(cache.apply(&update(json!({"id": "1", "done": true}))).unwrap(), Applied::Replaced);
        assert_eq!(cache.apply(&update(json!({"id": "1", "name": "y"}))).unwrap(), Applied::Replaced);

        let record = cache.get(&RecordId::from("1")).unwrap();
        assert_eq!(record.field("name"), Some(&json!("y")));
        assert_eq!(record.field("done"), Some(&json!(true)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_update_of_absent_id_upserts() {
        let mut cache = MirrorCache::<JsonRecord>::new();
        assert_eq!(cache.apply(&update(json!({"id": 5, "x": 1}))).unwrap(), Applied::Inserted);
        assert!(cache.contains(&RecordId::Number(5)));
    }

    #[test]
    fn test_duplicate_insert_is_idempotent() {
        let mut cache = MirrorCache::<JsonRecord>::new();
        let change = insert(json!({"id": "1", "name": "x"}));
        assert_eq!(cache.apply(&change).unwrap(), Applied::Inserted);
        assert_eq!(cache.apply(&change).unwrap(), Applied::Replaced);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_delete_absent_is_noop() {
        let mut cache = MirrorCache::<JsonRecord>::new();
        assert_eq!(cache.apply(&delete("ghost")).unwrap(), Applied::Absent);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_decode_failure_leaves_cache_unchanged() {
        let mut cache = MirrorCache::<JsonRecord>::new();
        cache.apply(&insert(json!({"id": "1", "created_at": 0}))).unwrap();

        assert!(cache.apply(&insert(json!({"name": "no id"}))).is_err());
        assert!(cache.apply(&update(json!({"id": "1", "created_at": "never"}))).is_err());
        assert!(cache.apply(&update(json!({"name": "no id"}))).is_err());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&RecordId::from("1")).unwrap().created_at.unwrap().timestamp(), 0);
    }

    #[test]
    fn test_replace_all_dedupes() {
        let mut cache = MirrorCache::<JsonRecord>::new();
        cache.apply(&insert(json!({"id": "old"}))).unwrap();

        let rows = [json!({"id": "1", "v": 1}), json!({"id": "2"}), json!({"id": "1", "v": 2})];
        cache.replace_all(rows.into_iter().map(|r| JsonRecord::decode(r).unwrap()));

        assert_eq!(ids(&cache), vec!["1", "2"]);
        assert_eq!(cache.get(&RecordId::from("1")).unwrap().field("v"), Some(&json!(2)));
    }
}
