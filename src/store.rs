// RecordGate - Record Store Contract
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// The external collaborator holding all shared state. The gateway
// treats every call as atomic and never retries; a failure propagates
// as a single StoreError. MemoryStore is the reference implementation
// and test double; store_db.rs holds the LMDB-backed one.

use crate::record::{FieldValue, Record};
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use thiserror::Error;

/// Store-side failure. The caller decides whether it is transient.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("store backend failure: {0}")]
    Backend(String),

    #[error("corrupt record data: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Record store collaborator. Each call is atomic; concurrency control
/// is the store's own business.
pub trait RecordStore: Send + Sync {
    fn get(&self, resource: &str, id: u64) -> Result<Option<Record>, StoreError>;

    fn list(&self, resource: &str) -> Result<Vec<Record>, StoreError>;

    /// Assigns the id and both timestamps
    fn insert(
        &self,
        resource: &str,
        owner: Option<u64>,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record, StoreError>;

    /// Merges the supplied fields, refreshes updated_at. Owner and
    /// created_at are untouched. Existence is the caller's business;
    /// updating a missing id is a backend failure, not NotFound.
    fn update(
        &self,
        resource: &str,
        id: u64,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record, StoreError>;

    /// Returns false when the id was already gone
    fn delete(&self, resource: &str, id: u64) -> Result<bool, StoreError>;
}

// A shared reference to a store is itself a store; lets one backend
// serve the gateway and the token registry at once
impl<T: RecordStore> RecordStore for &T {
    fn get(&self, resource: &str, id: u64) -> Result<Option<Record>, StoreError> {
        (**self).get(resource, id)
    }

    fn list(&self, resource: &str) -> Result<Vec<Record>, StoreError> {
        (**self).list(resource)
    }

    fn insert(
        &self,
        resource: &str,
        owner: Option<u64>,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record, StoreError> {
        (**self).insert(resource, owner, fields)
    }

    fn update(
        &self,
        resource: &str,
        id: u64,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record, StoreError> {
        (**self).update(resource, id, fields)
    }

    fn delete(&self, resource: &str, id: u64) -> Result<bool, StoreError> {
        (**self).delete(resource, id)
    }
}

// ============================================================================
// IN-MEMORY STORE
// ============================================================================

#[derive(Default)]
struct MemoryInner {
    tables: HashMap<String, BTreeMap<u64, Record>>,
    /// Next id per resource; ids are never reused after delete
    sequences: HashMap<String, u64>,
}

/// Mutexed in-memory store. Reference implementation and test double.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, resource: &str, id: u64) -> Result<Option<Record>, StoreError> {
        let inner = self.lock();
        Ok(inner.tables.get(resource).and_then(|t| t.get(&id)).cloned())
    }

    fn list(&self, resource: &str) -> Result<Vec<Record>, StoreError> {
        let inner = self.lock();
        Ok(inner
            .tables
            .get(resource)
            .map(|t| t.values().cloned().collect())
            .unwrap_or_default())
    }

    fn insert(
        &self,
        resource: &str,
        owner: Option<u64>,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record, StoreError> {
        let mut inner = self.lock();
        let seq = inner.sequences.entry(resource.to_string()).or_insert(0);
        *seq += 1;
        let id = *seq;
        let now = Utc::now();
        let record = Record {
            id,
            owner,
            fields,
            created_at: now,
            updated_at: now,
        };
        inner
            .tables
            .entry(resource.to_string())
            .or_default()
            .insert(id, record.clone());
        Ok(record)
    }

    fn update(
        &self,
        resource: &str,
        id: u64,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record, StoreError> {
        let mut inner = self.lock();
        let record = inner
            .tables
            .get_mut(resource)
            .and_then(|t| t.get_mut(&id))
            .ok_or_else(|| {
                StoreError::Backend(format!("update of missing record {}/{}", resource, id))
            })?;
        for (name, value) in fields {
            record.fields.insert(name, value);
        }
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    fn delete(&self, resource: &str, id: u64) -> Result<bool, StoreError> {
        let mut inner = self.lock();
        Ok(inner
            .tables
            .get_mut(resource)
            .and_then(|t| t.remove(&id))
            .is_some())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(title: &str) -> BTreeMap<String, FieldValue> {
        let mut f = BTreeMap::new();
        f.insert("title".to_string(), FieldValue::Text(title.to_string()));
        f
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store.insert("books", None, fields("A")).expect("insert");
        let b = store.insert("books", None, fields("B")).expect("insert");
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn sequences_are_per_resource() {
        let store = MemoryStore::new();
        store.insert("books", None, fields("A")).expect("insert");
        let post = store.insert("posts", Some(1), fields("B")).expect("insert");
        assert_eq!(post.id, 1);
    }

    #[test]
    fn ids_are_not_reused_after_delete() {
        let store = MemoryStore::new();
        let a = store.insert("books", None, fields("A")).expect("insert");
        assert!(store.delete("books", a.id).expect("delete"));
        let b = store.insert("books", None, fields("B")).expect("insert");
        assert_eq!(b.id, 2);
    }

    #[test]
    fn update_merges_and_keeps_owner() {
        let store = MemoryStore::new();
        let record = store.insert("posts", Some(9), fields("old")).expect("insert");
        let updated = store
            .update("posts", record.id, fields("new"))
            .expect("update");
        assert_eq!(updated.owner, Some(9));
        assert_eq!(updated.field("title"), Some(&FieldValue::Text("new".into())));
        assert_eq!(updated.created_at, record.created_at);
        assert!(updated.updated_at >= record.updated_at);
    }

    #[test]
    fn update_missing_is_backend_error() {
        let store = MemoryStore::new();
        let err = store.update("books", 99, fields("x")).expect_err("missing");
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn delete_is_false_on_second_call() {
        let store = MemoryStore::new();
        let record = store.insert("books", None, fields("A")).expect("insert");
        assert!(store.delete("books", record.id).expect("first"));
        assert!(!store.delete("books", record.id).expect("second"));
    }

    #[test]
    fn get_unknown_resource_is_none() {
        let store = MemoryStore::new();
        assert_eq!(store.get("nope", 1).expect("get"), None);
    }
}
