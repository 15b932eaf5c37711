// RecordGate - LMDB Record Store
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Durable RecordStore backed by LMDB at the gate data root.
// One named database per resource (string keys -> JSON records) plus a
// meta database for id sequences and the token table. Record keys are
// zero-padded so lexicographic order matches numeric order.

use crate::auth::TokenBackend;
use crate::record::{FieldValue, Record};
use crate::resource::SchemaRegistry;
use crate::store::{RecordStore, StoreError};
use anyhow::Result;
use chrono::Utc;
use heed::types::*;
use heed::{Database, Env, EnvOpenOptions};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

const MAX_DB_SIZE: usize = 50 * 1024 * 1024; // 50MB, plenty for record data
const MAX_DBS: u32 = 16;

fn record_key(id: u64) -> String {
    format!("{:020}", id)
}

fn sequence_key(resource: &str) -> String {
    format!("seq/{}", resource)
}

fn token_key(digest: &str) -> String {
    format!("token/{}", digest)
}

/// LMDB storage for gateway records and tokens
pub struct GateStorage {
    env: Env,
    tables: HashMap<String, Database<Str, Str>>,
    meta: Database<Str, Str>,
}

impl GateStorage {
    /// Open or create the LMDB environment, one database per resource
    /// in the registry plus the meta database.
    pub fn open(path: &Path, registry: &SchemaRegistry) -> Result<Self> {
        std::fs::create_dir_all(path)?;

        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(MAX_DB_SIZE)
                .max_dbs(MAX_DBS)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let meta = env.create_database(&mut wtxn, Some("meta"))?;
        let mut tables = HashMap::new();
        for resource in &registry.resources {
            let db = env.create_database(&mut wtxn, Some(resource.name.as_str()))?;
            tables.insert(resource.name.clone(), db);
        }
        wtxn.commit()?;

        log::info!(
            "Gate LMDB opened at {:?} ({} resource tables)",
            path,
            tables.len()
        );
        Ok(Self { env, tables, meta })
    }

    fn table(&self, resource: &str) -> Result<&Database<Str, Str>, StoreError> {
        self.tables
            .get(resource)
            .ok_or_else(|| StoreError::Backend(format!("no table for resource {:?}", resource)))
    }

    fn decode(resource: &str, key: &str, json: &str) -> Result<Record, StoreError> {
        serde_json::from_str(json)
            .map_err(|e| StoreError::Corrupt(format!("{}/{}: {}", resource, key, e)))
    }

    /// Entry count for one resource table
    pub fn entry_count(&self, resource: &str) -> Result<u64, StoreError> {
        let table = self.table(resource)?;
        let rtxn = self.env.read_txn().map_err(StoreError::backend)?;
        let stat = table.stat(&rtxn).map_err(StoreError::backend)?;
        Ok(stat.entries as u64)
    }
}

impl RecordStore for GateStorage {
    fn get(&self, resource: &str, id: u64) -> Result<Option<Record>, StoreError> {
        let table = self.table(resource)?;
        let rtxn = self.env.read_txn().map_err(StoreError::backend)?;
        match table
            .get(&rtxn, &record_key(id))
            .map_err(StoreError::backend)?
        {
            Some(json) => Ok(Some(Self::decode(resource, &record_key(id), json)?)),
            None => Ok(None),
        }
    }

    fn list(&self, resource: &str) -> Result<Vec<Record>, StoreError> {
        let table = self.table(resource)?;
        let rtxn = self.env.read_txn().map_err(StoreError::backend)?;
        let mut records = Vec::new();
        for item in table.iter(&rtxn).map_err(StoreError::backend)? {
            let (key, json) = item.map_err(StoreError::backend)?;
            records.push(Self::decode(resource, key, json)?);
        }
        Ok(records)
    }

    fn insert(
        &self,
        resource: &str,
        owner: Option<u64>,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record, StoreError> {
        let table = self.table(resource)?;
        let mut wtxn = self.env.write_txn().map_err(StoreError::backend)?;

        let seq_key = sequence_key(resource);
        let current = match self
            .meta
            .get(&wtxn, &seq_key)
            .map_err(StoreError::backend)?
        {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| StoreError::Corrupt(format!("sequence {}: {}", seq_key, e)))?,
            None => 0,
        };
        let id = current + 1;
        self.meta
            .put(&mut wtxn, &seq_key, &id.to_string())
            .map_err(StoreError::backend)?;

        let now = Utc::now();
        let record = Record {
            id,
            owner,
            fields,
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&record).map_err(StoreError::backend)?;
        table
            .put(&mut wtxn, &record_key(id), &json)
            .map_err(StoreError::backend)?;
        wtxn.commit().map_err(StoreError::backend)?;
        Ok(record)
    }

    fn update(
        &self,
        resource: &str,
        id: u64,
        fields: BTreeMap<String, FieldValue>,
    ) -> Result<Record, StoreError> {
        let table = self.table(resource)?;
        let mut wtxn = self.env.write_txn().map_err(StoreError::backend)?;

        let key = record_key(id);
        let json = table
            .get(&wtxn, &key)
            .map_err(StoreError::backend)?
            .ok_or_else(|| {
                StoreError::Backend(format!("update of missing record {}/{}", resource, id))
            })?;
        let mut record = Self::decode(resource, &key, json)?;

        for (name, value) in fields {
            record.fields.insert(name, value);
        }
        record.updated_at = Utc::now();

        let json = serde_json::to_string(&record).map_err(StoreError::backend)?;
        table
            .put(&mut wtxn, &key, &json)
            .map_err(StoreError::backend)?;
        wtxn.commit().map_err(StoreError::backend)?;
        Ok(record)
    }

    fn delete(&self, resource: &str, id: u64) -> Result<bool, StoreError> {
        let table = self.table(resource)?;
        let mut wtxn = self.env.write_txn().map_err(StoreError::backend)?;
        let deleted = table
            .delete(&mut wtxn, &record_key(id))
            .map_err(StoreError::backend)?;
        wtxn.commit().map_err(StoreError::backend)?;
        Ok(deleted)
    }
}

impl TokenBackend for GateStorage {
    fn put_token(&self, digest: &str, user_id: u64) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(StoreError::backend)?;
        self.meta
            .put(&mut wtxn, &token_key(digest), &user_id.to_string())
            .map_err(StoreError::backend)?;
        wtxn.commit().map_err(StoreError::backend)?;
        Ok(())
    }

    fn get_token(&self, digest: &str) -> Result<Option<u64>, StoreError> {
        let rtxn = self.env.read_txn().map_err(StoreError::backend)?;
        match self
            .meta
            .get(&rtxn, &token_key(digest))
            .map_err(StoreError::backend)?
        {
            Some(raw) => raw
                .parse::<u64>()
                .map(Some)
                .map_err(|e| StoreError::Corrupt(format!("token {}: {}", digest, e))),
            None => Ok(None),
        }
    }

    fn remove_token(&self, digest: &str) -> Result<bool, StoreError> {
        let mut wtxn = self.env.write_txn().map_err(StoreError::backend)?;
        let removed = self
            .meta
            .delete(&mut wtxn, &token_key(digest))
            .map_err(StoreError::backend)?;
        wtxn.commit().map_err(StoreError::backend)?;
        Ok(removed)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn open_temp() -> (tempfile::TempDir, GateStorage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage =
            GateStorage::open(dir.path(), &SchemaRegistry::default()).expect("open lmdb");
        (dir, storage)
    }

    fn fields(title: &str) -> BTreeMap<String, FieldValue> {
        let mut f = BTreeMap::new();
        f.insert("title".to_string(), FieldValue::Text(title.to_string()));
        f
    }

    #[test]
    fn insert_get_round_trip() {
        let (_dir, storage) = open_temp();
        let record = storage.insert("books", None, fields("Dune")).expect("insert");
        let loaded = storage.get("books", record.id).expect("get").expect("some");
        assert_eq!(loaded, record);
    }

    #[test]
    fn ids_are_sequential_and_never_reused() {
        let (_dir, storage) = open_temp();
        let a = storage.insert("books", None, fields("A")).expect("insert");
        let b = storage.insert("books", None, fields("B")).expect("insert");
        assert_eq!((a.id, b.id), (1, 2));
        assert!(storage.delete("books", b.id).expect("delete"));
        let c = storage.insert("books", None, fields("C")).expect("insert");
        assert_eq!(c.id, 3);
    }

    #[test]
    fn list_returns_every_record() {
        let (_dir, storage) = open_temp();
        for title in ["A", "B", "C"] {
            storage.insert("books", None, fields(title)).expect("insert");
        }
        let records = storage.list("books").expect("list");
        assert_eq!(records.len(), 3);
        assert_eq!(storage.entry_count("books").expect("count"), 3);
    }

    #[test]
    fn update_merges_and_preserves_owner() {
        let (_dir, storage) = open_temp();
        let record = storage
            .insert("posts", Some(4), fields("before"))
            .expect("insert");
        let updated = storage
            .update("posts", record.id, fields("after"))
            .expect("update");
        assert_eq!(updated.owner, Some(4));
        assert_eq!(
            updated.field("title"),
            Some(&FieldValue::Text("after".to_string()))
        );
        assert_eq!(updated.created_at, record.created_at);
    }

    #[test]
    fn delete_is_false_when_already_gone() {
        let (_dir, storage) = open_temp();
        let record = storage.insert("books", None, fields("X")).expect("insert");
        assert!(storage.delete("books", record.id).expect("first"));
        assert!(!storage.delete("books", record.id).expect("second"));
    }

    #[test]
    fn resources_do_not_share_tables() {
        let (_dir, storage) = open_temp();
        storage.insert("books", None, fields("A")).expect("insert");
        assert!(storage.list("posts").expect("list").is_empty());
    }

    #[test]
    fn unknown_resource_is_a_backend_error() {
        let (_dir, storage) = open_temp();
        let err = storage.get("widgets", 1).expect_err("no table");
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[test]
    fn token_backend_round_trip() {
        let (_dir, storage) = open_temp();
        storage.put_token("abc123", 9).expect("put");
        assert_eq!(storage.get_token("abc123").expect("get"), Some(9));
        assert!(storage.remove_token("abc123").expect("remove"));
        assert_eq!(storage.get_token("abc123").expect("get"), None);
    }
}
