// RecordGate - Record Model
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Store-owned entity: integer id, optional owner, named fields,
// created/updated timestamps. Owner is set at creation and never
// changed by an update.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// A single field value. Untagged so JSON numbers become Int and
/// JSON strings become Text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Text(String),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Int(_) => None,
            FieldValue::Text(s) => Some(s),
        }
    }

    /// Total order across both kinds for multi-key sorting.
    /// Ints sort before texts; within a kind, natural order.
    pub fn cmp_value(&self, other: &FieldValue) -> Ordering {
        match (self, other) {
            (FieldValue::Int(a), FieldValue::Int(b)) => a.cmp(b),
            (FieldValue::Text(a), FieldValue::Text(b)) => a.cmp(b),
            (FieldValue::Int(_), FieldValue::Text(_)) => Ordering::Less,
            (FieldValue::Text(_), FieldValue::Int(_)) => Ordering::Greater,
        }
    }
}

/// A persisted record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    /// Principal id that created the record, for owner-scoped resources
    pub owner: Option<u64>,
    pub fields: BTreeMap<String, FieldValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Read projection of a Record returned to callers.
/// Fields are flattened to the top level on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    pub id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<u64>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, FieldValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Record> for RecordView {
    fn from(record: &Record) -> Self {
        Self {
            id: record.id,
            owner: record.owner,
            fields: record.fields.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
