// RecordGate - Resource Schemas
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Per-resource configuration: access policy, field rules, search and
// ordering declarations. Policies are data, not code; there is exactly
// one access evaluator and it reads this. Defaults ship in the binary,
// JSON round-trip via load/save.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Access rule selected per resource.
/// public_read: anyone may read, authenticated principals may write.
/// auth_required: every operation needs credentials.
/// owner_write: reads need credentials, update/delete need ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessPolicy {
    PublicRead,
    AuthRequired,
    OwnerWrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Int,
    Text,
}

/// Validation rules for one field
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Enforced on create; updates are partial
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_len: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
    /// Value must not exceed the current calendar year, read from the
    /// clock at validation time
    #[serde(default)]
    pub not_future_year: bool,
}

/// One resource type known to the gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSchema {
    pub name: String,
    pub policy: AccessPolicy,
    pub fields: Vec<FieldSpec>,
    /// Text fields searched by the ?search= parameter
    pub search_fields: Vec<String>,
    /// Keys accepted by the ?ordering= parameter
    pub ordering_fields: Vec<String>,
    /// Applied when ?ordering= is absent; also the tie-breaker
    pub default_ordering: Vec<String>,
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Owner-scoped resources stamp the creating principal onto the record
    pub fn owner_scoped(&self) -> bool {
        self.policy == AccessPolicy::OwnerWrite
    }
}

/// All resource schemas the gateway serves
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRegistry {
    pub resources: Vec<ResourceSchema>,
}

impl SchemaRegistry {
    pub fn get(&self, name: &str) -> Option<&ResourceSchema> {
        self.resources.iter().find(|r| r.name == name)
    }

    /// Load registry from JSON file, falling back to defaults
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let registry: Self = serde_json::from_str(&content)?;
            Ok(registry)
        } else {
            log::warn!("Schema config not found at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Save registry to JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

impl Default for SchemaRegistry {
    fn default() -> Self {
        Self {
            resources: vec![
                // Book catalog: no owner, reads open, writes need auth
                ResourceSchema {
                    name: "books".to_string(),
                    policy: AccessPolicy::PublicRead,
                    fields: vec![
                        FieldSpec {
                            name: "title".to_string(),
                            kind: FieldKind::Text,
                            required: true,
                            max_len: Some(255),
                            min: None,
                            max: None,
                            not_future_year: false,
                        },
                        FieldSpec {
                            name: "publication_year".to_string(),
                            kind: FieldKind::Int,
                            required: true,
                            max_len: None,
                            min: Some(0),
                            max: None,
                            not_future_year: true,
                        },
                        FieldSpec {
                            name: "author".to_string(),
                            kind: FieldKind::Int,
                            required: true,
                            max_len: None,
                            min: Some(1),
                            max: None,
                            not_future_year: false,
                        },
                    ],
                    search_fields: vec!["title".to_string()],
                    ordering_fields: vec![
                        "publication_year".to_string(),
                        "title".to_string(),
                    ],
                    default_ordering: vec!["title".to_string()],
                },
                // Posts: owner-scoped, strict ownership on writes
                ResourceSchema {
                    name: "posts".to_string(),
                    policy: AccessPolicy::OwnerWrite,
                    fields: vec![
                        FieldSpec {
                            name: "title".to_string(),
                            kind: FieldKind::Text,
                            required: true,
                            max_len: Some(255),
                            min: None,
                            max: None,
                            not_future_year: false,
                        },
                        FieldSpec {
                            name: "content".to_string(),
                            kind: FieldKind::Text,
                            required: true,
                            max_len: None,
                            min: None,
                            max: None,
                            not_future_year: false,
                        },
                    ],
                    search_fields: vec!["title".to_string(), "content".to_string()],
                    ordering_fields: vec![
                        "created_at".to_string(),
                        "updated_at".to_string(),
                        "title".to_string(),
                    ],
                    default_ordering: vec!["-created_at".to_string()],
                },
                // Comments: owner-scoped, tied to a post by id
                ResourceSchema {
                    name: "comments".to_string(),
                    policy: AccessPolicy::OwnerWrite,
                    fields: vec![
                        FieldSpec {
                            name: "post".to_string(),
                            kind: FieldKind::Int,
                            required: true,
                            max_len: None,
                            min: Some(1),
                            max: None,
                            not_future_year: false,
                        },
                        FieldSpec {
                            name: "content".to_string(),
                            kind: FieldKind::Text,
                            required: true,
                            max_len: None,
                            min: None,
                            max: None,
                            not_future_year: false,
                        },
                    ],
                    search_fields: vec!["content".to_string()],
                    ordering_fields: vec![
                        "created_at".to_string(),
                        "updated_at".to_string(),
                    ],
                    default_ordering: vec!["created_at".to_string()],
                },
            ],
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
