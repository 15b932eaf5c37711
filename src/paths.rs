// RecordGate - Path Resolution
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Single source of truth for gate data paths.
// Cached via OnceLock for zero-overhead repeated access.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

static DATA_ROOT_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Gate data root.
///
/// Resolution order:
///   1. RECORD_GATE_ROOT environment variable
///   2. HOME env + /.record-gate
///   3. ./.record-gate relative to the working directory
pub fn data_root() -> &'static Path {
    DATA_ROOT_CACHE.get_or_init(|| {
        if let Ok(root) = std::env::var("RECORD_GATE_ROOT") {
            return PathBuf::from(root);
        }
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(".record-gate");
        }
        PathBuf::from(".record-gate")
    })
}

/// LMDB environment directory
pub fn store_path() -> PathBuf {
    data_root().join("GATE.DB")
}

/// Resource schema config file
pub fn schema_path() -> PathBuf {
    data_root().join("schemas.json")
}

// ============================================================================
// TESTS
// ============================================================================
