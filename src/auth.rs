// RecordGate - Token Authentication Provider
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Issues and resolves bearer tokens. Only SHA-256 digests are
// persisted; the raw token exists once, in the issue response.
// The gateway never sees tokens, only the resolved Principal.

use crate::principal::Principal;
use crate::store::StoreError;
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Persistence for token digests. GateStorage implements this against
/// its meta database; MemoryTokens is the test double.
pub trait TokenBackend: Send + Sync {
    fn put_token(&self, digest: &str, user_id: u64) -> Result<(), StoreError>;
    fn get_token(&self, digest: &str) -> Result<Option<u64>, StoreError>;
    fn remove_token(&self, digest: &str) -> Result<bool, StoreError>;
}

impl<T: TokenBackend> TokenBackend for &T {
    fn put_token(&self, digest: &str, user_id: u64) -> Result<(), StoreError> {
        (**self).put_token(digest, user_id)
    }

    fn get_token(&self, digest: &str) -> Result<Option<u64>, StoreError> {
        (**self).get_token(digest)
    }

    fn remove_token(&self, digest: &str) -> Result<bool, StoreError> {
        (**self).remove_token(digest)
    }
}

/// Token issuer and resolver
pub struct TokenRegistry<B: TokenBackend> {
    backend: B,
    nonce: AtomicU64,
}

impl<B: TokenBackend> TokenRegistry<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            nonce: AtomicU64::new(0),
        }
    }

    /// Issue a fresh token for a user. The raw token is returned once;
    /// only its digest is stored.
    pub fn issue(&self, user_id: u64) -> Result<String, StoreError> {
        let mut hasher = Sha256::new();
        hasher.update(user_id.to_le_bytes());
        hasher.update(std::process::id().to_le_bytes());
        hasher.update(
            Utc::now()
                .timestamp_nanos_opt()
                .unwrap_or_default()
                .to_le_bytes(),
        );
        hasher.update(self.nonce.fetch_add(1, Ordering::Relaxed).to_le_bytes());
        let token = hex::encode(hasher.finalize());

        self.backend.put_token(&digest_of(&token), user_id)?;
        log::info!("Issued token for user {}", user_id);
        Ok(token)
    }

    /// Resolve a presented token. None means the token is unknown
    /// (revoked or never issued); the transport maps that to 401.
    pub fn resolve(&self, token: &str) -> Result<Option<Principal>, StoreError> {
        Ok(self
            .backend
            .get_token(&digest_of(token))?
            .map(Principal::Authenticated))
    }

    pub fn revoke(&self, token: &str) -> Result<bool, StoreError> {
        self.backend.remove_token(&digest_of(token))
    }
}

fn digest_of(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

#[derive(Default)]
pub struct MemoryTokens {
    map: Mutex<HashMap<String, u64>>,
}

impl MemoryTokens {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, u64>> {
        self.map.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl TokenBackend for MemoryTokens {
    fn put_token(&self, digest: &str, user_id: u64) -> Result<(), StoreError> {
        self.lock().insert(digest.to_string(), user_id);
        Ok(())
    }

    fn get_token(&self, digest: &str) -> Result<Option<u64>, StoreError> {
        Ok(self.lock().get(digest).copied())
    }

    fn remove_token(&self, digest: &str) -> Result<bool, StoreError> {
        Ok(self.lock().remove(digest).is_some())
    }
}

// ============================================================================
// TESTS
// ============================================================================
