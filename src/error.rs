// RecordGate - Error Taxonomy
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Every gateway failure is one of these. All are recoverable at the
// transport boundary (mapped to a status + body) except Store, which
// is surfaced as-is for the caller to classify.

use crate::store::StoreError;
use std::collections::BTreeMap;
use thiserror::Error;

/// Field name -> human-readable reason. All failing fields reported together.
pub type FieldErrors = BTreeMap<String, String>;

/// Categorized gateway failure
#[derive(Debug, PartialEq, Error)]
pub enum GatewayError {
    /// No id in path, query string, or body
    #[error("no record id supplied via path, query, or body")]
    MissingIdentifier,

    /// The winning id candidate does not parse as an integer id
    #[error("malformed record id: {0:?}")]
    MalformedIdentifier(String),

    /// Resource name not in the schema registry
    #[error("unknown resource: {0:?}")]
    UnknownResource(String),

    /// Existence confirmed against the store, never inferred from id syntax
    #[error("record not found")]
    NotFound,

    /// No credentials at all
    #[error("authentication required")]
    Unauthenticated,

    /// Credentials present but insufficient
    #[error("permission denied: {0}")]
    Unauthorized(String),

    /// Payload validation failed; all failing fields collected
    #[error("payload validation failed ({} field(s))", .0.len())]
    InvalidPayload(FieldErrors),

    /// Store failure, propagated without retry
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl GatewayError {
    /// HTTP-style status for the transport boundary
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::MissingIdentifier
            | GatewayError::MalformedIdentifier(_)
            | GatewayError::UnknownResource(_)
            | GatewayError::InvalidPayload(_) => 400,
            GatewayError::Unauthenticated => 401,
            GatewayError::Unauthorized(_) => 403,
            GatewayError::NotFound => 404,
            GatewayError::Store(_) => 502,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
