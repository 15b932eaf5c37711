// RecordGate - Principal
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// The acting identity for a request. Resolved by the auth provider
// before the gateway runs; the gateway never sees raw credentials.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Acting identity: either anonymous or an authenticated user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Principal {
    Anonymous,
    Authenticated(u64),
}

impl Principal {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Principal::Authenticated(_))
    }

    /// User id, if authenticated
    pub fn id(&self) -> Option<u64> {
        match self {
            Principal::Anonymous => None,
            Principal::Authenticated(id) => Some(*id),
        }
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::Anonymous => write!(f, "anonymous"),
            Principal::Authenticated(id) => write!(f, "user:{}", id),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anonymous_has_no_id() {
        assert!(!Principal::Anonymous.is_authenticated());
        assert_eq!(Principal::Anonymous.id(), None);
    }

    #[test]
    fn authenticated_exposes_id() {
        let p = Principal::Authenticated(42);
        assert!(p.is_authenticated());
        assert_eq!(p.id(), Some(42));
        assert_eq!(p.to_string(), "user:42");
    }
}
