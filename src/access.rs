// RecordGate - Access Evaluator
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Pure function of (policy, principal, operation, record). Never
// touches the store, never mutates state. Authentication is checked
// first (no record needed); ownership second (record already loaded
// by the orchestrator).

use crate::principal::Principal;
use crate::record::Record;
use crate::resource::AccessPolicy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five gateway operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Operation {
    /// Retrieve/Update/Delete act on one record and need the resolver
    pub fn requires_target(&self) -> bool {
        matches!(self, Operation::Retrieve | Operation::Update | Operation::Delete)
    }

    pub fn is_read(&self) -> bool {
        matches!(self, Operation::List | Operation::Retrieve)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list",
            Operation::Retrieve => "retrieve",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "list" => Ok(Operation::List),
            "retrieve" => Ok(Operation::Retrieve),
            "create" => Ok(Operation::Create),
            "update" => Ok(Operation::Update),
            "delete" => Ok(Operation::Delete),
            other => Err(format!("unknown operation: {:?}", other)),
        }
    }
}

/// Why access was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No credentials at all (maps to 401)
    Unauthenticated,
    /// Credentials present, principal is not the record owner (maps to 403)
    NotOwner,
}

/// Per-request access decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

/// Evaluate one (principal, operation, record) triple under a policy.
pub fn evaluate(
    policy: AccessPolicy,
    principal: &Principal,
    operation: Operation,
    record: Option<&Record>,
) -> AccessDecision {
    let authenticated = principal.is_authenticated();

    match operation {
        Operation::List | Operation::Retrieve => {
            if policy == AccessPolicy::PublicRead || authenticated {
                AccessDecision::Allow
            } else {
                AccessDecision::Deny(DenyReason::Unauthenticated)
            }
        }
        Operation::Create => {
            // Anonymous create is denied under every policy
            if authenticated {
                AccessDecision::Allow
            } else {
                AccessDecision::Deny(DenyReason::Unauthenticated)
            }
        }
        Operation::Update | Operation::Delete => {
            if !authenticated {
                return AccessDecision::Deny(DenyReason::Unauthenticated);
            }
            if policy == AccessPolicy::OwnerWrite {
                // Record is loaded before we get here; a record with no
                // owner on an owner-scoped resource never matches
                let owner = record.and_then(|r| r.owner);
                if owner.is_none() || owner != principal.id() {
                    return AccessDecision::Deny(DenyReason::NotOwner);
                }
            }
            AccessDecision::Allow
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn owned_by(owner: u64) -> Record {
        Record {
            id: 1,
            owner: Some(owner),
            fields: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn public_read_allows_anonymous_reads() {
        for op in [Operation::List, Operation::Retrieve] {
            let decision = evaluate(AccessPolicy::PublicRead, &Principal::Anonymous, op, None);
            assert_eq!(decision, AccessDecision::Allow);
        }
    }

    #[test]
    fn public_read_still_gates_writes() {
        let decision = evaluate(
            AccessPolicy::PublicRead,
            &Principal::Anonymous,
            Operation::Create,
            None,
        );
        assert_eq!(decision, AccessDecision::Deny(DenyReason::Unauthenticated));
    }

    #[test]
    fn auth_required_blocks_anonymous_reads() {
        let decision = evaluate(
            AccessPolicy::AuthRequired,
            &Principal::Anonymous,
            Operation::List,
            None,
        );
        assert_eq!(decision, AccessDecision::Deny(DenyReason::Unauthenticated));
    }

    #[test]
    fn auth_required_writes_need_no_ownership() {
        // The book catalog rule: any authenticated user may update
        let record = owned_by(1);
        let decision = evaluate(
            AccessPolicy::AuthRequired,
            &Principal::Authenticated(2),
            Operation::Update,
            Some(&record),
        );
        assert_eq!(decision, AccessDecision::Allow);
    }

    #[test]
    fn owner_write_allows_the_owner() {
        let record = owned_by(5);
        for op in [Operation::Update, Operation::Delete] {
            let decision = evaluate(
                AccessPolicy::OwnerWrite,
                &Principal::Authenticated(5),
                op,
                Some(&record),
            );
            assert_eq!(decision, AccessDecision::Allow);
        }
    }

    #[test]
    fn owner_write_denies_non_owner_as_not_owner() {
        // NotOwner, not NotFound: existence is not hidden in this design
        let record = owned_by(5);
        for op in [Operation::Update, Operation::Delete] {
            let decision = evaluate(
                AccessPolicy::OwnerWrite,
                &Principal::Authenticated(6),
                op,
                Some(&record),
            );
            assert_eq!(decision, AccessDecision::Deny(DenyReason::NotOwner));
        }
    }

    #[test]
    fn owner_write_checks_auth_before_ownership() {
        // Anonymous is 401 even when the record would also fail ownership
        let record = owned_by(5);
        let decision = evaluate(
            AccessPolicy::OwnerWrite,
            &Principal::Anonymous,
            Operation::Delete,
            Some(&record),
        );
        assert_eq!(decision, AccessDecision::Deny(DenyReason::Unauthenticated));
    }

    #[test]
    fn ownerless_record_never_matches_under_owner_write() {
        let mut record = owned_by(5);
        record.owner = None;
        let decision = evaluate(
            AccessPolicy::OwnerWrite,
            &Principal::Authenticated(5),
            Operation::Update,
            Some(&record),
        );
        assert_eq!(decision, AccessDecision::Deny(DenyReason::NotOwner));
    }

    #[test]
    fn operation_parses_from_wire_names() {
        assert_eq!("list".parse::<Operation>(), Ok(Operation::List));
        assert_eq!("delete".parse::<Operation>(), Ok(Operation::Delete));
        assert!("patch".parse::<Operation>().is_err());
    }
}
