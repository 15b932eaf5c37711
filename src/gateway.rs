// RecordGate - Gateway (Primary Enforcement Point)
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Every record operation passes through here.
// Resolve -> Load -> Access -> Validate -> Execute.
// Steps before Execute are pure decision logic; only Execute touches
// the store. The gateway holds no state between requests and never
// retries a store failure.

use crate::access::{self, AccessDecision, DenyReason, Operation};
use crate::error::GatewayError;
use crate::principal::Principal;
use crate::query::{ListQuery, Page};
use crate::record::RecordView;
use crate::resolve::IdCandidates;
use crate::resource::SchemaRegistry;
use crate::store::RecordStore;
use crate::validate::validate_payload;
use serde_json::Value;
use std::collections::BTreeMap;

/// One inbound request, transport-agnostic
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub operation: Operation,
    pub resource: String,
    pub principal: Principal,
    pub ids: IdCandidates,
    pub payload: BTreeMap<String, Value>,
    pub query: ListQuery,
}

impl GatewayRequest {
    pub fn new(operation: Operation, resource: &str, principal: Principal) -> Self {
        Self {
            operation,
            resource: resource.to_string(),
            principal,
            ids: IdCandidates::none(),
            payload: BTreeMap::new(),
            query: ListQuery::new(),
        }
    }
}

/// Successful result of a gateway operation
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Retrieve or Update
    One(RecordView),
    /// Create
    Created(RecordView),
    /// List
    Many(Page),
    /// Delete: empty success marker
    Deleted,
}

/// The access-control and dispatch layer between a transport and the store
pub struct Gateway<S: RecordStore> {
    schemas: SchemaRegistry,
    store: S,
}

impl<S: RecordStore> Gateway<S> {
    pub fn new(schemas: SchemaRegistry, store: S) -> Self {
        Self { schemas, store }
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one request.
    ///
    /// Pipeline:
    /// 1. Resolve the resource schema
    /// 2. Resolve the target id (Retrieve/Update/Delete), before any store access
    /// 3. Load the target; absence is NotFound, confirmed against the store
    /// 4. Access evaluation: authentication first, then ownership
    /// 5. Payload validation (Create/Update), all failures collected
    /// 6. Execute against the store
    pub fn execute(&self, request: GatewayRequest) -> Result<Outcome, GatewayError> {
        let schema = self
            .schemas
            .get(&request.resource)
            .ok_or_else(|| GatewayError::UnknownResource(request.resource.clone()))?;

        let target = if request.operation.requires_target() {
            let id = request.ids.resolve()?;
            match self.store.get(&request.resource, id)? {
                Some(record) => Some(record),
                None => return Err(GatewayError::NotFound),
            }
        } else {
            None
        };

        match access::evaluate(
            schema.policy,
            &request.principal,
            request.operation,
            target.as_ref(),
        ) {
            AccessDecision::Allow => {}
            AccessDecision::Deny(DenyReason::Unauthenticated) => {
                log::debug!(
                    "deny {} {} for {}: unauthenticated",
                    request.operation,
                    request.resource,
                    request.principal
                );
                return Err(GatewayError::Unauthenticated);
            }
            AccessDecision::Deny(DenyReason::NotOwner) => {
                log::debug!(
                    "deny {} {} for {}: not owner",
                    request.operation,
                    request.resource,
                    request.principal
                );
                return Err(GatewayError::Unauthorized(
                    "you do not own this record".to_string(),
                ));
            }
        }

        match request.operation {
            Operation::List => {
                let records = self.store.list(&request.resource)?;
                let page = request.query.apply(schema, records)?;
                Ok(Outcome::Many(page))
            }
            Operation::Retrieve => {
                let record = target.ok_or(GatewayError::NotFound)?;
                Ok(Outcome::One(RecordView::from(&record)))
            }
            Operation::Create => {
                let fields = validate_payload(schema, &request.payload, false)
                    .map_err(GatewayError::InvalidPayload)?;
                let owner = if schema.owner_scoped() {
                    request.principal.id()
                } else {
                    None
                };
                let record = self.store.insert(&request.resource, owner, fields)?;
                log::info!(
                    "created {}/{} by {}",
                    request.resource,
                    record.id,
                    request.principal
                );
                Ok(Outcome::Created(RecordView::from(&record)))
            }
            Operation::Update => {
                let record = target.ok_or(GatewayError::NotFound)?;
                let fields = validate_payload(schema, &request.payload, true)
                    .map_err(GatewayError::InvalidPayload)?;
                let updated = self.store.update(&request.resource, record.id, fields)?;
                log::info!(
                    "updated {}/{} by {}",
                    request.resource,
                    record.id,
                    request.principal
                );
                Ok(Outcome::One(RecordView::from(&updated)))
            }
            Operation::Delete => {
                let record = target.ok_or(GatewayError::NotFound)?;
                if !self.store.delete(&request.resource, record.id)? {
                    // Vanished between load and delete
                    return Err(GatewayError::NotFound);
                }
                log::info!(
                    "deleted {}/{} by {}",
                    request.resource,
                    record.id,
                    request.principal
                );
                Ok(Outcome::Deleted)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
