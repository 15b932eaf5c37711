// RecordGate - Stdio JSON Server
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// The transport boundary: one JSON request per line on stdin, one JSON
// response per line on stdout, logging to stderr. Maps gateway errors
// to HTTP-style statuses. The id may ride in the path position, in
// query.id, or in body.id; the resolver makes alias routes identical
// to canonical ones.

use crate::access::Operation;
use crate::auth::{TokenBackend, TokenRegistry};
use crate::error::GatewayError;
use crate::gateway::{Gateway, GatewayRequest, Outcome};
use crate::principal::Principal;
use crate::query::ListQuery;
use crate::resolve::IdCandidates;
use crate::store::RecordStore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

/// One wire request
#[derive(Debug, Clone, Deserialize)]
pub struct RpcRequest {
    pub op: String,
    pub resource: String,
    #[serde(default)]
    pub token: Option<String>,
    /// Path-position id
    #[serde(default)]
    pub id: Option<Value>,
    /// Query-string params; "id" here is the alias-route id
    #[serde(default)]
    pub query: Option<Map<String, Value>>,
    /// Payload; "id" here is the body id, consumed by the resolver
    #[serde(default)]
    pub body: Option<Map<String, Value>>,
}

/// One wire response
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcResponse {
    pub status: u16,
    pub body: Value,
}

impl RpcResponse {
    fn detail(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "detail": message.into() }),
        }
    }
}

/// Stringify a scalar id candidate. Null means absent; anything
/// non-scalar becomes its JSON text and fails in the resolver.
fn id_candidate(value: Option<&Value>) -> Option<String> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

/// Stringify a query param value for the list engine
fn param_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Process one parsed request through the gateway.
pub fn handle<S: RecordStore, B: TokenBackend>(
    gateway: &Gateway<S>,
    tokens: &TokenRegistry<B>,
    request: RpcRequest,
) -> RpcResponse {
    // Credentials resolve before anything else; a presented-but-unknown
    // token is 401, not anonymous
    let principal = match &request.token {
        None => Principal::Anonymous,
        Some(token) => match tokens.resolve(token) {
            Ok(Some(principal)) => principal,
            Ok(None) => return RpcResponse::detail(401, "invalid token"),
            Err(err) => return RpcResponse::detail(502, format!("store error: {}", err)),
        },
    };

    let operation: Operation = match request.op.parse() {
        Ok(op) => op,
        Err(message) => return RpcResponse::detail(400, message),
    };

    let mut ids = IdCandidates::none();
    ids.path = id_candidate(request.id.as_ref());

    let mut params = BTreeMap::new();
    if let Some(query) = &request.query {
        for (key, value) in query {
            if key == "id" {
                ids.query = id_candidate(Some(value));
            } else {
                params.insert(key.clone(), param_string(value));
            }
        }
    }

    let mut payload = BTreeMap::new();
    if let Some(body) = &request.body {
        for (key, value) in body {
            if key == "id" {
                ids.body = id_candidate(Some(value));
            } else {
                payload.insert(key.clone(), value.clone());
            }
        }
    }

    let mut gw_request = GatewayRequest::new(operation, &request.resource, principal);
    gw_request.ids = ids;
    gw_request.payload = payload;
    gw_request.query = ListQuery { params };

    let response = match gateway.execute(gw_request) {
        Ok(Outcome::One(view)) => RpcResponse {
            status: 200,
            body: json!(view),
        },
        Ok(Outcome::Created(view)) => RpcResponse {
            status: 201,
            body: json!(view),
        },
        Ok(Outcome::Many(page)) => RpcResponse {
            status: 200,
            body: json!(page),
        },
        Ok(Outcome::Deleted) => RpcResponse {
            status: 204,
            body: Value::Null,
        },
        Err(error) => error_response(error),
    };

    log::info!(
        "{} {} as {} -> {}",
        request.op,
        request.resource,
        principal,
        response.status
    );
    response
}

/// Map a gateway error to its wire form
pub fn error_response(error: GatewayError) -> RpcResponse {
    let status = error.status_code();
    let body = match error {
        GatewayError::InvalidPayload(fields) => json!({ "errors": fields }),
        other => json!({ "detail": other.to_string() }),
    };
    RpcResponse { status, body }
}

/// Parse one stdin line and process it
pub fn handle_line<S: RecordStore, B: TokenBackend>(
    gateway: &Gateway<S>,
    tokens: &TokenRegistry<B>,
    line: &str,
) -> RpcResponse {
    match serde_json::from_str::<RpcRequest>(line) {
        Ok(request) => handle(gateway, tokens, request),
        Err(err) => RpcResponse::detail(400, format!("malformed request: {}", err)),
    }
}

/// Serve line-delimited JSON over stdio until stdin closes.
pub fn serve<S: RecordStore, B: TokenBackend>(
    gateway: &Gateway<S>,
    tokens: &TokenRegistry<B>,
) -> anyhow::Result<()> {
    log::info!("RecordGate serving line-delimited JSON on stdio");
    let stdin = io::stdin();
    let stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(gateway, tokens, &line);
        let mut out = stdout.lock();
        serde_json::to_writer(&mut out, &response)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }

    log::info!("stdin closed, shutting down");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
