// RecordGate - Payload Validator
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// Schema-driven field validation. All failing fields are collected and
// reported together so a client can fix everything from one response.
// The current-year boundary is read from the clock at validation time,
// never cached.

use crate::error::FieldErrors;
use crate::record::FieldValue;
use crate::resource::{FieldKind, FieldSpec, ResourceSchema};
use chrono::{Datelike, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// Validate a raw payload against a resource schema.
///
/// Create runs with partial=false (required fields enforced);
/// Update runs with partial=true (only supplied fields validated).
/// Unknown payload fields are rejected, not silently dropped.
pub fn validate_payload(
    schema: &ResourceSchema,
    payload: &BTreeMap<String, Value>,
    partial: bool,
) -> Result<BTreeMap<String, FieldValue>, FieldErrors> {
    let mut canonical = BTreeMap::new();
    let mut errors = FieldErrors::new();

    for (name, raw) in payload {
        match schema.field(name) {
            None => {
                errors.insert(name.clone(), "unknown field".to_string());
            }
            Some(spec) => match check_field(spec, raw) {
                Ok(value) => {
                    canonical.insert(name.clone(), value);
                }
                Err(reason) => {
                    errors.insert(name.clone(), reason);
                }
            },
        }
    }

    if !partial {
        for spec in &schema.fields {
            if spec.required && !payload.contains_key(&spec.name) {
                errors.insert(spec.name.clone(), "this field is required".to_string());
            }
        }
    }

    if errors.is_empty() {
        Ok(canonical)
    } else {
        Err(errors)
    }
}

/// Canonicalize one raw value against its spec, or say why not.
fn check_field(spec: &FieldSpec, raw: &Value) -> Result<FieldValue, String> {
    match spec.kind {
        FieldKind::Int => {
            let value = raw.as_i64().ok_or_else(|| "expected an integer".to_string())?;
            if let Some(min) = spec.min {
                if value < min {
                    return Err(format!("must be at least {}", min));
                }
            }
            if let Some(max) = spec.max {
                if value > max {
                    return Err(format!("must be at most {}", max));
                }
            }
            if spec.not_future_year {
                let current_year = i64::from(Utc::now().year());
                if value > current_year {
                    return Err(format!("cannot be in the future (>{})", current_year));
                }
            }
            Ok(FieldValue::Int(value))
        }
        FieldKind::Text => {
            let value = raw.as_str().ok_or_else(|| "expected a string".to_string())?;
            if spec.required && value.is_empty() {
                return Err("may not be blank".to_string());
            }
            if let Some(max_len) = spec.max_len {
                if value.chars().count() > max_len {
                    return Err(format!("longer than {} characters", max_len));
                }
            }
            Ok(FieldValue::Text(value.to_string()))
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
