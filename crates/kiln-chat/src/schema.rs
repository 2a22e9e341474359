// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The result-envelope schema wrapper: turns a caller's success schema into
//! a `oneOf` that also admits the gateway's unable-to-fulfill error shape.
//! The gateway itself never interprets which branch matched — that's the
//! Session layer's job.

use serde_json::{json, Value};

/// Wrap `success_schema` in a `oneOf` alongside the standard
/// "unable to fulfill" error shape.
pub fn result_schema(success_schema: &Value) -> Value {
    json!({
        "oneOf": [
            success_schema,
            {
                "type": "object",
                "properties": {
                    "unable_to_fulfill_request_error": { "type": "string" }
                },
                "required": ["unable_to_fulfill_request_error"],
                "additionalProperties": false
            }
        ]
    })
}

/// `true` if `value` is the error branch of a [`result_schema`] envelope.
pub fn is_error_branch(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| obj.contains_key("unable_to_fulfill_request_error"))
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
