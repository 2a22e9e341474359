// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn result_schema_admits_both_branches() {
    let success = json!({"type": "object", "properties": {"attr": {"type": "string"}}});
    let wrapped = result_schema(&success);
    let one_of = wrapped["oneOf"].as_array().unwrap();
    assert_eq!(one_of.len(), 2);
}

#[test]
fn is_error_branch_detects_the_envelope_error_shape() {
    let error = json!({"unable_to_fulfill_request_error": "nope"});
    let success = json!({"attr": "x"});
    assert!(is_error_branch(&error));
    assert!(!is_error_branch(&success));
}
