// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_workspace_has_empty_env() {
    let ws = Workspace::new(WorkspaceId::new("ws-1"), PathBuf::from("/tmp/ws-1"));
    assert!(ws.env.is_empty());
    assert_eq!(ws.dir, PathBuf::from("/tmp/ws-1"));
}

#[test]
fn with_env_replaces_env_map() {
    let mut env = HashMap::new();
    env.insert("FOO".to_string(), "bar".to_string());
    let ws = Workspace::new(WorkspaceId::new("ws-1"), PathBuf::from("/tmp/ws-1")).with_env(env);
    assert_eq!(ws.env.get("FOO"), Some(&"bar".to_string()));
}

#[test]
fn workspace_serde_roundtrip() {
    let ws = Workspace::new(WorkspaceId::new("ws-2"), PathBuf::from("/tmp/ws-2"));
    let json = serde_json::to_string(&ws).unwrap();
    let back: Workspace = serde_json::from_str(&json).unwrap();
    assert_eq!(back.id, ws.id);
}
