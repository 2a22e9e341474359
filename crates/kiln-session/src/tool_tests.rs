// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;

struct EchoTool {
    name: String,
    workspace_dir: Option<String>,
}

impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }
}

fn registry_with_echo() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(
        "echo",
        Arc::new(|args: ToolArgs| -> Arc<dyn Tool> {
            Arc::new(EchoTool {
                name: "echo".to_string(),
                workspace_dir: args.get("workspace_dir").and_then(|v| v.as_str()).map(str::to_string),
            })
        }),
    );
    registry
}

#[test]
fn resolving_an_instance_returns_it_unchanged() {
    let registry = ToolRegistry::new();
    let instance: Arc<dyn Tool> = Arc::new(EchoTool {
        name: "direct".to_string(),
        workspace_dir: None,
    });
    let resolved = registry
        .resolve(&ToolRef::instance(instance.clone()), &ToolArgs::new(), None)
        .unwrap();
    assert_eq!(resolved.name(), "direct");
}

#[test]
fn resolving_a_name_looks_up_the_registry_and_injects_workspace_dir() {
    let registry = registry_with_echo();
    let resolved = registry
        .resolve(
            &ToolRef::name("echo"),
            &ToolArgs::new(),
            Some(&PathBuf::from("/work")),
        )
        .unwrap();
    assert_eq!(resolved.name(), "echo");
}

#[test]
fn caller_supplied_workspace_dir_is_not_overridden() {
    let registry = registry_with_echo();
    let mut args = ToolArgs::new();
    args.insert("workspace_dir".to_string(), serde_json::json!("/caller"));

    let resolved = registry
        .resolve(&ToolRef::name("echo"), &args, Some(&PathBuf::from("/default")))
        .unwrap();
    assert_eq!(resolved.name(), "echo");
}

#[test]
fn unknown_tool_name_lists_the_registry() {
    let registry = registry_with_echo();
    let err = registry.resolve(&ToolRef::name("missing"), &ToolArgs::new(), None).unwrap_err();
    match err {
        SessionError::UnknownTool { name, available } => {
            assert_eq!(name, "missing");
            assert_eq!(available, "echo");
        }
        other => panic!("expected UnknownTool, got {other:?}"),
    }
}
