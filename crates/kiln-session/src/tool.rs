// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool resolution: a caller may hand the session a tool by name, by
//! factory, or as an already-constructed instance; resolution always
//! yields an instance.

use crate::error::SessionError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// A tool made available to the model during an `agent_step`.
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> String {
        String::new()
    }

    fn parameters_schema(&self) -> Value {
        serde_json::json!({"type": "object"})
    }
}

pub type ToolArgs = serde_json::Map<String, Value>;
pub type ToolFactory = Arc<dyn Fn(ToolArgs) -> Arc<dyn Tool> + Send + Sync>;

/// A value the caller may pass wherever a tool is expected.
#[derive(Clone)]
pub enum ToolRef {
    Name(String),
    Factory(ToolFactory),
    Instance(Arc<dyn Tool>),
}

impl ToolRef {
    pub fn name(name: impl Into<String>) -> Self {
        ToolRef::Name(name.into())
    }

    pub fn instance(tool: Arc<dyn Tool>) -> Self {
        ToolRef::Instance(tool)
    }
}

/// The `name -> factory` registry of extra tools a session was configured
/// with, merged against built-ins at resolution time.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    extras: BTreeMap<String, ToolFactory>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, factory: ToolFactory) {
        self.extras.insert(name.into(), factory);
    }

    /// Resolve `tool` to an instance, merging `tool_args` and injecting
    /// `workspace_dir` when the caller didn't supply one and a default is
    /// available.
    pub fn resolve(
        &self,
        tool: &ToolRef,
        tool_args: &ToolArgs,
        default_workspace_dir: Option<&Path>,
    ) -> Result<Arc<dyn Tool>, SessionError> {
        match tool {
            ToolRef::Instance(instance) => Ok(instance.clone()),
            ToolRef::Factory(factory) => {
                let merged = merge_args(tool_args, default_workspace_dir);
                Ok(factory(merged))
            }
            ToolRef::Name(name) => match self.extras.get(name) {
                Some(factory) => {
                    let merged = merge_args(tool_args, default_workspace_dir);
                    Ok(factory(merged))
                }
                None => Err(SessionError::UnknownTool {
                    name: name.clone(),
                    available: self.extras.keys().cloned().collect::<Vec<_>>().join(", "),
                }),
            },
        }
    }
}

fn merge_args(tool_args: &ToolArgs, default_workspace_dir: Option<&Path>) -> ToolArgs {
    let mut merged = tool_args.clone();
    if !merged.contains_key("workspace_dir") {
        if let Some(dir) = default_workspace_dir {
            merged.insert(
                "workspace_dir".to_string(),
                Value::String(dir.to_string_lossy().into_owned()),
            );
        }
    }
    merged
}

#[cfg(test)]
#[path = "tool_tests.rs"]
mod tests;
