// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identifier and record.
//!
//! A workspace is an isolated working directory — a plain directory or a
//! git worktree — to which at most one task is bound at a time. Exactly
//! one slot of the Processor drains a given workspace.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a workspace instance.
    pub struct WorkspaceId;
}

/// A provisioned workspace: a directory plus the environment variables the
/// pipeline runtime injects into any subprocess run against it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub dir: PathBuf,
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl Workspace {
    pub fn new(id: WorkspaceId, dir: PathBuf) -> Self {
        Self {
            id,
            dir,
            env: HashMap::new(),
        }
    }

    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
