// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provisions a pool of workspaces as git worktrees under a shared root,
//! one per entry of `worktree_envs`.

use crate::error::BatchError;
use kiln_adapters::Git;
use kiln_core::{IdGen, Workspace, WorkspaceId};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for provisioning a pool of git-worktree workspaces,
/// exclusive with passing an explicit `Vec<Workspace>` to [`crate::Batch`].
#[derive(Debug, Clone)]
pub struct RepoConfig {
    /// Directory under which each worktree is created.
    pub root_dir: PathBuf,
    /// Branch name prefix; worktree `i` is checked out on `<prefix>-<i>`.
    pub branch_prefix: String,
    /// Revision each new worktree is checked out at.
    pub initial_revision: String,
    /// Subdirectory within each worktree the workspace is rooted at.
    pub working_subdir: PathBuf,
    /// One entry per workspace to provision, holding that workspace's env.
    pub worktree_envs: Vec<HashMap<String, String>>,
}

/// Create one worktree per `repo.worktree_envs` entry (idempotent — safe to
/// call again against an already-provisioned root) and return the
/// resulting workspaces in order.
pub async fn provision_workspaces(repo: &RepoConfig, git: &Arc<dyn Git>, id_gen: &Arc<dyn IdGen>) -> Result<Vec<Workspace>, BatchError> {
    let mut workspaces = Vec::with_capacity(repo.worktree_envs.len());
    for (index, env) in repo.worktree_envs.iter().enumerate() {
        let branch = format!("{}-{index}", repo.branch_prefix);
        let worktree_dir = repo.root_dir.join(&branch);
        git.create_worktree(&worktree_dir, &branch, &repo.initial_revision).await?;
        let dir = worktree_dir.join(&repo.working_subdir);
        let workspace = Workspace::new(WorkspaceId::new(id_gen.next()), dir).with_env(env.clone());
        workspaces.push(workspace);
    }
    Ok(workspaces)
}

#[cfg(test)]
#[path = "repo_tests.rs"]
mod tests;
