// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The git/worktree boundary: the narrow surface the pipeline runtime and
//! Batch facade need from a working tree, independent of any particular
//! git library or subprocess strategy.

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors raised by a git adapter implementation.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("git command failed: {0}")]
    CommandFailed(String),
    #[error("worktree error: {0}")]
    WorktreeError(String),
}

/// Git/worktree primitives the kernel needs. Implementations must be
/// idempotent: calling `create_worktree` for a dir that already has a
/// matching worktree must not error (prune, remove, recreate as needed).
#[async_trait]
pub trait Git: Send + Sync {
    async fn create_worktree(&self, worktree_dir: &Path, branch: &str, revision: &str) -> Result<(), GitError>;
    async fn diff(&self) -> Result<String, GitError>;
    async fn status(&self) -> Result<String, GitError>;
    /// Commits all pending changes and returns the new revision.
    async fn commit_all(&self, message: &str) -> Result<String, GitError>;
    async fn last_revision(&self) -> Result<String, GitError>;
    async fn reset_hard_all(&self) -> Result<(), GitError>;
    async fn uncommitted_changes(&self) -> Result<bool, GitError>;
}
