// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake git adapter for deterministic testing.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Git, GitError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Recorded call to a [`FakeGit`].
#[derive(Debug, Clone)]
pub enum GitCall {
    CreateWorktree { dir: PathBuf, branch: String, revision: String },
    Diff,
    Status,
    CommitAll { message: String },
    LastRevision,
    ResetHardAll,
    UncommittedChanges,
}

struct State {
    worktrees: HashSet<PathBuf>,
    calls: Vec<GitCall>,
    diff: String,
    status: String,
    revision: String,
    uncommitted_changes: bool,
    commit_error: Option<GitError>,
}

/// A scriptable, call-recording [`Git`] implementation.
#[derive(Clone)]
pub struct FakeGit {
    inner: Arc<Mutex<State>>,
}

impl Default for FakeGit {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGit {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(State {
                worktrees: HashSet::new(),
                calls: Vec::new(),
                diff: String::new(),
                status: String::new(),
                revision: "0000000".to_string(),
                uncommitted_changes: false,
                commit_error: None,
            })),
        }
    }

    pub fn calls(&self) -> Vec<GitCall> {
        self.inner.lock().calls.clone()
    }

    pub fn set_diff(&self, diff: impl Into<String>) {
        self.inner.lock().diff = diff.into();
    }

    pub fn set_status(&self, status: impl Into<String>) {
        self.inner.lock().status = status.into();
    }

    pub fn set_revision(&self, revision: impl Into<String>) {
        self.inner.lock().revision = revision.into();
    }

    pub fn set_uncommitted_changes(&self, value: bool) {
        self.inner.lock().uncommitted_changes = value;
    }

    pub fn set_commit_error(&self, error: GitError) {
        self.inner.lock().commit_error = Some(error);
    }

    pub fn has_worktree(&self, dir: &Path) -> bool {
        self.inner.lock().worktrees.contains(dir)
    }

    pub fn worktree_count(&self) -> usize {
        self.inner.lock().worktrees.len()
    }
}

#[async_trait]
impl Git for FakeGit {
    async fn create_worktree(&self, worktree_dir: &Path, branch: &str, revision: &str) -> Result<(), GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::CreateWorktree {
            dir: worktree_dir.to_path_buf(),
            branch: branch.to_string(),
            revision: revision.to_string(),
        });
        // Idempotent: recreating at the same dir is a no-op, per the Git
        // boundary's contract.
        state.worktrees.insert(worktree_dir.to_path_buf());
        Ok(())
    }

    async fn diff(&self) -> Result<String, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::Diff);
        Ok(state.diff.clone())
    }

    async fn status(&self) -> Result<String, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::Status);
        Ok(state.status.clone())
    }

    async fn commit_all(&self, message: &str) -> Result<String, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::CommitAll { message: message.to_string() });
        if let Some(error) = state.commit_error.take() {
            return Err(error);
        }
        state.uncommitted_changes = false;
        Ok(state.revision.clone())
    }

    async fn last_revision(&self) -> Result<String, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::LastRevision);
        Ok(state.revision.clone())
    }

    async fn reset_hard_all(&self) -> Result<(), GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::ResetHardAll);
        state.uncommitted_changes = false;
        Ok(())
    }

    async fn uncommitted_changes(&self) -> Result<bool, GitError> {
        let mut state = self.inner.lock();
        state.calls.push(GitCall::UncommittedChanges);
        Ok(state.uncommitted_changes)
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
