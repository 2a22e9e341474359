// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task identifier and state machine.
//!
//! A task is a persistent record of one pipeline family invocation against
//! one domain record. The pipeline runtime mutates `completed_steps`
//! exclusively from inside a store transaction, so every append is
//! captured by the store's automatic versioning.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a task instance.
    pub struct TaskId;
}

/// Status of a task's pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Done,
    Failed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Done => write!(f, "done"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A persistent unit of work: one record passing through one pipeline family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub status: TaskStatus,
    #[serde(default)]
    pub completed_steps: Vec<String>,
    pub record_type: Option<String>,
    pub record_id: Option<i64>,
    pub workspace_id: Option<String>,
    pub handler: String,
    pub error_message: Option<String>,
    #[serde(default)]
    pub chat_ids: Vec<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Task {
    pub fn new(id: TaskId, handler: impl Into<String>, now: i64) -> Self {
        Self {
            id,
            status: TaskStatus::Pending,
            completed_steps: Vec::new(),
            record_type: None,
            record_id: None,
            workspace_id: None,
            handler: handler.into(),
            error_message: None,
            chat_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn for_record(
        id: TaskId,
        record_type: impl Into<String>,
        record_id: i64,
        handler: impl Into<String>,
        now: i64,
    ) -> Self {
        let mut task = Self::new(id, handler, now);
        task.record_type = Some(record_type.into());
        task.record_id = Some(record_id);
        task
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }

    pub fn is_failed(&self) -> bool {
        self.status == TaskStatus::Failed
    }

    /// Mark the task failed with a message, touching `updated_at`.
    pub fn fail(&mut self, message: impl Into<String>, now: i64) {
        self.status = TaskStatus::Failed;
        self.error_message = Some(message.into());
        self.updated_at = now;
    }

    /// Mark the task done, touching `updated_at`.
    pub fn mark_done(&mut self, now: i64) {
        self.status = TaskStatus::Done;
        self.updated_at = now;
    }

    /// Append a step name to the completed trail, touching `updated_at`.
    pub fn complete_step(&mut self, step: impl Into<String>, now: i64) {
        self.completed_steps.push(step.into());
        self.updated_at = now;
    }

    /// Truncate `completed_steps` to just before the first occurrence of
    /// `step`. Returns an error description if `step` is absent or appears
    /// more than once — callers translate this into a pipeline error.
    pub fn rewind_to(&mut self, step: &str) -> Result<(), RewindError> {
        let matches: Vec<usize> = self
            .completed_steps
            .iter()
            .enumerate()
            .filter(|(_, s)| s.as_str() == step)
            .map(|(i, _)| i)
            .collect();
        match matches.as_slice() {
            [] => Err(RewindError::NotFound(step.to_string())),
            [idx] => {
                self.completed_steps.truncate(*idx);
                Ok(())
            }
            _ => Err(RewindError::Ambiguous(step.to_string())),
        }
    }

    pub fn add_chat_id(&mut self, chat_id: impl Into<String>) {
        self.chat_ids.push(chat_id.into());
    }
}

/// Error raised when a rewind target cannot be located unambiguously in
/// `completed_steps`.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum RewindError {
    #[error("rewind target '{0}' not found in completed steps")]
    NotFound(String),
    #[error("rewind target '{0}' appears more than once in completed steps")]
    Ambiguous(String),
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
