// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The transaction-scoped handle passed into [`crate::Store::transaction`]
//! closures. All reads and writes against built-in and generic record
//! tables go through this type.

use crate::builtin;
use crate::error::StoreError;
use crate::record_table::RecordTable;
use crate::store::Store;
use kiln_core::{Chat, ChatId, Message, MessageId, Model, ModelId, Task, TaskId, TaskStatus, ToolCall, ToolCallId, Workspace, WorkspaceId};

/// Scoped access to a [`Store`] from inside an active transaction.
pub struct StoreTxn<'a> {
    store: &'a Store,
}

impl<'a> StoreTxn<'a> {
    pub(crate) fn new(store: &'a Store) -> Self {
        Self { store }
    }

    fn require_writable(&self) -> Result<(), StoreError> {
        if self.store.is_readonly() {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Access a user-declared domain table by its table name.
    pub fn table(&self, table: impl Into<String>) -> RecordTable<'a> {
        RecordTable::new(self.store, table, self.store.is_readonly())
    }

    pub fn create_task(&self, task: &Task) -> Result<(), StoreError> {
        self.require_writable()?;
        self.store.with_connection(|conn| builtin::insert_task(conn, task))
    }

    pub fn update_task(&self, task: &Task) -> Result<(), StoreError> {
        self.require_writable()?;
        self.store.with_connection(|conn| builtin::update_task(conn, task))
    }

    pub fn find_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        self.store.with_connection(|conn| builtin::find_task(conn, id))
    }

    pub fn list_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
        self.store.with_connection(|conn| builtin::list_tasks_by_status(conn, status))
    }

    pub fn list_pending_tasks_for_workspace(&self, workspace_id: &WorkspaceId) -> Result<Vec<Task>, StoreError> {
        self.store
            .with_connection(|conn| builtin::list_pending_tasks_for_workspace(conn, workspace_id))
    }

    pub fn find_task_for_record(&self, record_type: &str, record_id: i64, handler: &str) -> Result<Option<Task>, StoreError> {
        self.store
            .with_connection(|conn| builtin::find_task_for_record(conn, record_type, record_id, handler))
    }

    /// Atomically find the oldest pending task owned by `workspace_id` or
    /// unowned, and bind it to `workspace_id` if it was unowned. Callers
    /// must invoke this from inside a single [`Store::transaction`] call so
    /// two workspace slots can't claim the same task.
    pub fn claim_next_pending_task(&self, workspace_id: &WorkspaceId) -> Result<Option<Task>, StoreError> {
        self.require_writable()?;
        let Some(mut task) = self.store.with_connection(|conn| builtin::next_claimable_task(conn, workspace_id))? else {
            return Ok(None);
        };
        if task.workspace_id.is_none() {
            task.workspace_id = Some(workspace_id.as_str().to_string());
            self.update_task(&task)?;
        }
        Ok(Some(task))
    }

    pub fn create_workspace(&self, workspace: &Workspace, now: i64) -> Result<(), StoreError> {
        self.require_writable()?;
        self.store
            .with_connection(|conn| builtin::insert_workspace(conn, workspace, now))
    }

    pub fn find_workspace(&self, id: &WorkspaceId) -> Result<Option<Workspace>, StoreError> {
        self.store.with_connection(|conn| builtin::find_workspace(conn, id))
    }

    pub fn list_workspaces(&self) -> Result<Vec<Workspace>, StoreError> {
        self.store.with_connection(builtin::list_workspaces)
    }

    pub fn create_model(&self, model: &Model) -> Result<(), StoreError> {
        self.require_writable()?;
        self.store.with_connection(|conn| builtin::insert_model(conn, model))
    }

    pub fn find_model(&self, id: &ModelId) -> Result<Option<Model>, StoreError> {
        self.store.with_connection(|conn| builtin::find_model(conn, id))
    }

    pub fn create_chat(&self, chat: &Chat) -> Result<(), StoreError> {
        self.require_writable()?;
        self.store.with_connection(|conn| builtin::insert_chat(conn, chat))
    }

    pub fn find_chat(&self, id: &ChatId) -> Result<Option<Chat>, StoreError> {
        self.store.with_connection(|conn| builtin::find_chat(conn, id))
    }

    pub fn create_message(&self, message: &Message) -> Result<(), StoreError> {
        self.require_writable()?;
        self.store.with_connection(|conn| builtin::insert_message(conn, message))
    }

    pub fn list_messages_for_chat(&self, chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
        self.store
            .with_connection(|conn| builtin::list_messages_for_chat(conn, chat_id))
    }

    pub fn create_tool_call(&self, tool_call: &ToolCall) -> Result<(), StoreError> {
        self.require_writable()?;
        self.store
            .with_connection(|conn| builtin::insert_tool_call(conn, tool_call))
    }

    pub fn list_tool_calls_for_message(&self, message_id: &MessageId) -> Result<Vec<ToolCall>, StoreError> {
        self.store
            .with_connection(|conn| builtin::list_tool_calls_for_message(conn, message_id))
    }
}
