// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hand-typed CRUD for the kernel's own built-in tables (tasks, workspaces,
//! chats, messages, models, tool_calls), as opposed to the generic
//! [`crate::schema::RecordDef`] path used for user-declared domain records.
//! These tables key on the string ids produced by `define_id!` rather than
//! an autoincrement integer, so they get their own `CREATE TABLE` statements
//! instead of going through [`crate::schema::RecordDef::create_table_sql`].

use crate::error::StoreError;
use kiln_core::{
    Chat, ChatId, Message, MessageId, Model, ModelId, Role, Task, TaskId, TaskStatus, ToolCall,
    ToolCallId, Workspace, WorkspaceId,
};
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(crate) fn ensure_builtin_tables(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS workspaces (
            id TEXT PRIMARY KEY,
            dir TEXT NOT NULL,
            env TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            completed_steps TEXT NOT NULL,
            record_type TEXT,
            record_id INTEGER,
            workspace_id TEXT,
            handler TEXT NOT NULL,
            error_message TEXT,
            chat_ids TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS models (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS chats (
            id TEXT PRIMARY KEY,
            project TEXT NOT NULL,
            run_id TEXT NOT NULL,
            model_id TEXT,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            chat_id TEXT NOT NULL,
            role TEXT NOT NULL,
            content TEXT NOT NULL,
            content_raw TEXT,
            input_tokens INTEGER NOT NULL,
            output_tokens INTEGER NOT NULL,
            cached_tokens INTEGER NOT NULL,
            cache_creation_tokens INTEGER NOT NULL,
            created_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS tool_calls (
            id TEXT PRIMARY KEY,
            message_id TEXT NOT NULL,
            tool_call_id TEXT NOT NULL,
            name TEXT NOT NULL,
            arguments TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

fn status_to_sql(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "pending",
        TaskStatus::Done => "done",
        TaskStatus::Failed => "failed",
    }
}

fn status_from_sql(s: &str) -> TaskStatus {
    match s {
        "done" => TaskStatus::Done,
        "failed" => TaskStatus::Failed,
        _ => TaskStatus::Pending,
    }
}

fn role_to_sql(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

fn role_from_sql(s: &str) -> Role {
    match s {
        "user" => Role::User,
        "assistant" => Role::Assistant,
        "tool" => Role::Tool,
        _ => Role::System,
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let completed_steps: String = row.get("completed_steps")?;
    let chat_ids: String = row.get("chat_ids")?;
    let status: String = row.get("status")?;
    Ok(Task {
        id: TaskId::from(row.get::<_, String>("id")?),
        status: status_from_sql(&status),
        completed_steps: serde_json::from_str(&completed_steps).unwrap_or_default(),
        record_type: row.get("record_type")?,
        record_id: row.get("record_id")?,
        workspace_id: row.get("workspace_id")?,
        handler: row.get("handler")?,
        error_message: row.get("error_message")?,
        chat_ids: serde_json::from_str(&chat_ids).unwrap_or_default(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

pub(crate) fn insert_task(conn: &Connection, task: &Task) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO tasks (id, status, completed_steps, record_type, record_id, workspace_id, handler, error_message, chat_ids, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            task.id.as_str(),
            status_to_sql(task.status),
            serde_json::to_string(&task.completed_steps)?,
            task.record_type,
            task.record_id,
            task.workspace_id,
            task.handler,
            task.error_message,
            serde_json::to_string(&task.chat_ids)?,
            task.created_at,
            task.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn update_task(conn: &Connection, task: &Task) -> Result<(), StoreError> {
    let changed = conn.execute(
        "UPDATE tasks SET status = ?2, completed_steps = ?3, record_type = ?4, record_id = ?5,
         workspace_id = ?6, handler = ?7, error_message = ?8, chat_ids = ?9, updated_at = ?10
         WHERE id = ?1",
        params![
            task.id.as_str(),
            status_to_sql(task.status),
            serde_json::to_string(&task.completed_steps)?,
            task.record_type,
            task.record_id,
            task.workspace_id,
            task.handler,
            task.error_message,
            serde_json::to_string(&task.chat_ids)?,
            task.updated_at,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

pub(crate) fn find_task(conn: &Connection, id: &TaskId) -> Result<Option<Task>, StoreError> {
    conn.query_row("SELECT * FROM tasks WHERE id = ?1", [id.as_str()], task_from_row)
        .optional()
        .map_err(StoreError::from)
}

pub(crate) fn list_tasks_by_status(conn: &Connection, status: TaskStatus) -> Result<Vec<Task>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM tasks WHERE status = ?1 ORDER BY created_at ASC")?;
    let rows = stmt.query_map([status_to_sql(status)], task_from_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

pub(crate) fn find_task_for_record(
    conn: &Connection,
    record_type: &str,
    record_id: i64,
    handler: &str,
) -> Result<Option<Task>, StoreError> {
    conn.query_row(
        "SELECT * FROM tasks WHERE record_type = ?1 AND record_id = ?2 AND handler = ?3",
        params![record_type, record_id, handler],
        task_from_row,
    )
    .optional()
    .map_err(StoreError::from)
}

pub(crate) fn next_claimable_task(
    conn: &Connection,
    workspace_id: &WorkspaceId,
) -> Result<Option<Task>, StoreError> {
    conn.query_row(
        "SELECT * FROM tasks WHERE status = 'pending' AND (workspace_id = ?1 OR workspace_id IS NULL)
         ORDER BY created_at ASC LIMIT 1",
        [workspace_id.as_str()],
        task_from_row,
    )
    .optional()
    .map_err(StoreError::from)
}

pub(crate) fn list_pending_tasks_for_workspace(
    conn: &Connection,
    workspace_id: &WorkspaceId,
) -> Result<Vec<Task>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM tasks WHERE status = 'pending' AND workspace_id = ?1 ORDER BY created_at ASC",
    )?;
    let rows = stmt.query_map([workspace_id.as_str()], task_from_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

fn workspace_from_row(row: &Row<'_>) -> rusqlite::Result<Workspace> {
    let env: String = row.get("env")?;
    Ok(Workspace {
        id: WorkspaceId::from(row.get::<_, String>("id")?),
        dir: row.get::<_, String>("dir")?.into(),
        env: serde_json::from_str(&env).unwrap_or_default(),
    })
}

pub(crate) fn insert_workspace(conn: &Connection, workspace: &Workspace, now: i64) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO workspaces (id, dir, env, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
        params![
            workspace.id.as_str(),
            workspace.dir.to_string_lossy(),
            serde_json::to_string(&workspace.env)?,
            now,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_workspace(conn: &Connection, id: &WorkspaceId) -> Result<Option<Workspace>, StoreError> {
    conn.query_row("SELECT * FROM workspaces WHERE id = ?1", [id.as_str()], workspace_from_row)
        .optional()
        .map_err(StoreError::from)
}

pub(crate) fn list_workspaces(conn: &Connection) -> Result<Vec<Workspace>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM workspaces ORDER BY created_at ASC")?;
    let rows = stmt.query_map([], workspace_from_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

fn model_from_row(row: &Row<'_>) -> rusqlite::Result<Model> {
    Ok(Model {
        id: ModelId::from(row.get::<_, String>("id")?),
        name: row.get("name")?,
    })
}

pub(crate) fn insert_model(conn: &Connection, model: &Model) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO models (id, name) VALUES (?1, ?2)",
        params![model.id.as_str(), model.name],
    )?;
    Ok(())
}

pub(crate) fn find_model(conn: &Connection, id: &ModelId) -> Result<Option<Model>, StoreError> {
    conn.query_row("SELECT * FROM models WHERE id = ?1", [id.as_str()], model_from_row)
        .optional()
        .map_err(StoreError::from)
}

fn chat_from_row(row: &Row<'_>) -> rusqlite::Result<Chat> {
    let model_id: Option<String> = row.get("model_id")?;
    Ok(Chat {
        id: ChatId::from(row.get::<_, String>("id")?),
        project: row.get("project")?,
        run_id: row.get("run_id")?,
        model_id: model_id.map(ModelId::from),
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn insert_chat(conn: &Connection, chat: &Chat) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO chats (id, project, run_id, model_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            chat.id.as_str(),
            chat.project,
            chat.run_id,
            chat.model_id.as_ref().map(|m| m.as_str()),
            chat.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_chat(conn: &Connection, id: &ChatId) -> Result<Option<Chat>, StoreError> {
    conn.query_row("SELECT * FROM chats WHERE id = ?1", [id.as_str()], chat_from_row)
        .optional()
        .map_err(StoreError::from)
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    let role: String = row.get("role")?;
    let content_raw: Option<String> = row.get("content_raw")?;
    Ok(Message {
        id: MessageId::from(row.get::<_, String>("id")?),
        chat_id: ChatId::from(row.get::<_, String>("chat_id")?),
        role: role_from_sql(&role),
        content: row.get("content")?,
        content_raw: content_raw.and_then(|s| serde_json::from_str(&s).ok()),
        input_tokens: row.get::<_, i64>("input_tokens")? as u64,
        output_tokens: row.get::<_, i64>("output_tokens")? as u64,
        cached_tokens: row.get::<_, i64>("cached_tokens")? as u64,
        cache_creation_tokens: row.get::<_, i64>("cache_creation_tokens")? as u64,
        created_at: row.get("created_at")?,
    })
}

pub(crate) fn insert_message(conn: &Connection, message: &Message) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO messages (id, chat_id, role, content, content_raw, input_tokens, output_tokens, cached_tokens, cache_creation_tokens, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            message.id.as_str(),
            message.chat_id.as_str(),
            role_to_sql(message.role),
            message.content,
            message.content_raw.as_ref().map(|v| v.to_string()),
            message.input_tokens as i64,
            message.output_tokens as i64,
            message.cached_tokens as i64,
            message.cache_creation_tokens as i64,
            message.created_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn list_messages_for_chat(conn: &Connection, chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM messages WHERE chat_id = ?1 ORDER BY created_at ASC")?;
    let rows = stmt.query_map([chat_id.as_str()], message_from_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

fn tool_call_from_row(row: &Row<'_>) -> rusqlite::Result<ToolCall> {
    let arguments: String = row.get("arguments")?;
    Ok(ToolCall {
        id: ToolCallId::from(row.get::<_, String>("id")?),
        message_id: MessageId::from(row.get::<_, String>("message_id")?),
        tool_call_id: row.get("tool_call_id")?,
        name: row.get("name")?,
        arguments: serde_json::from_str(&arguments).unwrap_or(serde_json::Value::Null),
    })
}

pub(crate) fn insert_tool_call(conn: &Connection, tool_call: &ToolCall) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO tool_calls (id, message_id, tool_call_id, name, arguments) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            tool_call.id.as_str(),
            tool_call.message_id.as_str(),
            tool_call.tool_call_id,
            tool_call.name,
            tool_call.arguments.to_string(),
        ],
    )?;
    Ok(())
}

pub(crate) fn list_tool_calls_for_message(
    conn: &Connection,
    message_id: &MessageId,
) -> Result<Vec<ToolCall>, StoreError> {
    let mut stmt = conn.prepare("SELECT * FROM tool_calls WHERE message_id = ?1")?;
    let rows = stmt.query_map([message_id.as_str()], tool_call_from_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
}

#[cfg(test)]
#[path = "builtin_tests.rs"]
mod tests;
