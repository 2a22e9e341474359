// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_core::{Role, TaskId, WorkspaceId};

fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    ensure_builtin_tables(&conn).unwrap();
    conn
}

#[test]
fn task_roundtrips_through_insert_and_find() {
    let conn = conn();
    let mut task = Task::for_record(TaskId::new("t1"), "widget", 1, "widget_pipeline", 100);
    task.complete_step("validate", 100);
    insert_task(&conn, &task).unwrap();

    let found = find_task(&conn, &task.id).unwrap().unwrap();
    assert_eq!(found.id, task.id);
    assert_eq!(found.completed_steps, vec!["validate".to_string()]);
    assert_eq!(found.record_type.as_deref(), Some("widget"));
    assert_eq!(found.record_id, Some(1));
}

#[test]
fn update_task_persists_status_and_steps() {
    let conn = conn();
    let mut task = Task::new(TaskId::new("t2"), "handler", 100);
    insert_task(&conn, &task).unwrap();

    task.complete_step("step_a", 200);
    task.mark_done(200);
    update_task(&conn, &task).unwrap();

    let found = find_task(&conn, &task.id).unwrap().unwrap();
    assert_eq!(found.status, TaskStatus::Done);
    assert_eq!(found.completed_steps, vec!["step_a".to_string()]);
}

#[test]
fn update_unknown_task_is_not_found() {
    let conn = conn();
    let task = Task::new(TaskId::new("missing"), "handler", 1);
    let err = update_task(&conn, &task).unwrap_err();
    assert!(matches!(err, StoreError::NotFound));
}

#[test]
fn list_tasks_by_status_filters_and_orders() {
    let conn = conn();
    let mut a = Task::new(TaskId::new("a"), "h", 1);
    let mut b = Task::new(TaskId::new("b"), "h", 2);
    let c = Task::new(TaskId::new("c"), "h", 3);
    a.mark_done(1);
    b.mark_done(2);
    insert_task(&conn, &a).unwrap();
    insert_task(&conn, &b).unwrap();
    insert_task(&conn, &c).unwrap();

    let done = list_tasks_by_status(&conn, TaskStatus::Done).unwrap();
    assert_eq!(done.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
}

#[test]
fn list_pending_tasks_for_workspace_scopes_by_workspace() {
    let conn = conn();
    let mut a = Task::new(TaskId::new("a"), "h", 1);
    a.workspace_id = Some("ws1".to_string());
    let mut b = Task::new(TaskId::new("b"), "h", 2);
    b.workspace_id = Some("ws2".to_string());
    insert_task(&conn, &a).unwrap();
    insert_task(&conn, &b).unwrap();

    let pending = list_pending_tasks_for_workspace(&conn, &WorkspaceId::new("ws1")).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id.as_str(), "a");
}

#[test]
fn workspace_roundtrips_with_env() {
    let conn = conn();
    let mut env = std::collections::HashMap::new();
    env.insert("FOO".to_string(), "bar".to_string());
    let workspace = Workspace::new(WorkspaceId::new("w1"), "/tmp/w1".into()).with_env(env);
    insert_workspace(&conn, &workspace, 10).unwrap();

    let found = find_workspace(&conn, &workspace.id).unwrap().unwrap();
    assert_eq!(found.dir, std::path::PathBuf::from("/tmp/w1"));
    assert_eq!(found.env.get("FOO"), Some(&"bar".to_string()));

    let all = list_workspaces(&conn).unwrap();
    assert_eq!(all.len(), 1);
}

#[test]
fn chat_message_and_tool_call_roundtrip() {
    let conn = conn();
    let model = Model {
        id: ModelId::new("m1"),
        name: "claude".to_string(),
    };
    insert_model(&conn, &model).unwrap();
    assert_eq!(find_model(&conn, &model.id).unwrap().unwrap().name, "claude");

    let chat = Chat {
        id: ChatId::new("c1"),
        project: "proj".to_string(),
        run_id: "run1".to_string(),
        model_id: Some(model.id.clone()),
        created_at: 5,
    };
    insert_chat(&conn, &chat).unwrap();
    assert_eq!(find_chat(&conn, &chat.id).unwrap().unwrap().project, "proj");

    let mut message = Message::new(MessageId::new("msg1"), chat.id.clone(), Role::Assistant, "hello", 6);
    message.output_tokens = 12;
    insert_message(&conn, &message).unwrap();

    let messages = list_messages_for_chat(&conn, &chat.id).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].output_tokens, 12);
    assert_eq!(messages[0].role, Role::Assistant);

    let tool_call = ToolCall {
        id: ToolCallId::new("tc1"),
        message_id: message.id.clone(),
        tool_call_id: "call_1".to_string(),
        name: "search".to_string(),
        arguments: serde_json::json!({"q": "rust"}),
    };
    insert_tool_call(&conn, &tool_call).unwrap();

    let calls = list_tool_calls_for_message(&conn, &message.id).unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "search");
}
