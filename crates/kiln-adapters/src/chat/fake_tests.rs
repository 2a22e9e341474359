// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_core::SequentialIdGen;

fn backend() -> FakeChatBackend {
    FakeChatBackend::with_id_gen(ChatId::new("chat-1"), Arc::new(SequentialIdGen::new("msg")))
}

#[tokio::test]
async fn ask_returns_queued_reply_and_records_the_call() {
    let backend = backend();
    backend.push_reply("hello back");

    let reply = backend.ask("hello").await.unwrap();
    assert_eq!(reply.content, "hello back");
    assert_eq!(reply.role, Role::Assistant);
    assert_eq!(backend.ask_count(), 1);
    assert!(matches!(&backend.calls()[0], ChatBackendCall::Ask { prompt } if prompt == "hello"));
}

#[tokio::test]
async fn ask_replies_are_consumed_fifo() {
    let backend = backend();
    backend.push_reply("first");
    backend.push_reply("second");

    assert_eq!(backend.ask("a").await.unwrap().content, "first");
    assert_eq!(backend.ask("b").await.unwrap().content, "second");
}

#[tokio::test]
async fn ask_surfaces_queued_errors() {
    let backend = backend();
    backend.push_error(ChatBackendError::Transport("boom".to_string()));

    let err = backend.ask("x").await.unwrap_err();
    assert!(matches!(err, ChatBackendError::Transport(msg) if msg == "boom"));
}

#[tokio::test]
async fn ask_without_a_scripted_reply_errors_instead_of_panicking() {
    let backend = backend();
    let err = backend.ask("x").await.unwrap_err();
    assert!(matches!(err, ChatBackendError::Transport(_)));
}

#[tokio::test]
async fn default_reply_is_used_after_the_queue_drains() {
    let backend = backend();
    backend.push_reply("one");
    backend.set_default_reply("fallback");

    assert_eq!(backend.ask("a").await.unwrap().content, "one");
    assert_eq!(backend.ask("b").await.unwrap().content, "fallback");
    assert_eq!(backend.ask("c").await.unwrap().content, "fallback");
}

#[tokio::test]
async fn messages_accumulate_user_and_assistant_turns() {
    let backend = backend();
    backend.push_reply("reply");
    backend.ask("question").await.unwrap();

    let messages = backend.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[1].role, Role::Assistant);
}

#[tokio::test]
async fn on_end_message_hook_fires_once_per_successful_ask() {
    let backend = backend();
    backend.push_reply("reply");
    let count = Arc::new(Mutex::new(0));
    let counter = count.clone();
    backend.on_end_message(Arc::new(move |_msg| {
        *counter.lock() += 1;
    }));

    backend.ask("x").await.unwrap();
    assert_eq!(*count.lock(), 1);
}

#[test]
fn with_tools_records_the_call_and_names() {
    let backend = backend();
    backend.with_tools(vec![ToolSpec {
        name: "grep".to_string(),
        description: "search files".to_string(),
        parameters_schema: serde_json::json!({}),
    }]);

    assert!(matches!(
        &backend.calls()[0],
        ChatBackendCall::WithTools { names } if names == &vec!["grep".to_string()]
    ));
}
