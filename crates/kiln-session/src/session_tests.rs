// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::cost::FakeCostOracle;
use kiln_adapters::FakeChatBackend;
use kiln_core::{FakeClock, SequentialIdGen};
use kiln_store::{Store, StoreConfig};
use serde_json::json;
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    session: Session,
    backend: Arc<FakeChatBackend>,
}

fn fixture_with_oracle(cost_oracle: Arc<FakeCostOracle>, max_spend_project: f64, max_spend_run: f64) -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = Store::open(StoreConfig::new(dir.path(), "kiln.sqlite3"), vec![], vec![]).unwrap();
    let backend = Arc::new(FakeChatBackend::with_id_gen(
        ChatId::new("chat-seed"),
        Arc::new(SequentialIdGen::new("msg")),
    ));
    let backend_for_factory = backend.clone();
    let factory: BackendFactory = Arc::new(move |id: &ChatId| {
        let _ = id;
        let backend: Arc<dyn ChatBackend> = backend_for_factory.clone();
        backend
    });

    let session = Session::new(
        store,
        Arc::new(FakeClock::new()),
        Arc::new(SequentialIdGen::new("chat")),
        "demo-project",
        "run-1",
        max_spend_project,
        max_spend_run,
        cost_oracle as Arc<dyn CostOracle>,
        factory,
    );

    Fixture {
        _dir: dir,
        session,
        backend,
    }
}

fn fixture() -> Fixture {
    fixture_with_oracle(Arc::new(FakeCostOracle::new()), 1_000.0, 1_000.0)
}

#[tokio::test]
async fn prompt_returns_success_for_a_well_formed_reply() {
    let fx = fixture();
    fx.backend.push_reply(r#"{"attr": "x"}"#);

    let response = fx
        .session
        .prompt(PromptRequest::new("describe the widget").with_schema(json!({
            "type": "object",
            "properties": {"attr": {"type": "string"}},
            "required": ["attr"]
        })))
        .await
        .unwrap();

    assert_eq!(response, ChatResponse::success(json!({"attr": "x"})));
}

#[tokio::test]
async fn prompt_invokes_on_chat_created_before_asking_the_model() {
    let fx = fixture();
    fx.backend.push_reply(r#"{"ok": true}"#);

    let mut seen_id = None;
    fx.session
        .prompt_with(PromptRequest::new("go"), |id| seen_id = Some(id.clone()))
        .await
        .unwrap();

    assert!(seen_id.is_some());
}

#[tokio::test]
async fn prompt_surfaces_the_models_decline_as_an_error_response() {
    let fx = fixture();
    let schema = json!({"type": "object", "properties": {"attr": {"type": "string"}}, "required": ["attr"]});
    fx.backend
        .push_reply(r#"{"unable_to_fulfill_request_error": "can't do that"}"#);

    let response = fx
        .session
        .prompt(PromptRequest::new("do the impossible thing").with_schema(schema))
        .await
        .unwrap();

    assert!(!response.is_success());
    assert_eq!(response.error_message(), Some("can't do that"));
}

#[tokio::test]
async fn prompt_aborts_when_the_project_cost_oracle_is_already_over_threshold() {
    let oracle = Arc::new(FakeCostOracle::new());
    oracle.set_project_cost(1.8);
    let fx = fixture_with_oracle(oracle, 1.0, 1_000.0);
    fx.backend.push_reply(r#"{"ok": true}"#);

    let err = fx.session.prompt(PromptRequest::new("go")).await.unwrap_err();

    match err {
        SessionError::AbortCostExceeded(abort) => {
            assert_eq!(abort.cost_type, "project");
            assert_eq!(abort.current_cost, 1.8);
            assert_eq!(abort.threshold, 1.0);
            assert_eq!(abort.to_string(), "Abort: project cost $1.80 exceeds threshold $1.00");
        }
        other => panic!("expected AbortCostExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn prompt_rejects_an_unknown_tool_before_asking_the_model() {
    let fx = fixture();

    let err = fx
        .session
        .prompt(PromptRequest::new("go").with_tools(vec![ToolRef::name("nonexistent")]))
        .await
        .unwrap_err();

    match err {
        SessionError::UnknownTool { name, .. } => assert_eq!(name, "nonexistent"),
        other => panic!("expected UnknownTool, got {other:?}"),
    }
    assert_eq!(fx.backend.ask_count(), 0);
}
