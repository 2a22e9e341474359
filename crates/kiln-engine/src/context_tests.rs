// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::translator::NullTranslator;
use kiln_adapters::{ChatBackend, FakeChatBackend, FakeGit};
use kiln_core::{FakeClock, SequentialIdGen, Task, TaskId, Workspace, WorkspaceId};
use kiln_session::{BackendFactory, Session};
use kiln_store::{ColumnType, RecordDef, Store, StoreConfig};
use serde_json::json;
use std::sync::Arc;
use tempfile::TempDir;

fn widgets_def() -> RecordDef {
    RecordDef::new("widget")
        .with_table("widgets")
        .with_column("name", ColumnType::Text)
        .with_column("count", ColumnType::Integer)
        .with_column("metadata", ColumnType::Json)
}

struct Fixture {
    _dir: TempDir,
    args: StepArgs,
    task_id: TaskId,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = Store::open(StoreConfig::new(dir.path(), "kiln.sqlite3"), vec![widgets_def()], vec![]).unwrap();

    let record = store
        .transaction(|txn| txn.table("widgets").create(vec![("name".to_string(), "gizmo".into())], 0))
        .unwrap();

    let task_id = TaskId::new("task-1");
    let task = Task::for_record(task_id.clone(), "widget", record.id, "demo", 0);
    store.transaction(|txn| txn.create_task(&task)).unwrap();

    let backend = Arc::new(FakeChatBackend::new(kiln_core::ChatId::new("chat-seed")));
    let backend_for_factory: Arc<dyn ChatBackend> = backend.clone();
    let factory: BackendFactory = Arc::new(move |_id| backend_for_factory.clone());

    let session = Arc::new(Session::new(
        store.clone(),
        Arc::new(FakeClock::new()),
        Arc::new(SequentialIdGen::new("chat")),
        "demo-project",
        "run-1",
        1_000.0,
        1_000.0,
        Arc::new(kiln_session::FakeCostOracle::new()),
        factory,
    ));

    let args = StepArgs {
        store,
        workspace: Workspace::new(WorkspaceId::new("ws-1"), dir.path().to_path_buf()),
        session,
        git: Arc::new(FakeGit::new()),
        translator: Arc::new(NullTranslator),
        clock: Arc::new(FakeClock::new()),
        task_id: task_id.clone(),
    };

    Fixture { _dir: dir, args, task_id }
}

#[test]
fn record_loads_the_task_bound_record() {
    let fx = fixture();
    let record = fx.args.record().unwrap().expect("record bound");
    assert_eq!(record.fields.get("name").unwrap().as_text(), Some("gizmo"));
}

#[test]
fn record_returns_none_when_task_has_no_bound_record() {
    let mut fx = fixture();
    let other = TaskId::new("task-2");
    fx.args
        .store
        .transaction(|txn| txn.create_task(&Task::new(other.clone(), "demo", 0)))
        .unwrap();
    fx.args.task_id = other;

    assert!(fx.args.record().unwrap().is_none());
}

#[test]
fn update_record_stores_scalars_unquoted() {
    let fx = fixture();
    let mut fields = serde_json::Map::new();
    fields.insert("name".to_string(), json!("widget-renamed"));
    fields.insert("count".to_string(), json!(7));
    fields.insert("metadata".to_string(), json!({"tag": "x"}));

    fx.args.update_record(fields).unwrap();

    let record = fx.args.record().unwrap().unwrap();
    assert_eq!(record.fields.get("name").unwrap().as_text(), Some("widget-renamed"));
    assert_eq!(record.fields.get("count").unwrap().as_integer(), Some(7));
    assert_eq!(record.fields.get("metadata").unwrap().as_json(), Some(&json!({"tag": "x"})));
}

#[test]
fn update_record_is_a_noop_when_task_has_no_bound_record() {
    let fx = fixture();
    let other = TaskId::new("task-2");
    fx.args
        .store
        .transaction(|txn| txn.create_task(&Task::new(other.clone(), "demo", 0)))
        .unwrap();
    let mut args = fx.args.clone();
    args.task_id = other;

    let mut fields = serde_json::Map::new();
    fields.insert("anything".to_string(), json!("ignored"));
    args.update_record(fields).unwrap();
}

#[test]
fn record_i18n_attrs_reflects_the_bound_records_columns() {
    let fx = fixture();
    let attrs = fx.args.record_i18n_attrs().unwrap();
    assert_eq!(attrs.get("name"), Some(&json!("gizmo")));
}

#[test]
fn record_i18n_attrs_is_empty_without_a_bound_record() {
    let mut fx = fixture();
    let other = TaskId::new("task-2");
    fx.args
        .store
        .transaction(|txn| txn.create_task(&Task::new(other.clone(), "demo", 0)))
        .unwrap();
    fx.args.task_id = other;

    assert!(fx.args.record_i18n_attrs().unwrap().is_empty());
}
