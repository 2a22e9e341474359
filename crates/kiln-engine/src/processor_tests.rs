// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_core::{FakeClock, SequentialIdGen};
use kiln_store::{Store, StoreConfig};
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex as StdMutex;
use tempfile::TempDir;

fn store() -> (TempDir, Store) {
    let dir = TempDir::new().unwrap();
    let store = Store::open(StoreConfig::new(dir.path(), "kiln.sqlite3"), vec![], vec![]).unwrap();
    (dir, store)
}

fn workspace(n: &str) -> Workspace {
    Workspace::new(kiln_core::WorkspaceId::new(format!("ws-{n}")), std::path::PathBuf::from(format!("/tmp/ws-{n}")))
}

fn completing_handler() -> HandlerFn {
    Arc::new(|task: Task| -> BoxFuture<'static, Result<(), EngineError>> {
        Box::pin(async move {
            // No store handle available in this minimal handler double;
            // real callers run `PipelineFamily::run` here instead.
            let _ = task;
            Ok(())
        })
    })
}

#[test]
fn new_requires_at_least_one_workspace() {
    let (_dir, store) = self::store();
    let err = Processor::new(store, Arc::new(FakeClock::new()), Arc::new(SequentialIdGen::new("task")), vec![], HashMap::new());
    assert!(matches!(err, Err(ProcessorError::NoWorkspaces)));
}

#[test]
fn add_task_rejects_an_unregistered_handler() {
    let (_dir, store) = self::store();
    let processor = Processor::new(
        store,
        Arc::new(FakeClock::new()),
        Arc::new(SequentialIdGen::new("task")),
        vec![workspace("1")],
        HashMap::new(),
    )
    .unwrap();

    let err = processor.add_task("widget", 1, "nonexistent");
    assert!(matches!(err, Err(ProcessorError::UnknownHandler(name)) if name == "nonexistent"));
}

#[test]
fn add_task_is_idempotent_for_the_same_record_and_handler() {
    let (_dir, store) = self::store();
    let mut handlers = HashMap::new();
    handlers.insert("demo".to_string(), completing_handler());
    let processor = Processor::new(
        store,
        Arc::new(FakeClock::new()),
        Arc::new(SequentialIdGen::new("task")),
        vec![workspace("1")],
        handlers,
    )
    .unwrap();

    let first = processor.add_task("widget", 1, "demo").unwrap();
    let second = processor.add_task("widget", 1, "demo").unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn call_drains_every_pending_task_on_a_single_workspace() {
    let (_dir, store) = self::store();
    let handled = Arc::new(StdMutex::new(Vec::new()));
    let handled_inner = handled.clone();
    let handlers_store = store.clone();
    let mut handlers: HashMap<String, HandlerFn> = HashMap::new();
    handlers.insert(
        "demo".to_string(),
        Arc::new(move |task: Task| -> BoxFuture<'static, Result<(), EngineError>> {
            let handled = handled_inner.clone();
            let store = handlers_store.clone();
            Box::pin(async move {
                handled.lock().unwrap().push(task.id.clone());
                store.transaction(|txn| {
                    let mut t = task.clone();
                    t.mark_done(0);
                    txn.update_task(&t)
                })?;
                Ok(())
            })
        }),
    );

    let processor = Processor::new(
        store.clone(),
        Arc::new(FakeClock::new()),
        Arc::new(SequentialIdGen::new("task")),
        vec![workspace("1")],
        handlers,
    )
    .unwrap();

    processor.add_task("widget", 1, "demo").unwrap();
    processor.add_task("widget", 2, "demo").unwrap();

    let after_each_count = Arc::new(AtomicUsize::new(0));
    let after_each_inner = after_each_count.clone();
    processor
        .call(Some(Arc::new(move || {
            after_each_inner.fetch_add(1, AtomicOrdering::SeqCst);
        })))
        .await
        .unwrap();

    assert_eq!(handled.lock().unwrap().len(), 2);
    assert_eq!(after_each_count.load(AtomicOrdering::SeqCst), 2);
}

#[tokio::test]
async fn call_raises_task_pending_when_a_handler_leaves_the_task_pending() {
    let (_dir, store) = self::store();
    let mut handlers: HashMap<String, HandlerFn> = HashMap::new();
    handlers.insert(
        "demo".to_string(),
        Arc::new(|_task: Task| -> BoxFuture<'static, Result<(), EngineError>> { Box::pin(async { Ok(()) }) }),
    );

    let processor = Processor::new(
        store,
        Arc::new(FakeClock::new()),
        Arc::new(SequentialIdGen::new("task")),
        vec![workspace("1")],
        handlers,
    )
    .unwrap();
    processor.add_task("widget", 1, "demo").unwrap();

    let err = processor.call(None).await.unwrap_err();
    assert!(matches!(err, ProcessorError::TaskPending(_)));
}

#[tokio::test]
async fn call_binds_an_unowned_task_to_the_claiming_workspace() {
    let (_dir, store) = self::store();
    let seen_workspace = Arc::new(StdMutex::new(None));
    let seen_workspace_inner = seen_workspace.clone();
    let handlers_store = store.clone();
    let mut handlers: HashMap<String, HandlerFn> = HashMap::new();
    handlers.insert(
        "demo".to_string(),
        Arc::new(move |task: Task| -> BoxFuture<'static, Result<(), EngineError>> {
            let seen_workspace = seen_workspace_inner.clone();
            let store = handlers_store.clone();
            Box::pin(async move {
                *seen_workspace.lock().unwrap() = task.workspace_id.clone();
                store.transaction(|txn| {
                    let mut t = task.clone();
                    t.mark_done(0);
                    txn.update_task(&t)
                })?;
                Ok(())
            })
        }),
    );

    let processor = Processor::new(
        store,
        Arc::new(FakeClock::new()),
        Arc::new(SequentialIdGen::new("task")),
        vec![workspace("1")],
        handlers,
    )
    .unwrap();
    processor.add_task("widget", 1, "demo").unwrap();

    processor.call(None).await.unwrap();

    assert_eq!(seen_workspace.lock().unwrap().as_deref(), Some("ws-1"));
}
