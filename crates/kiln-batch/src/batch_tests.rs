// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_adapters::{ChatBackend, FakeChatBackend, FakeGit};
use kiln_core::{ChatId, FakeClock, SequentialIdGen};
use kiln_engine::StepOutcome;
use kiln_session::{BackendFactory, FakeCostOracle};
use kiln_store::{ColumnType, RecordDef, StoreConfig};
use tempfile::TempDir;

fn widgets_def() -> RecordDef {
    RecordDef::new("widget").with_table("widgets").with_column("name", ColumnType::Text)
}

struct Fixture {
    _dir: TempDir,
    store: Store,
    session: Arc<Session>,
    git: Arc<dyn Git>,
}

fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let store = Store::open(StoreConfig::new(dir.path(), "kiln.sqlite3"), vec![widgets_def()], vec![]).unwrap();

    let backend = Arc::new(FakeChatBackend::with_id_gen(ChatId::new("chat-seed"), Arc::new(SequentialIdGen::new("msg"))));
    let factory: BackendFactory = Arc::new(move |_id| backend.clone() as Arc<dyn ChatBackend>);

    let session = Arc::new(Session::new(
        store.clone(),
        Arc::new(FakeClock::new()),
        Arc::new(SequentialIdGen::new("chat")),
        "demo-project",
        "run-1",
        1_000.0,
        1_000.0,
        Arc::new(FakeCostOracle::new()) as Arc<dyn kiln_session::CostOracle>,
        factory,
    ));

    Fixture {
        _dir: dir,
        store,
        session,
        git: Arc::new(FakeGit::new()),
    }
}

fn workspace(n: &str, dir: &std::path::Path) -> Workspace {
    Workspace::new(kiln_core::WorkspaceId::new(format!("ws-{n}")), dir.to_path_buf())
}

fn succeeding_pipeline() -> Arc<PipelineFamily> {
    Arc::new(PipelineFamily::new().step("only", |_args| async { Ok(StepOutcome::Continue) }))
}

fn failing_pipeline() -> Arc<PipelineFamily> {
    Arc::new(PipelineFamily::new().step("only", |_args| async { Err(EngineError::Step("boom".to_string())) }))
}

#[test]
fn report_on_an_empty_batch_prints_total_zero() {
    let fx = fixture();
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let batch = Batch::new(
        fx.store,
        clock,
        Arc::new(SequentialIdGen::new("task")),
        fx.session,
        vec![workspace("1", &fx._dir.path().join("ws-1"))],
        fx.git,
        "widget",
        succeeding_pipeline(),
    )
    .unwrap();

    assert_eq!(batch.report().unwrap().render(), "Total: 0");
}

#[tokio::test]
async fn call_drains_a_task_through_the_pipeline_and_reports_success() {
    let fx = fixture();
    let record = fx
        .store
        .transaction(|txn| txn.table("widgets").create(vec![("name".to_string(), "gizmo".into())], 0))
        .unwrap();
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let batch = Batch::new(
        fx.store,
        clock,
        Arc::new(SequentialIdGen::new("task")),
        fx.session,
        vec![workspace("1", &fx._dir.path().join("ws-1"))],
        fx.git,
        "widget",
        succeeding_pipeline(),
    )
    .unwrap();

    batch.add_task(record.id).unwrap();
    batch.call(None).await.unwrap();

    let report = batch.report().unwrap().render();
    assert!(report.contains("Total: 1"));
    assert!(report.contains("Succeeded: 1"));
    assert!(report.contains("Failed: 0"));
}

#[tokio::test]
async fn call_reports_a_failed_task_with_its_error_message() {
    let fx = fixture();
    let record = fx
        .store
        .transaction(|txn| txn.table("widgets").create(vec![("name".to_string(), "gizmo".into())], 0))
        .unwrap();
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let batch = Batch::new(
        fx.store,
        clock,
        Arc::new(SequentialIdGen::new("task")),
        fx.session,
        vec![workspace("1", &fx._dir.path().join("ws-1"))],
        fx.git,
        "widget",
        failing_pipeline(),
    )
    .unwrap();

    batch.add_task(record.id).unwrap();
    batch.call(None).await.unwrap();

    let report = batch.report().unwrap().render();
    assert!(report.contains("Failed: 1"));
    assert!(report.contains("First 1 failed task(s):"));
    assert!(report.contains("- boom"));
}

#[test]
fn add_task_reuses_the_existing_task_for_the_same_record() {
    let fx = fixture();
    let clock: Arc<dyn Clock> = Arc::new(FakeClock::new());
    let batch = Batch::new(
        fx.store,
        clock,
        Arc::new(SequentialIdGen::new("task")),
        fx.session,
        vec![workspace("1", &fx._dir.path().join("ws-1"))],
        fx.git,
        "widget",
        succeeding_pipeline(),
    )
    .unwrap();

    let first = batch.add_task(1).unwrap();
    let second = batch.add_task(1).unwrap();
    assert_eq!(first, second);
}
