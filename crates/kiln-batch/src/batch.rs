// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thin assembly layer: wires a store, a session, and a pool of workspaces
//! into a single-handler [`Processor`] bound to one domain record type,
//! and renders its run report.

use crate::error::BatchError;
use crate::repo::{provision_workspaces, RepoConfig};
use kiln_adapters::Git;
use kiln_core::{Clock, IdGen, Task, TaskId, TaskStatus, Workspace};
use kiln_engine::{AfterEachHook, BoxFuture, EngineError, HandlerFn, NullTranslator, PipelineFamily, Processor, StepArgs, Translator};
use kiln_session::Session;
use kiln_store::Store;
use std::collections::HashMap;
use std::sync::Arc;

/// A rendered batch report, matching the deterministic line-delimited
/// format callers diff against in logs and tests.
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

/// Assembles a store, session, and workspace pool into a runnable batch
/// over one `record_type`, and renders its run report.
pub struct Batch {
    processor: Processor,
    store: Store,
    session: Arc<Session>,
    clock: Arc<dyn Clock>,
    record_type: String,
    workspaces: Vec<Workspace>,
}

impl Batch {
    /// Assemble a batch over an explicit pool of workspaces.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
        session: Arc<Session>,
        workspaces: Vec<Workspace>,
        git: Arc<dyn Git>,
        record_type: impl Into<String>,
        pipeline: Arc<PipelineFamily>,
    ) -> Result<Self, BatchError> {
        Self::assemble(store, clock, id_gen, session, workspaces, git, record_type.into(), pipeline, Arc::new(NullTranslator))
    }

    /// Assemble a batch from a git repo configuration, provisioning one
    /// worktree per `repo.worktree_envs` entry first.
    #[allow(clippy::too_many_arguments)]
    pub async fn with_repo(
        store: Store,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
        session: Arc<Session>,
        repo: &RepoConfig,
        git: Arc<dyn Git>,
        record_type: impl Into<String>,
        pipeline: Arc<PipelineFamily>,
    ) -> Result<Self, BatchError> {
        let workspaces = provision_workspaces(repo, &git, &id_gen).await?;
        Self::assemble(store, clock, id_gen, session, workspaces, git, record_type.into(), pipeline, Arc::new(NullTranslator))
    }

    /// Like [`Self::new`] but with an explicit i18n translator for agent
    /// prompts instead of the default no-op [`NullTranslator`].
    #[allow(clippy::too_many_arguments)]
    pub fn with_translator(
        store: Store,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
        session: Arc<Session>,
        workspaces: Vec<Workspace>,
        git: Arc<dyn Git>,
        record_type: impl Into<String>,
        pipeline: Arc<PipelineFamily>,
        translator: Arc<dyn Translator>,
    ) -> Result<Self, BatchError> {
        Self::assemble(store, clock, id_gen, session, workspaces, git, record_type.into(), pipeline, translator)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        store: Store,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
        session: Arc<Session>,
        workspaces: Vec<Workspace>,
        git: Arc<dyn Git>,
        record_type: String,
        pipeline: Arc<PipelineFamily>,
        translator: Arc<dyn Translator>,
    ) -> Result<Self, BatchError> {
        let handler = build_handler(store.clone(), session.clone(), clock.clone(), git, translator, workspaces.clone(), pipeline);

        let mut handlers = HashMap::new();
        handlers.insert(record_type.clone(), handler);

        let processor = Processor::new(store.clone(), clock.clone(), id_gen, workspaces.clone(), handlers)?;
        Ok(Self {
            processor,
            store,
            session,
            clock,
            record_type,
            workspaces,
        })
    }

    /// Enqueue a task for `record_id` of this batch's record type, reusing
    /// an existing task if one is already queued for it.
    pub fn add_task(&self, record_id: i64) -> Result<TaskId, BatchError> {
        Ok(self.processor.add_task(self.record_type.clone(), record_id, self.record_type.clone())?)
    }

    /// Stop every drain loop at its next task-dequeue boundary.
    pub fn abort(&self) {
        self.processor.abort();
    }

    /// Drain every workspace, running `after_each` once per completed task.
    pub async fn call(&self, after_each: Option<AfterEachHook>) -> Result<(), BatchError> {
        Ok(self.processor.call(after_each).await?)
    }

    /// Render the deterministic run report described in the module docs:
    /// task counts by status, elapsed time span, worktree count, cost
    /// figures from the session's cost oracle, and the first failed
    /// tasks' error messages.
    pub fn report(&self) -> Result<Report, BatchError> {
        let (pending, done, failed) = self.store.transaction(|txn| {
            Ok((
                txn.list_tasks_by_status(TaskStatus::Pending)?,
                txn.list_tasks_by_status(TaskStatus::Done)?,
                txn.list_tasks_by_status(TaskStatus::Failed)?,
            ))
        })?;

        let total = pending.len() + done.len() + failed.len();
        if total == 0 {
            return Ok(Report { lines: vec!["Total: 0".to_string()] });
        }

        let all_tasks: Vec<&Task> = pending.iter().chain(done.iter()).chain(failed.iter()).collect();
        let min_created = all_tasks.iter().map(|t| t.created_at).min().unwrap_or_else(|| self.clock.unix_seconds());
        let max_updated = all_tasks.iter().map(|t| t.updated_at).max().unwrap_or(min_created);
        let span_seconds = (max_updated - min_created).max(0);
        let (hours, minutes, seconds) = (span_seconds / 3600, (span_seconds % 3600) / 60, span_seconds % 60);

        let worktrees = self.workspaces.len();
        let run_cost = self.session.cost_oracle().run_cost();
        let project_cost = self.session.cost_oracle().project_cost();

        let mut lines = vec![
            format!("Total: {total}"),
            format!("Succeeded: {}", done.len()),
            format!("Pending: {}", pending.len()),
            format!("Failed: {}", failed.len()),
            format!("Time: {hours} hrs, {minutes} mins, {seconds} secs"),
            format!("Worktrees: {worktrees}"),
            format!("Run cost: ${run_cost:.2}"),
            format!("Project total cost: ${project_cost:.2}"),
        ];

        if worktrees > 0 {
            let cost_per_task = run_cost * worktrees as f64 / total as f64;
            lines.push(format!("Cost per task: ${cost_per_task:.2}"));
            let total_minutes = span_seconds as f64 / 60.0;
            let minutes_per_task = (total_minutes / worktrees as f64) / total as f64;
            lines.push(format!("Minutes per task: {minutes_per_task:.2}"));
        }

        lines.push(String::new());
        let shown = failed.len().min(3);
        lines.push(format!("First {shown} failed task(s):"));
        for task in failed.iter().take(3) {
            lines.push(format!("- {}", task.error_message.as_deref().unwrap_or("")));
        }

        Ok(Report { lines })
    }
}

#[allow(clippy::too_many_arguments)]
fn build_handler(
    store: Store,
    session: Arc<Session>,
    clock: Arc<dyn Clock>,
    git: Arc<dyn Git>,
    translator: Arc<dyn Translator>,
    workspaces: Vec<Workspace>,
    pipeline: Arc<PipelineFamily>,
) -> HandlerFn {
    Arc::new(move |task: Task| -> BoxFuture<'static, Result<(), EngineError>> {
        let store = store.clone();
        let session = session.clone();
        let clock = clock.clone();
        let git = git.clone();
        let translator = translator.clone();
        let workspaces = workspaces.clone();
        let pipeline = pipeline.clone();
        Box::pin(async move {
            let workspace = workspaces
                .iter()
                .find(|w| task.workspace_id.as_deref() == Some(w.id.as_str()))
                .cloned()
                .ok_or_else(|| EngineError::TaskNotFound(task.id.as_str().to_string()))?;
            let args = StepArgs {
                store,
                workspace,
                session,
                git,
                translator,
                clock,
                task_id: task.id.clone(),
            };
            pipeline.run(&task.id, &args).await
        })
    })
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
