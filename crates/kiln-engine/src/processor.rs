// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Drains pending tasks across a fixed set of workspace slots, each slot
//! running its own cooperative claim-handle-repeat loop.

use crate::error::{EngineError, ProcessorError};
use crate::pipeline::BoxFuture;
use kiln_core::{Clock, IdGen, Task, TaskId, Workspace};
use kiln_store::Store;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// A registered handler: takes the claimed task and runs it to completion
/// (typically a [`crate::pipeline::PipelineFamily::run`] call).
pub type HandlerFn = Arc<dyn Fn(Task) -> BoxFuture<'static, Result<(), EngineError>> + Send + Sync>;

/// Called once after each task a drain loop finishes handling, whether it
/// succeeded or failed.
pub type AfterEachHook = Arc<dyn Fn() + Send + Sync>;

struct Shared {
    store: Store,
    clock: Arc<dyn Clock>,
    id_gen: Arc<dyn IdGen>,
    handlers: HashMap<String, HandlerFn>,
    aborted: AtomicBool,
}

/// Drains pending tasks across one or more workspace slots.
pub struct Processor {
    shared: Arc<Shared>,
    workspaces: Vec<Workspace>,
}

impl Processor {
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
        workspaces: Vec<Workspace>,
        handlers: HashMap<String, HandlerFn>,
    ) -> Result<Self, ProcessorError> {
        if workspaces.is_empty() {
            return Err(ProcessorError::NoWorkspaces);
        }
        Ok(Self {
            shared: Arc::new(Shared {
                store,
                clock,
                id_gen,
                handlers,
                aborted: AtomicBool::new(false),
            }),
            workspaces,
        })
    }

    /// Look up a task by `(record, handler_name)`, creating one if none
    /// exists yet. `handler_name` must already be registered.
    pub fn add_task(&self, record_type: impl Into<String>, record_id: i64, handler_name: impl Into<String>) -> Result<TaskId, ProcessorError> {
        let record_type = record_type.into();
        let handler_name = handler_name.into();
        if !self.shared.handlers.contains_key(&handler_name) {
            return Err(ProcessorError::UnknownHandler(handler_name));
        }
        let now = self.shared.clock.unix_seconds();
        let new_id = TaskId::new(self.shared.id_gen.next());
        self.shared
            .store
            .transaction(|txn| {
                if let Some(existing) = txn.find_task_for_record(&record_type, record_id, &handler_name)? {
                    return Ok(existing.id);
                }
                let task = Task::for_record(new_id.clone(), record_type.clone(), record_id, handler_name.clone(), now);
                txn.create_task(&task)?;
                Ok(task.id)
            })
            .map_err(ProcessorError::from)
    }

    /// Stop every drain loop at its next task-dequeue boundary. Does not
    /// interrupt a task already in flight.
    pub fn abort(&self) {
        self.shared.aborted.store(true, Ordering::SeqCst);
    }

    /// Drain every workspace. Synchronous for a single workspace; for more
    /// than one, runs one cooperative task per workspace and re-raises the
    /// first error, aborting the rest.
    pub async fn call(&self, after_each: Option<AfterEachHook>) -> Result<(), ProcessorError> {
        if self.workspaces.len() == 1 {
            return drain(self.shared.clone(), self.workspaces[0].clone(), after_each).await;
        }

        let mut set = tokio::task::JoinSet::new();
        for workspace in &self.workspaces {
            let shared = self.shared.clone();
            let workspace = workspace.clone();
            let after_each = after_each.clone();
            set.spawn(async move { drain(shared, workspace, after_each).await });
        }

        let mut first_error = None;
        while let Some(result) = set.join_next().await {
            let outcome = result.map_err(|join_err| ProcessorError::Engine(EngineError::Step(join_err.to_string())));
            match outcome.and_then(|r| r) {
                Ok(()) => {}
                Err(err) => {
                    self.abort();
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Drain loop for one workspace: claim the oldest pending task bound to it
/// (or unbound), run its handler, repeat until no pending task remains or
/// the processor is aborted.
async fn drain(shared: Arc<Shared>, workspace: Workspace, after_each: Option<AfterEachHook>) -> Result<(), ProcessorError> {
    loop {
        if shared.aborted.load(Ordering::SeqCst) {
            return Ok(());
        }

        let workspace_id = workspace.id.clone();
        let task = shared.store.transaction(|txn| txn.claim_next_pending_task(&workspace_id))?;
        let Some(task) = task else {
            return Ok(());
        };

        info!(task_id = task.id.short(8), workspace_id = workspace.id.short(8), "claimed task");
        let handler = shared
            .handlers
            .get(&task.handler)
            .cloned()
            .ok_or_else(|| ProcessorError::UnknownHandler(task.handler.clone()))?;

        let task_id = task.id.clone();
        handler(task).await?;

        let still_pending = shared
            .store
            .transaction(|txn| txn.find_task(&task_id))?
            .map(|t| t.is_pending())
            .unwrap_or(false);
        if still_pending {
            return Err(ProcessorError::TaskPending(task_id.as_str().to_string()));
        }

        if let Some(hook) = &after_each {
            hook();
        }
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
