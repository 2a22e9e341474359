// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session: immutable configuration bundling the store, the LLM
//! transport, spend limits, and the extra-tools registry, plus the single
//! `prompt()` entry point agent steps call into.

use crate::cost::CostOracle;
use crate::error::{AbortCostExceeded, SessionError};
use crate::response::ChatResponse;
use crate::tool::{ToolArgs, ToolRef, ToolRegistry};
use kiln_adapters::{ChatBackend, ToolSpec as BackendToolSpec};
use kiln_chat::{result_schema, Chat};
use kiln_core::{ChatId, Clock, IdGen, Message};
use kiln_store::Store;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

pub type BackendFactory = Arc<dyn Fn(&ChatId) -> Arc<dyn ChatBackend> + Send + Sync>;

/// Parameters for one `session.prompt(...)` call.
#[derive(Default)]
pub struct PromptRequest {
    pub prompt: Vec<String>,
    pub schema: Option<Value>,
    pub cached_prompt: Vec<String>,
    pub tools: Vec<ToolRef>,
    pub tool_args: ToolArgs,
    pub confirm: u32,
    pub out_of: u32,
}

impl PromptRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: vec![prompt.into()],
            confirm: 1,
            out_of: 1,
            ..Default::default()
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolRef>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_confirmation(mut self, confirm: u32, out_of: u32) -> Self {
        self.confirm = confirm;
        self.out_of = out_of;
        self
    }

    fn joined_prompt(&self) -> String {
        self.prompt.join("\n")
    }
}

/// Immutable session configuration: store handle, transport, spend limits,
/// and the extra-tools registry.
pub struct Session {
    store: Store,
    clock: Arc<dyn Clock>,
    id_gen: Arc<dyn IdGen>,
    project: String,
    run_id: String,
    default_workspace_dir: Option<PathBuf>,
    max_spend_project: f64,
    max_spend_run: f64,
    cost_oracle: Arc<dyn CostOracle>,
    tool_registry: ToolRegistry,
    backend_factory: BackendFactory,
}

impl Session {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Store,
        clock: Arc<dyn Clock>,
        id_gen: Arc<dyn IdGen>,
        project: impl Into<String>,
        run_id: impl Into<String>,
        max_spend_project: f64,
        max_spend_run: f64,
        cost_oracle: Arc<dyn CostOracle>,
        backend_factory: BackendFactory,
    ) -> Self {
        Self {
            store,
            clock,
            id_gen,
            project: project.into(),
            run_id: run_id.into(),
            default_workspace_dir: None,
            max_spend_project,
            max_spend_run,
            cost_oracle,
            tool_registry: ToolRegistry::new(),
            backend_factory,
        }
    }

    pub fn with_default_workspace_dir(mut self, dir: PathBuf) -> Self {
        self.default_workspace_dir = Some(dir);
        self
    }

    pub fn with_tool_registry(mut self, registry: ToolRegistry) -> Self {
        self.tool_registry = registry;
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn cost_oracle(&self) -> &Arc<dyn CostOracle> {
        &self.cost_oracle
    }

    /// Resolve a tool value (name, factory, or instance) to an instance,
    /// per the precedence in the module docs.
    pub fn resolve_tool(&self, tool: &ToolRef, tool_args: &ToolArgs) -> Result<Arc<dyn crate::tool::Tool>, SessionError> {
        self.tool_registry
            .resolve(tool, tool_args, self.default_workspace_dir.as_deref())
    }

    /// Create a chat, drive it through the structured-output gateway with
    /// `request`, and return the outcome. `on_chat_created` is invoked with
    /// the new chat's id as soon as it is known, before the model is asked
    /// anything — callers use it to record the chat id on a task.
    pub async fn prompt_with(
        &self,
        request: PromptRequest,
        on_chat_created: impl FnOnce(&ChatId),
    ) -> Result<ChatResponse, SessionError> {
        let resolved_tools = self.resolve_tools(&request)?;

        let chat_id = ChatId::new(self.id_gen.next());
        let backend = (self.backend_factory)(&chat_id);
        if !resolved_tools.is_empty() {
            backend.with_tools(resolved_tools);
        }

        self.store.transaction(|txn| {
            txn.create_chat(&kiln_core::Chat {
                id: chat_id.clone(),
                project: self.project.clone(),
                run_id: self.run_id.clone(),
                model_id: None,
                created_at: self.clock.unix_seconds(),
            })
        })?;
        on_chat_created(&chat_id);

        let abort_slot: Arc<Mutex<Option<AbortCostExceeded>>> = Arc::new(Mutex::new(None));
        self.install_hooks(&backend, &abort_slot);

        let chat = Chat::new(backend);
        let prompt = self.build_prompt(&request);
        let schema = request.schema.as_ref().map(result_schema);

        let outcome = chat.get(&prompt, schema.as_ref(), request.confirm.max(1), request.out_of.max(1)).await;

        if let Some(abort) = abort_slot.lock().take() {
            return Err(SessionError::AbortCostExceeded(abort));
        }

        match outcome {
            Ok(value) => {
                if kiln_chat::is_error_branch(&value) {
                    let message = value
                        .get("unable_to_fulfill_request_error")
                        .and_then(Value::as_str)
                        .unwrap_or("the model declined to fulfill the request")
                        .to_string();
                    Ok(ChatResponse::error("ModelDeclinedError", message))
                } else {
                    Ok(ChatResponse::success(value))
                }
            }
            Err(err) => Ok(ChatResponse::error(chat_error_class_name(&err), err.to_string())),
        }
    }

    pub async fn prompt(&self, request: PromptRequest) -> Result<ChatResponse, SessionError> {
        self.prompt_with(request, |_id| {}).await
    }

    fn resolve_tools(&self, request: &PromptRequest) -> Result<Vec<BackendToolSpec>, SessionError> {
        request
            .tools
            .iter()
            .map(|tool_ref| {
                let tool = self.resolve_tool(tool_ref, &request.tool_args)?;
                Ok(BackendToolSpec {
                    name: tool.name().to_string(),
                    description: tool.description(),
                    parameters_schema: tool.parameters_schema(),
                })
            })
            .collect()
    }

    fn build_prompt(&self, request: &PromptRequest) -> String {
        if request.cached_prompt.is_empty() {
            request.joined_prompt()
        } else {
            format!("{}\n\n{}", request.cached_prompt.join("\n"), request.joined_prompt())
        }
    }

    /// Wire up message persistence and spend gating on a freshly created
    /// backend. The spend check runs on every assistant turn, not just the
    /// final one, so a mid-retry overspend aborts promptly.
    fn install_hooks(&self, backend: &Arc<dyn ChatBackend>, abort_slot: &Arc<Mutex<Option<AbortCostExceeded>>>) {
        let store = self.store.clone();
        backend.on_new_message(Arc::new(move |message: &Message| {
            if let Err(err) = store.transaction(|txn| txn.create_message(message)) {
                warn!(error = %err, "failed to persist chat message");
            }
        }));

        let cost_oracle = self.cost_oracle.clone();
        let max_spend_project = self.max_spend_project;
        let max_spend_run = self.max_spend_run;
        let abort_slot = abort_slot.clone();
        backend.on_end_message(Arc::new(move |_message: &Message| {
            let project_cost = cost_oracle.project_cost();
            let run_cost = cost_oracle.run_cost();
            let exceeded = if project_cost >= max_spend_project {
                Some(("project", project_cost, max_spend_project))
            } else if run_cost >= max_spend_run {
                Some(("run", run_cost, max_spend_run))
            } else {
                None
            };
            if let Some((cost_type, current_cost, threshold)) = exceeded {
                let mut slot = abort_slot.lock();
                if slot.is_none() {
                    *slot = Some(AbortCostExceeded {
                        cost_type: cost_type.to_string(),
                        current_cost,
                        threshold,
                    });
                }
            }
        }));
    }
}

fn chat_error_class_name(err: &kiln_chat::ChatError) -> &'static str {
    match err {
        kiln_chat::ChatError::Backend(_) => "ChatBackendError",
        kiln_chat::ChatError::InvalidResponse { .. } => "InvalidResponseError",
        kiln_chat::ChatError::NoConfirmation { .. } => "NoConfirmationError",
        kiln_chat::ChatError::InvalidSchema(_) => "InvalidSchemaError",
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
