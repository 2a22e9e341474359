// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline families: a declared sequence of steps run against a task,
//! one transaction per iteration so a crash between steps resumes cleanly.
//!
//! A plain [`Step`] body runs as an ordinary async function; any store
//! writes it makes are its own business. Only the bookkeeping that decides
//! whether the step counts as done — appending to `completed_steps`,
//! rewinding, or failing the task — commits inside a transaction. This is
//! a deliberate departure from a single all-enclosing transaction per
//! step: an `agent_step`'s model call can take seconds and must not hold
//! the store's write lock, and it is always safe to re-run (nothing
//! durable changes until it returns).

use crate::context::StepArgs;
use crate::error::EngineError;
use crate::translator::I18nAttrs;
use kiln_core::TaskId;
use kiln_session::{PromptRequest, SessionError, ToolArgs, ToolRef};
use kiln_store::StoreError;
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{info, warn};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// What a step body decided to do with the task's completed-steps trail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Continue,
    Rewind(String),
}

type StepFn = Arc<dyn Fn(StepArgs) -> BoxFuture<'static, Result<StepOutcome, EngineError>> + Send + Sync>;
type FailureHook = Arc<dyn Fn(StepArgs) -> Result<(), EngineError> + Send + Sync>;

/// One declared step: a name plus the async body run when it is reached.
pub struct Step {
    pub name: String,
    body: StepFn,
}

/// The resolved prompt payload a block given to `agent_step` hands back,
/// bypassing the translator entirely.
#[derive(Clone, Default)]
pub struct PromptPayload {
    pub prompt: String,
    pub cached_prompt: Vec<String>,
    pub tools: Vec<ToolRef>,
    pub tool_args: ToolArgs,
    pub schema: Option<Value>,
}

impl PromptPayload {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }
}

type AgentBlock = Arc<dyn Fn(StepArgs) -> BoxFuture<'static, Result<PromptPayload, EngineError>> + Send + Sync>;

/// Prompt configuration for one `agent_step` or `agent_review_loop` call.
///
/// If `block` is set it is called and its returned [`PromptPayload`] is used
/// verbatim, bypassing the translator. Otherwise `prompt` and `cached_prompt`
/// each resolve through the translator (`<key>.prompt`, `<key>.cached_prompts`)
/// whenever left at their default, falling back to the i18n-derived value;
/// an explicit `cached_prompt` always wins. `tools`, `tool_args`, and
/// `schema` have no i18n form — they are Rust values, not translatable
/// strings — so they always come from this config.
#[derive(Clone, Default)]
pub struct AgentStepConfig {
    pub prompt_key: Option<String>,
    pub cached_prompt: Vec<String>,
    pub tools: Vec<ToolRef>,
    pub tool_args: ToolArgs,
    pub schema: Option<Value>,
    pub confirm: u32,
    pub out_of: u32,
    block: Option<AgentBlock>,
}

impl AgentStepConfig {
    pub fn new() -> Self {
        Self {
            confirm: 1,
            out_of: 1,
            ..Default::default()
        }
    }

    pub fn with_prompt_key(mut self, key: impl Into<String>) -> Self {
        self.prompt_key = Some(key.into());
        self
    }

    pub fn with_cached_prompt(mut self, cached_prompt: Vec<String>) -> Self {
        self.cached_prompt = cached_prompt;
        self
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

    /// Resolve the prompt payload with a block instead of the translator;
    /// takes precedence over every other field on this config.
    pub fn with_block<F, Fut>(mut self, block: F) -> Self
    where
        F: Fn(StepArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<PromptPayload, EngineError>> + Send + 'static,
    {
        self.block = Some(Arc::new(move |args| -> BoxFuture<'static, Result<PromptPayload, EngineError>> { Box::pin(block(args)) }));
        self
    }
}

/// One prompt in an `agent_review_loop`'s implement/iterate/review lists:
/// an i18n key plus its config.
#[derive(Clone)]
pub struct AgentPromptSpec {
    pub key: String,
    pub config: AgentStepConfig,
}

impl AgentPromptSpec {
    pub fn new(key: impl Into<String>, config: AgentStepConfig) -> Self {
        Self { key: key.into(), config }
    }
}

fn review_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "approved": {"type": "boolean"},
            "feedback": {"type": "string"},
        },
        "required": ["approved", "feedback"],
    })
}

/// Resolve this step's prompt payload, run it through the chat gateway, and
/// record the new chat id on the task as soon as it exists.
///
/// Resolution: a `block` on `config` wins outright. Otherwise the prompt
/// always comes from the translator (`config.prompt_key` or `<key>.prompt`);
/// `cached_prompt` does too whenever the config leaves it empty, falling
/// back to `<key>.cached_prompts`. `tools` and `schema` have no i18n form
/// and always come from `config`.
async fn run_agent_prompt(
    args: &StepArgs,
    key: &str,
    config: &AgentStepConfig,
    extra_attrs: I18nAttrs,
) -> Result<kiln_session::ChatResponse, EngineError> {
    let mut attrs = args.record_i18n_attrs()?;
    attrs.extend(extra_attrs);

    let (prompt, cached_prompt, tools, tool_args, schema) = if let Some(block) = &config.block {
        let payload = block(args.clone()).await?;
        (payload.prompt, payload.cached_prompt, payload.tools, payload.tool_args, payload.schema)
    } else {
        let prompt_key = config.prompt_key.clone().unwrap_or_else(|| format!("{key}.prompt"));
        let prompt = args
            .translator
            .t(&prompt_key, &attrs)
            .ok_or_else(|| EngineError::MissingTranslation(prompt_key.clone()))?;
        let cached_prompt = if config.cached_prompt.is_empty() {
            args.translator.t_list(&format!("{key}.cached_prompts"))
        } else {
            config.cached_prompt.clone()
        };
        (prompt, cached_prompt, config.tools.clone(), config.tool_args.clone(), config.schema.clone())
    };

    let request = PromptRequest {
        prompt: vec![prompt],
        schema,
        cached_prompt,
        tools,
        tool_args,
        confirm: config.confirm.max(1),
        out_of: config.out_of.max(1),
    };

    let task_id = args.task_id.clone();
    let store = args.store.clone();
    let response = args
        .session
        .prompt_with(request, move |chat_id| {
            let result = store.transaction(|txn| {
                let mut task = txn.find_task(&task_id)?.ok_or(StoreError::NotFound)?;
                task.add_chat_id(chat_id.as_str());
                txn.update_task(&task)
            });
            if let Err(err) = result {
                warn!(error = %err, "failed to record chat id on task");
            }
        })
        .await?;
    Ok(response)
}

fn apply_response(args: &StepArgs, response: kiln_session::ChatResponse) -> Result<StepOutcome, EngineError> {
    match response {
        kiln_session::ChatResponse::Success { data } => {
            if let Value::Object(map) = data {
                args.update_record(map)?;
            }
            Ok(StepOutcome::Continue)
        }
        kiln_session::ChatResponse::Error { message, .. } => Err(EngineError::Step(message)),
    }
}

/// A declared sequence of steps plus failure callbacks, run against one
/// task at a time.
#[derive(Default)]
pub struct PipelineFamily {
    steps: Vec<Step>,
    on_failure: Vec<FailureHook>,
}

impl PipelineFamily {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a plain step: arbitrary async code with access to `StepArgs`.
    pub fn step<F, Fut>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(StepArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<StepOutcome, EngineError>> + Send + 'static,
    {
        self.steps.push(Step {
            name: name.into(),
            body: Arc::new(move |args| -> BoxFuture<'static, Result<StepOutcome, EngineError>> { Box::pin(body(args)) }),
        });
        self
    }

    /// Declare an `agent_step`: its prompt resolves through the translator
    /// under `<name>.prompt`; success merges the reply into the bound
    /// record, a model-declared error fails the task.
    pub fn agent_step(mut self, name: impl Into<String>, config: AgentStepConfig) -> Self {
        let name = name.into();
        let key = name.clone();
        self.steps.push(Step {
            name,
            body: Arc::new(move |args| -> BoxFuture<'static, Result<StepOutcome, EngineError>> {
                let key = key.clone();
                let config = config.clone();
                Box::pin(async move {
                    let response = run_agent_prompt(&args, &key, &config, I18nAttrs::new()).await?;
                    apply_response(&args, response)
                })
            }),
        });
        self
    }

    /// Declare an `agent_review_loop`: `implement` prompts run once,
    /// `iterate` prompts run on every retry (defaulting to `implement`
    /// when empty), then `review` prompts judge the diff against a fixed
    /// `{approved, feedback}` schema until all approve or `max_tries` is
    /// spent.
    pub fn agent_review_loop(
        mut self,
        name: impl Into<String>,
        max_tries: u32,
        implement: Vec<AgentPromptSpec>,
        iterate: Vec<AgentPromptSpec>,
        review: Vec<AgentPromptSpec>,
    ) -> Result<Self, EngineError> {
        let name = name.into();
        if implement.is_empty() && iterate.is_empty() {
            return Err(EngineError::EmptyReviewLoop(name));
        }
        let iterate = if iterate.is_empty() { implement.clone() } else { iterate };

        self.steps.push(Step {
            name,
            body: Arc::new(move |args| -> BoxFuture<'static, Result<StepOutcome, EngineError>> {
                let implement = implement.clone();
                let iterate = iterate.clone();
                let review = review.clone();
                Box::pin(run_review_loop(args, max_tries, implement, iterate, review))
            }),
        });
        Ok(self)
    }

    /// Register a callback run, in declaration order, when the task is
    /// marked failed.
    pub fn on_failure<F>(mut self, hook: F) -> Self
    where
        F: Fn(StepArgs) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        self.on_failure.push(Arc::new(hook));
        self
    }

    /// Run the declared steps against `task_id` until it is no longer
    /// pending. Every iteration commits its bookkeeping in its own
    /// transaction, so a crash between iterations resumes at the next
    /// undone step.
    pub async fn run(&self, task_id: &TaskId, args: &StepArgs) -> Result<(), EngineError> {
        info!(task_id = task_id.short(8), "start");
        loop {
            let task = args
                .store
                .transaction(|txn| txn.find_task(task_id))?
                .ok_or_else(|| EngineError::TaskNotFound(task_id.as_str().to_string()))?;
            if !task.is_pending() {
                break;
            }
            let Some(step) = self.steps.iter().find(|s| !task.completed_steps.contains(&s.name)) else {
                break;
            };

            match (step.body)(args.clone()).await {
                Ok(outcome) => self.commit_step(args, task_id, &step.name, outcome)?,
                Err(err) => {
                    self.commit_failure(args, task_id, &err.to_string())?;
                    self.run_failure_hooks(args)?;
                    // AbortCostExceeded is the one step error not absorbed here:
                    // it re-raises past the task-failed commit above.
                    if matches!(err, EngineError::Session(SessionError::AbortCostExceeded(_))) {
                        return Err(err);
                    }
                    break;
                }
            }
        }
        self.finish(args, task_id)
    }

    fn commit_step(&self, args: &StepArgs, task_id: &TaskId, step_name: &str, outcome: StepOutcome) -> Result<(), EngineError> {
        let mut task = args
            .store
            .transaction(|txn| txn.find_task(task_id))?
            .ok_or_else(|| EngineError::TaskNotFound(task_id.as_str().to_string()))?;
        let now = args.clock.unix_seconds();
        match outcome {
            StepOutcome::Continue => task.complete_step(step_name, now),
            StepOutcome::Rewind(target) => task.rewind_to(&target)?,
        }
        args.store.transaction(|txn| txn.update_task(&task))?;
        Ok(())
    }

    fn commit_failure(&self, args: &StepArgs, task_id: &TaskId, message: &str) -> Result<(), EngineError> {
        let mut task = args
            .store
            .transaction(|txn| txn.find_task(task_id))?
            .ok_or_else(|| EngineError::TaskNotFound(task_id.as_str().to_string()))?;
        task.fail(message, args.clock.unix_seconds());
        args.store.transaction(|txn| txn.update_task(&task))?;
        Ok(())
    }

    fn run_failure_hooks(&self, args: &StepArgs) -> Result<(), EngineError> {
        for hook in &self.on_failure {
            hook(args.clone())?;
        }
        Ok(())
    }

    fn finish(&self, args: &StepArgs, task_id: &TaskId) -> Result<(), EngineError> {
        let mut task = args
            .store
            .transaction(|txn| txn.find_task(task_id))?
            .ok_or_else(|| EngineError::TaskNotFound(task_id.as_str().to_string()))?;
        if !task.is_failed() {
            task.mark_done(args.clock.unix_seconds());
            args.store.transaction(|txn| txn.update_task(&task))?;
        }
        Ok(())
    }
}

async fn run_review_loop(
    args: StepArgs,
    max_tries: u32,
    implement: Vec<AgentPromptSpec>,
    iterate: Vec<AgentPromptSpec>,
    review: Vec<AgentPromptSpec>,
) -> Result<StepOutcome, EngineError> {
    let mut tries = 0u32;
    let mut feedbacks: Vec<String> = Vec::new();

    while tries < max_tries {
        let prompts = if tries == 0 { &implement } else { &iterate };
        for spec in prompts {
            let mut attrs = I18nAttrs::new();
            attrs.insert("feedback".to_string(), Value::String(feedbacks.join("\n---\n")));
            let response = run_agent_prompt(&args, &spec.key, &spec.config, attrs).await?;
            apply_response(&args, response)?;
        }
        tries += 1;
        feedbacks.clear();

        let diff = args.git.diff().await?;
        for spec in &review {
            let mut attrs = I18nAttrs::new();
            attrs.insert("diff".to_string(), Value::String(diff.clone()));
            let mut config = spec.config.clone();
            config.schema = Some(review_schema());
            let response = run_agent_prompt(&args, &spec.key, &config, attrs).await?;
            match response {
                kiln_session::ChatResponse::Success { data } => {
                    let approved = data.get("approved").and_then(Value::as_bool).unwrap_or(false);
                    if !approved {
                        let feedback = data.get("feedback").and_then(Value::as_str).unwrap_or_default().to_string();
                        feedbacks.push(feedback);
                    }
                }
                kiln_session::ChatResponse::Error { message, .. } => return Err(EngineError::Step(message)),
            }
        }

        run_add_review_behavior(&args, &diff, &feedbacks)?;

        if feedbacks.is_empty() {
            break;
        }
    }
    Ok(StepOutcome::Continue)
}

/// If the bound record's schema registered an `add_review` behavior, run it
/// with this round's diff and outstanding feedback and merge its column
/// updates back onto the record. A no-op if the task has no bound record or
/// its schema registered no such behavior.
fn run_add_review_behavior(args: &StepArgs, diff: &str, feedbacks: &[String]) -> Result<(), EngineError> {
    let Some(record_type) = args.record_type()? else {
        return Ok(());
    };
    let Some(def) = args.store.record_def(&record_type) else {
        return Ok(());
    };
    if !def.responds_to_add_review() {
        return Ok(());
    }
    let Some(record) = args.record()? else {
        return Ok(());
    };
    let updates = def.run_add_review(record, diff, feedbacks);
    if updates.is_empty() {
        return Ok(());
    }
    args.update_record_columns(updates.into_iter().collect())
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
