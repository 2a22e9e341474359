// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The chat backend boundary: the narrow surface a vendor LLM client
//! adapter must implement for the gateway in `kiln-chat` to drive it.

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use kiln_core::{ChatId, Message, ToolCall};
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by a chat backend implementation.
#[derive(Debug, Error)]
pub enum ChatBackendError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// A tool made available to the model for one or more turns.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

pub type MessageHook = Arc<dyn Fn(&Message) + Send + Sync>;
pub type ToolCallHook = Arc<dyn Fn(&ToolCall) + Send + Sync>;

/// The minimal surface a vendor chat client adapter must expose. The
/// gateway (`kiln_chat::Chat`) is the only caller; it never reaches past
/// this trait into vendor-specific types.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    fn id(&self) -> &ChatId;

    /// Send `prompt` as a user turn and return the assistant's reply.
    async fn ask(&self, prompt: &str) -> Result<Message, ChatBackendError>;

    /// Replace the tool set available for subsequent turns.
    fn with_tools(&self, tools: Vec<ToolSpec>);

    /// Every message appended to the conversation buffer so far.
    fn messages(&self) -> Vec<Message>;

    fn on_new_message(&self, hook: MessageHook);
    fn on_end_message(&self, hook: MessageHook);
    fn on_tool_call(&self, hook: ToolCallHook);
    fn on_tool_result(&self, hook: ToolCallHook);
}
