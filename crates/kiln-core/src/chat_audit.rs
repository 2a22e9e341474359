// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent audit records of LLM interactions.
//!
//! These are written by the chat gateway and session layer and consumed by
//! the cost oracle; the pipeline runtime never mutates them directly.

use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct ChatId;
}

crate::define_id! {
    pub struct MessageId;
}

crate::define_id! {
    pub struct ModelId;
}

crate::define_id! {
    pub struct ToolCallId;
}

/// Role of a message within a chat's conversation buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A named model backing a chat, used by the cost oracle to price usage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub name: String,
}

/// One conversation between a session and the LLM transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub project: String,
    pub run_id: String,
    pub model_id: Option<ModelId>,
    pub created_at: i64,
}

/// A single turn recorded in a chat's transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub chat_id: ChatId,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_raw: Option<serde_json::Value>,
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cached_tokens: u64,
    #[serde(default)]
    pub cache_creation_tokens: u64,
    pub created_at: i64,
}

impl Message {
    pub fn new(id: MessageId, chat_id: ChatId, role: Role, content: impl Into<String>, now: i64) -> Self {
        Self {
            id,
            chat_id,
            role,
            content: content.into(),
            content_raw: None,
            input_tokens: 0,
            output_tokens: 0,
            cached_tokens: 0,
            cache_creation_tokens: 0,
            created_at: now,
        }
    }
}

/// A tool invocation requested by the model during a message turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: ToolCallId,
    pub message_id: MessageId,
    pub tool_call_id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[cfg(test)]
#[path = "chat_audit_tests.rs"]
mod tests;
