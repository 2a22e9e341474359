// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outcome of a [`crate::Session::prompt`] call.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of one `session.prompt(...)` call. Schema/consensus failures and
/// model-declared "unable to fulfill" replies both surface as `Error` here
/// rather than as a propagated exception — only [`crate::AbortCostExceeded`]
/// propagates past this boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChatResponse {
    Success { data: Value },
    Error {
        class_name: String,
        message: String,
        backtrace: String,
    },
}

impl ChatResponse {
    pub fn success(data: Value) -> Self {
        ChatResponse::Success { data }
    }

    pub fn error(class_name: impl Into<String>, message: impl Into<String>) -> Self {
        ChatResponse::Error {
            class_name: class_name.into(),
            message: message.into(),
            backtrace: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ChatResponse::Success { .. })
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            ChatResponse::Success { data } => Some(data),
            ChatResponse::Error { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ChatResponse::Error { message, .. } => Some(message),
            ChatResponse::Success { .. } => None,
        }
    }
}
