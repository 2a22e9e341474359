// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The structured-prompt gateway: wraps a [`ChatBackend`] with schema
//! validation, retry-on-malformed-output, N-of-M confirmation, and
//! iterative self-refinement.

use crate::error::ChatError;
use jsonschema::JSONSchema;
use kiln_adapters::ChatBackend;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

const MAX_ATTEMPTS: u32 = 5;
const JSON_ONLY_INSTRUCTION: &str =
    "Reply with a single JSON object only. Do not include any explanatory text before or after the JSON.";
const JSON_FENCE_OPEN: &str = "```json";
const FENCE_CLOSE: &str = "```";

/// A structured-output wrapper over a [`ChatBackend`].
pub struct Chat {
    backend: Arc<dyn ChatBackend>,
}

impl Chat {
    pub fn new(backend: Arc<dyn ChatBackend>) -> Self {
        Self { backend }
    }

    pub fn id(&self) -> &kiln_core::ChatId {
        self.backend.id()
    }

    /// Pass-through to the backend's `ask`.
    pub async fn ask(&self, prompt: &str) -> Result<kiln_core::Message, ChatError> {
        self.backend.ask(prompt).await.map_err(ChatError::from)
    }

    /// Primary structured-output operation: ask up to 5 times per answer,
    /// validating against `schema` if given, and require `confirm` of
    /// `out_of` independent answers to agree before returning.
    pub async fn get(
        &self,
        prompt: &str,
        schema: Option<&Value>,
        confirm: u32,
        out_of: u32,
    ) -> Result<Value, ChatError> {
        let compiled = match schema {
            Some(s) => Some(JSONSchema::compile(s).map_err(|e| ChatError::InvalidSchema(e.to_string()))?),
            None => None,
        };

        let mut answers: Vec<Value> = Vec::new();
        for _ in 0..out_of {
            let answer = self.single_answer(prompt, schema, compiled.as_ref()).await?;
            let matches = answers.iter().filter(|a| **a == answer).count() as u32 + 1;
            answers.push(answer.clone());
            if matches >= confirm {
                return Ok(answer);
            }
        }

        Err(ChatError::NoConfirmation { confirm, out_of })
    }

    /// Iterative self-critique: call `get` `times` times, each subsequent
    /// call reframed around the previous answer, returning the last one.
    pub async fn refine(&self, prompt: &str, schema: Option<&Value>, times: u32) -> Result<Value, ChatError> {
        let mut last = self.get(prompt, schema, 1, 1).await?;
        for _ in 1..times {
            let reframed = format!(
                "Here is your previous answer:\n{}\n\nImprove it.\n\n{}",
                serde_json::to_string_pretty(&last).unwrap_or_default(),
                prompt
            );
            last = self.get(&reframed, schema, 1, 1).await?;
        }
        Ok(last)
    }

    async fn single_answer(
        &self,
        prompt: &str,
        schema: Option<&Value>,
        compiled: Option<&JSONSchema>,
    ) -> Result<Value, ChatError> {
        let wrapper = build_wrapper_message(prompt, schema);
        let mut message = wrapper;
        let mut last_error = String::new();

        for attempt in 0..MAX_ATTEMPTS {
            let reply = self.backend.ask(&message).await?;
            let stripped = strip_fence(&reply.content);

            let parsed: Value = match serde_json::from_str(stripped) {
                Ok(value) => value,
                Err(err) => {
                    last_error = err.to_string();
                    warn!(attempt, error = %last_error, "chat reply was not valid JSON, retrying");
                    message = format!(
                        "Your last reply was not valid JSON ({last_error}). Reply with valid JSON only."
                    );
                    continue;
                }
            };

            if let Some(compiled) = compiled {
                if let Err(errors) = compiled.validate(&parsed) {
                    let messages: Vec<String> = errors.map(|e| e.to_string()).collect();
                    last_error = messages.join("; ");
                    warn!(attempt, error = %last_error, "chat reply failed schema validation, retrying");
                    message = format!(
                        "Your last reply did not match the required schema: {last_error}. Reply with valid JSON only."
                    );
                    continue;
                }
            }

            return Ok(parsed);
        }

        Err(ChatError::InvalidResponse {
            attempts: MAX_ATTEMPTS,
            last_error,
        })
    }
}

fn build_wrapper_message(prompt: &str, schema: Option<&Value>) -> String {
    let mut parts = vec![JSON_ONLY_INSTRUCTION.to_string()];
    if let Some(schema) = schema {
        parts.push(format!(
            "JSON schema:\n{}",
            serde_json::to_string_pretty(schema).unwrap_or_default()
        ));
    }
    parts.push(prompt.to_string());
    parts.join("\n\n")
}

/// Strip exactly one leading ` ```json ` fence and one trailing ` ``` `, per
/// the documented (and intentionally not more lenient) fence-handling rule.
fn strip_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix(JSON_FENCE_OPEN) else {
        return trimmed;
    };
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    rest.strip_suffix(FENCE_CLOSE).map(str::trim_end).unwrap_or(rest)
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
