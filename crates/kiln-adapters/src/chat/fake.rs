// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake chat backend for deterministic testing.
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{ChatBackend, ChatBackendError, MessageHook, ToolCallHook, ToolSpec};
use async_trait::async_trait;
use kiln_core::{Clock, ChatId, IdGen, Message, MessageId, Role, SystemClock, UuidIdGen};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

/// Recorded call to a [`FakeChatBackend`].
#[derive(Debug, Clone)]
pub enum ChatBackendCall {
    Ask { prompt: String },
    WithTools { names: Vec<String> },
}

enum ScriptedReply {
    Content(String),
    Error(ChatBackendError),
}

struct State {
    messages: Vec<Message>,
    tools: Vec<ToolSpec>,
    calls: Vec<ChatBackendCall>,
    scripted: VecDeque<ScriptedReply>,
    default_reply: Option<String>,
    on_new_message: Vec<MessageHook>,
    on_end_message: Vec<MessageHook>,
    on_tool_call: Vec<ToolCallHook>,
    on_tool_result: Vec<ToolCallHook>,
}

/// A scriptable, call-recording [`ChatBackend`], mirroring the recorded-call
/// shape of a vendor fake adapter without any network dependency.
#[derive(Clone)]
pub struct FakeChatBackend {
    id: ChatId,
    id_gen: Arc<dyn IdGen>,
    clock: Arc<dyn Clock>,
    inner: Arc<Mutex<State>>,
}

impl FakeChatBackend {
    pub fn new(id: ChatId) -> Self {
        Self::with_id_gen(id, Arc::new(UuidIdGen))
    }

    pub fn with_id_gen(id: ChatId, id_gen: Arc<dyn IdGen>) -> Self {
        Self {
            id,
            id_gen,
            clock: Arc::new(SystemClock::new()),
            inner: Arc::new(Mutex::new(State {
                messages: Vec::new(),
                tools: Vec::new(),
                calls: Vec::new(),
                scripted: VecDeque::new(),
                default_reply: None,
                on_new_message: Vec::new(),
                on_end_message: Vec::new(),
                on_tool_call: Vec::new(),
                on_tool_result: Vec::new(),
            })),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Queue one successful reply, returned in FIFO order by `ask`.
    pub fn push_reply(&self, content: impl Into<String>) {
        self.inner.lock().scripted.push_back(ScriptedReply::Content(content.into()));
    }

    /// Queue one failing reply.
    pub fn push_error(&self, error: ChatBackendError) {
        self.inner.lock().scripted.push_back(ScriptedReply::Error(error));
    }

    /// Reply used once the scripted queue is exhausted; without this, `ask`
    /// past the last scripted reply panics, surfacing test setup bugs loudly.
    pub fn set_default_reply(&self, content: impl Into<String>) {
        self.inner.lock().default_reply = Some(content.into());
    }

    pub fn calls(&self) -> Vec<ChatBackendCall> {
        self.inner.lock().calls.clone()
    }

    pub fn ask_count(&self) -> usize {
        self.inner
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, ChatBackendCall::Ask { .. }))
            .count()
    }
}

#[async_trait]
impl ChatBackend for FakeChatBackend {
    fn id(&self) -> &ChatId {
        &self.id
    }

    async fn ask(&self, prompt: &str) -> Result<Message, ChatBackendError> {
        let now = self.clock.unix_seconds();
        let user_message = Message::new(
            MessageId::new(self.id_gen.next()),
            self.id.clone(),
            Role::User,
            prompt,
            now,
        );

        let reply = {
            let mut state = self.inner.lock();
            state.calls.push(ChatBackendCall::Ask { prompt: prompt.to_string() });
            state.messages.push(user_message.clone());
            match state.scripted.pop_front() {
                Some(reply) => reply,
                None => match &state.default_reply {
                    Some(content) => ScriptedReply::Content(content.clone()),
                    None => ScriptedReply::Error(ChatBackendError::Transport(
                        "FakeChatBackend::ask called with no scripted reply queued".to_string(),
                    )),
                },
            }
        };

        for hook in self.inner.lock().on_new_message.clone() {
            hook(&user_message);
        }

        match reply {
            ScriptedReply::Error(err) => Err(err),
            ScriptedReply::Content(content) => {
                let assistant_message =
                    Message::new(MessageId::new(self.id_gen.next()), self.id.clone(), Role::Assistant, content, now);
                {
                    let mut state = self.inner.lock();
                    state.messages.push(assistant_message.clone());
                }
                for hook in self.inner.lock().on_new_message.clone() {
                    hook(&assistant_message);
                }
                for hook in self.inner.lock().on_end_message.clone() {
                    hook(&assistant_message);
                }
                Ok(assistant_message)
            }
        }
    }

    fn with_tools(&self, tools: Vec<ToolSpec>) {
        let mut state = self.inner.lock();
        state
            .calls
            .push(ChatBackendCall::WithTools { names: tools.iter().map(|t| t.name.clone()).collect() });
        state.tools = tools;
    }

    fn messages(&self) -> Vec<Message> {
        self.inner.lock().messages.clone()
    }

    fn on_new_message(&self, hook: MessageHook) {
        self.inner.lock().on_new_message.push(hook);
    }

    fn on_end_message(&self, hook: MessageHook) {
        self.inner.lock().on_end_message.push(hook);
    }

    fn on_tool_call(&self, hook: ToolCallHook) {
        self.inner.lock().on_tool_call.push(hook);
    }

    fn on_tool_result(&self, hook: ToolCallHook) {
        self.inner.lock().on_tool_result.push(hook);
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
