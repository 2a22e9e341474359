// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the pipeline runtime and the processor.

use thiserror::Error;

/// Errors raised while running a pipeline family against a task.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] kiln_store::StoreError),

    #[error("session error: {0}")]
    Session(#[from] kiln_session::SessionError),

    #[error("git error: {0}")]
    Git(#[from] kiln_adapters::GitError),

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("no declared step named '{0}'")]
    UnknownStep(String),

    #[error("missing translation for key '{0}'")]
    MissingTranslation(String),

    #[error("agent_review_loop '{0}' requires at least one of implement or iterate")]
    EmptyReviewLoop(String),

    #[error("{0}")]
    RewindFailed(#[from] kiln_core::task::RewindError),

    #[error("{0}")]
    Step(String),
}

/// Errors raised by the [`crate::processor::Processor`].
#[derive(Debug, Error)]
pub enum ProcessorError {
    #[error("processor requires at least one workspace")]
    NoWorkspaces,

    #[error("unknown handler '{0}'")]
    UnknownHandler(String),

    #[error("handler left task '{0}' pending")]
    TaskPending(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Store(#[from] kiln_store::StoreError),
}
