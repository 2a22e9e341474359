// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Errors raised assembling or running a [`crate::batch::Batch`].

use kiln_adapters::GitError;
use kiln_engine::{EngineError, ProcessorError};
use kiln_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Processor(#[from] ProcessorError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Git(#[from] GitError),
}
