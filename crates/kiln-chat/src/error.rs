// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the structured-prompt gateway.

use kiln_adapters::ChatBackendError;
use thiserror::Error;

/// Errors raised by [`crate::Chat`].
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("backend error: {0}")]
    Backend(#[from] ChatBackendError),

    #[error("invalid response after {attempts} attempts: {last_error}")]
    InvalidResponse { attempts: u32, last_error: String },

    #[error("no consensus after {out_of} attempts (needed {confirm} matching)")]
    NoConfirmation { confirm: u32, out_of: u32 },

    #[error("schema compilation failed: {0}")]
    InvalidSchema(String),
}
