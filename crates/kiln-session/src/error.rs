// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the session layer.

use thiserror::Error;

/// Raised when the cost oracle reports that a spend limit has been
/// exceeded. Propagates out of the gateway and up through the pipeline
/// runtime; it is never caught and converted into a [`crate::ChatResponse`].
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Abort: {cost_type} cost ${current_cost:.2} exceeds threshold ${threshold:.2}")]
pub struct AbortCostExceeded {
    pub cost_type: String,
    pub current_cost: f64,
    pub threshold: f64,
}

/// Errors raised synchronously by the session layer, never attached to a
/// task: configuration mistakes and spend aborts.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown tool '{name}', available tools: {available}")]
    UnknownTool { name: String, available: String },

    #[error(transparent)]
    AbortCostExceeded(#[from] AbortCostExceeded),

    #[error("store error: {0}")]
    Store(#[from] kiln_store::StoreError),
}
