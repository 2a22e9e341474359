// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the store layer.

use thiserror::Error;

/// Errors that can occur while opening, querying, or mutating a store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("migration {version} failed: {reason}")]
    MigrationFailed { version: String, reason: String },

    #[error("write rejected: store is read-only (pinned to a version or snapshot)")]
    ReadOnly,

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("snapshot/restore operations are only valid from the root store")]
    NotRoot,

    #[error("this store is not a version snapshot")]
    NotAVersion,

    #[error("named snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("record not found")]
    NotFound,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
