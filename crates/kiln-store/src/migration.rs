// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! User migrations, run once per `version` and recorded in
//! `schema_migrations`. Schema-derived ("table_<name>") migrations are
//! synthesized from [`crate::schema::RecordDef`]s and prepended so that
//! declared tables exist before any user migration runs.

use rusqlite::Connection;
use std::fmt;
use std::sync::Arc;

/// A single idempotent migration, applied exactly once by `version`.
#[derive(Clone)]
pub struct Migration {
    pub version: String,
    up: Arc<dyn Fn(&Connection) -> rusqlite::Result<()> + Send + Sync>,
}

impl fmt::Debug for Migration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration").field("version", &self.version).finish()
    }
}

impl Migration {
    /// Declare a migration keyed by an explicit integer version.
    pub fn new(version: i64, up: impl Fn(&Connection) -> rusqlite::Result<()> + Send + Sync + 'static) -> Self {
        Self {
            version: version.to_string(),
            up: Arc::new(up),
        }
    }

    /// Declare a migration keyed by an arbitrary string version (used
    /// internally for schema-derived `table_<name>` migrations).
    pub fn named(
        version: impl Into<String>,
        up: impl Fn(&Connection) -> rusqlite::Result<()> + Send + Sync + 'static,
    ) -> Self {
        Self {
            version: version.into(),
            up: Arc::new(up),
        }
    }

    pub(crate) fn run(&self, conn: &Connection) -> rusqlite::Result<()> {
        (self.up)(conn)
    }
}

#[cfg(test)]
#[path = "migration_tests.rs"]
mod tests;
