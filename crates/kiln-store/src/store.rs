// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The versioned relational record store.
//!
//! A root [`Store`] owns the live SQLite database and, when `versioned` is
//! set, writes an automatic snapshot after every committed top-level
//! transaction. [`Store::versions`] and [`Store::snapshot`]/`restore` give
//! read-only time-travel and named checkpoints over the same file layout.

use crate::builtin::ensure_builtin_tables;
use crate::error::StoreError;
use crate::migration::Migration;
use crate::schema::RecordDef;
use crate::txn::StoreTxn;
use parking_lot::ReentrantMutex;
use rusqlite::{Connection, OpenFlags};
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

/// Process-wide lock serializing the `{commit -> copy-file}` sequence so
/// every version snapshot reflects an actually committed state, even when
/// multiple `Store` handles (e.g. one per workspace slot) share a database.
fn snapshot_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

/// Configuration for opening a root store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub dir: PathBuf,
    pub db_filename: String,
    pub versioned: bool,
}

impl StoreConfig {
    pub fn new(dir: impl Into<PathBuf>, db_filename: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            db_filename: db_filename.into(),
            versioned: true,
        }
    }

    pub fn versioned(mut self, versioned: bool) -> Self {
        self.versioned = versioned;
        self
    }

    pub(crate) fn live_path(&self) -> PathBuf {
        self.dir.join(&self.db_filename)
    }

    pub(crate) fn stem(&self) -> &str {
        Path::new(&self.db_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.db_filename)
    }

    pub(crate) fn versions_dir(&self) -> PathBuf {
        self.dir.join(format!("{}_versions", self.stem()))
    }

    pub(crate) fn snapshots_dir(&self) -> PathBuf {
        self.dir.join(format!("{}_snapshots", self.stem()))
    }
}

/// Whether a store is the writable root or a read-only pinned view over a
/// version/snapshot file.
#[derive(Debug, Clone)]
pub(crate) enum StoreMode {
    Live,
    Pinned(PathBuf),
}

struct ConnState {
    conn: Connection,
    depth: u32,
}

pub(crate) struct StoreInner {
    pub(crate) config: StoreConfig,
    pub(crate) mode: StoreMode,
    conn_state: ReentrantMutex<RefCell<ConnState>>,
    records: HashMap<String, RecordDef>,
}

/// A handle to a versioned relational record store.
#[derive(Clone)]
pub struct Store {
    pub(crate) inner: std::sync::Arc<StoreInner>,
}

fn open_connection(path: &Path, readonly: bool) -> Result<Connection, StoreError> {
    let conn = if readonly {
        Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?
    } else {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Connection::open(path)?
    };
    // DELETE journal mode (no -wal/-shm sidecars) is required so a plain
    // file copy of the live database is always a consistent snapshot.
    conn.execute_batch("PRAGMA journal_mode=DELETE; PRAGMA locking_mode=NORMAL;")?;
    Ok(conn)
}

impl Store {
    /// Open (creating if absent) the root store at `config.dir`, applying
    /// schema-derived migrations for `records` (prepended) followed by
    /// `migrations`, in order, exactly once each.
    pub fn open(
        config: StoreConfig,
        records: Vec<RecordDef>,
        migrations: Vec<Migration>,
    ) -> Result<Self, StoreError> {
        let conn = open_connection(&config.live_path(), false)?;
        let record_defs: HashMap<String, RecordDef> = records.iter().map(|def| (def.name.clone(), def.clone())).collect();
        let store = Store {
            inner: std::sync::Arc::new(StoreInner {
                config,
                mode: StoreMode::Live,
                conn_state: ReentrantMutex::new(RefCell::new(ConnState { conn, depth: 0 })),
                records: record_defs,
            }),
        };
        store.run_migrations(records, migrations)?;
        Ok(store)
    }

    fn run_migrations(&self, records: Vec<RecordDef>, migrations: Vec<Migration>) -> Result<(), StoreError> {
        let guard = self.inner.conn_state.lock();
        let state = guard.borrow();
        state.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_migrations (version TEXT NOT NULL UNIQUE)",
        )?;
        ensure_builtin_tables(&state.conn)?;
        drop(state);

        let mut all = Vec::with_capacity(records.len() + migrations.len());
        for def in &records {
            let sql = def.create_table_sql();
            let version = def.migration_version();
            all.push(Migration::named(version, move |conn| conn.execute_batch(&sql)));
        }
        all.extend(migrations);

        for migration in all {
            let state = guard.borrow();
            let already_applied: bool = state
                .conn
                .query_row(
                    "SELECT COUNT(*) FROM schema_migrations WHERE version = ?1",
                    [&migration.version],
                    |row| row.get::<_, i64>(0),
                )
                .map(|n| n > 0)?;
            if already_applied {
                continue;
            }
            migration.run(&state.conn).map_err(|e| StoreError::MigrationFailed {
                version: migration.version.clone(),
                reason: e.to_string(),
            })?;
            state.conn.execute(
                "INSERT INTO schema_migrations (version) VALUES (?1)",
                [&migration.version],
            )?;
        }
        Ok(())
    }

    /// Open a read-only pinned view over an arbitrary database file (used
    /// internally by [`Store::versions`] and to re-open a restored root).
    fn open_pinned(config: StoreConfig, path: PathBuf, records: HashMap<String, RecordDef>) -> Result<Self, StoreError> {
        let conn = open_connection(&path, true)?;
        Ok(Store {
            inner: std::sync::Arc::new(StoreInner {
                config,
                mode: StoreMode::Pinned(path),
                conn_state: ReentrantMutex::new(RefCell::new(ConnState { conn, depth: 0 })),
                records,
            }),
        })
    }

    pub fn is_readonly(&self) -> bool {
        matches!(self.inner.mode, StoreMode::Pinned(_))
    }

    /// The schema declaration registered for `record_type` at [`Store::open`],
    /// if any; used to resolve record behaviors such as `add_review`.
    pub fn record_def(&self, record_type: &str) -> Option<RecordDef> {
        self.inner.records.get(record_type).cloned()
    }

    fn is_root(&self) -> bool {
        matches!(self.inner.mode, StoreMode::Live)
    }

    /// Run `f` inside an atomic transaction. Nested calls (from within `f`,
    /// on the same thread) join the outer transaction and do not trigger
    /// their own commit or snapshot.
    pub fn transaction<T>(
        &self,
        f: impl FnOnce(&StoreTxn<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let guard = self.inner.conn_state.lock();
        let is_outer = {
            let mut state = guard.borrow_mut();
            let outer = state.depth == 0;
            if outer {
                state.conn.execute_batch("BEGIN IMMEDIATE")?;
            }
            state.depth += 1;
            outer
        };

        let txn = StoreTxn::new(self);
        let result = f(&txn);

        {
            let mut state = guard.borrow_mut();
            state.depth -= 1;
        }

        if is_outer {
            let state = guard.borrow();
            match &result {
                Ok(_) => state.conn.execute_batch("COMMIT")?,
                Err(_) => {
                    // Best-effort: rollback failure shouldn't mask the real error.
                    let _ = state.conn.execute_batch("ROLLBACK");
                }
            }
            drop(state);
            drop(guard);
            if result.is_ok() && self.inner.config.versioned && self.is_root() {
                self.write_version_snapshot()?;
            }
        }

        result
    }

    pub(crate) fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let guard = self.inner.conn_state.lock();
        let state = guard.borrow();
        f(&state.conn)
    }

    fn write_version_snapshot(&self) -> Result<(), StoreError> {
        let _process_guard = snapshot_lock().lock().unwrap_or_else(|p| p.into_inner());
        let versions_dir = self.inner.config.versions_dir();
        fs::create_dir_all(&versions_dir)?;
        let name = next_version_filename(&versions_dir);
        let dest = versions_dir.join(name);
        fs::copy(self.inner.config.live_path(), &dest)?;
        Ok(())
    }

    /// Snapshots in chronological order, each a read-only pinned [`Store`].
    pub fn versions(&self) -> Result<Vec<Store>, StoreError> {
        if !self.is_root() {
            return Err(StoreError::NotRoot);
        }
        let dir = self.inner.config.versions_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "sqlite3").unwrap_or(false))
            .collect();
        entries.sort();
        entries
            .into_iter()
            .map(|path| Store::open_pinned(self.inner.config.clone(), path, self.inner.records.clone()))
            .collect()
    }

    /// Copy the live database to a named snapshot file.
    pub fn snapshot(&self, label: &str) -> Result<(), StoreError> {
        if !self.is_root() {
            return Err(StoreError::NotRoot);
        }
        let dir = self.inner.config.snapshots_dir();
        fs::create_dir_all(&dir)?;
        fs::copy(self.inner.config.live_path(), dir.join(format!("{label}.sqlite3")))?;
        Ok(())
    }

    /// Overwrite the live database with a named snapshot and append a new
    /// version reflecting the restore.
    pub fn restore(&self, label: &str) -> Result<(), StoreError> {
        if !self.is_root() {
            return Err(StoreError::NotRoot);
        }
        let src = self.inner.config.snapshots_dir().join(format!("{label}.sqlite3"));
        if !src.exists() {
            return Err(StoreError::SnapshotNotFound(label.to_string()));
        }
        self.overwrite_live_from(&src)?;
        self.write_version_snapshot()
    }

    /// Called on a version [`Store`] (see [`Store::versions`]): overwrite the
    /// live database with this version's file, delete every later version,
    /// append a new version reflecting the restore, and return a fresh root
    /// handle.
    pub fn restore_from_version(&self) -> Result<Store, StoreError> {
        let StoreMode::Pinned(version_path) = &self.inner.mode else {
            return Err(StoreError::NotAVersion);
        };
        let versions_dir = self.inner.config.versions_dir();
        if version_path.parent() != Some(versions_dir.as_path()) {
            return Err(StoreError::NotAVersion);
        }

        self.overwrite_live_from(version_path)?;

        let mut entries: Vec<PathBuf> = fs::read_dir(&versions_dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|e| e == "sqlite3").unwrap_or(false))
            .collect();
        entries.sort();
        for path in entries.into_iter().filter(|p| p > version_path) {
            fs::remove_file(path)?;
        }

        let fresh = Store {
            inner: std::sync::Arc::new(StoreInner {
                config: self.inner.config.clone(),
                mode: StoreMode::Live,
                conn_state: ReentrantMutex::new(RefCell::new(ConnState {
                    conn: open_connection(&self.inner.config.live_path(), false)?,
                    depth: 0,
                })),
                records: self.inner.records.clone(),
            }),
        };
        fresh.write_version_snapshot()?;
        Ok(fresh)
    }

    fn overwrite_live_from(&self, src: &Path) -> Result<(), StoreError> {
        // The live connection must be closed for the duration of the file
        // swap since SQLite keeps OS-level file handles open.
        let guard = self.inner.conn_state.lock();
        let mut state = guard.borrow_mut();
        let placeholder = open_connection_in_memory()?;
        let old = std::mem::replace(&mut state.conn, placeholder);
        drop(old);
        fs::copy(src, self.inner.config.live_path())?;
        state.conn = open_connection(&self.inner.config.live_path(), false)?;
        Ok(())
    }
}

fn open_connection_in_memory() -> Result<Connection, StoreError> {
    Ok(Connection::open_in_memory()?)
}

fn next_version_filename(versions_dir: &Path) -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    loop {
        let bump = SEQ.fetch_add(1, Ordering::SeqCst);
        let candidate = format!("{:020}.sqlite3", nanos + bump as u128);
        if !versions_dir.join(&candidate).exists() {
            return candidate;
        }
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
