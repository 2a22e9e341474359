// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record schema declarations for domain tables.
//!
//! A [`RecordDef`] is the Rust stand-in for the source's runtime-assembled
//! record class: the schema a record contributes (its columns) plus its
//! table name. Multiple `RecordDef`s for the same name are additive —
//! callers union them with [`RecordDef::merge`] before passing the result
//! to [`crate::Store::open`].

use crate::record_table::Record;
use indexmap::IndexMap;
use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::ToSql;
use std::sync::Arc;

/// SQL-level type of a declared column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Integer,
    Real,
    /// Stored as TEXT containing a JSON document.
    Json,
}

impl ColumnType {
    pub(crate) fn sql_type(self) -> &'static str {
        match self {
            ColumnType::Text => "TEXT",
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Json => "TEXT",
        }
    }
}

/// A value bound to a declared column, independent of SQL wire types.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Text(String),
    Integer(i64),
    Real(f64),
    Json(serde_json::Value),
}

impl ColumnValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ColumnValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ColumnValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            ColumnValue::Json(v) => Some(v),
            _ => None,
        }
    }
}

impl ToSql for ColumnValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            ColumnValue::Null => ToSqlOutput::Owned(SqlValue::Null),
            ColumnValue::Text(s) => ToSqlOutput::Owned(SqlValue::Text(s.clone())),
            ColumnValue::Integer(n) => ToSqlOutput::Owned(SqlValue::Integer(*n)),
            ColumnValue::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            ColumnValue::Json(v) => ToSqlOutput::Owned(SqlValue::Text(v.to_string())),
        })
    }
}

impl From<&str> for ColumnValue {
    fn from(s: &str) -> Self {
        ColumnValue::Text(s.to_string())
    }
}

impl From<String> for ColumnValue {
    fn from(s: String) -> Self {
        ColumnValue::Text(s)
    }
}

impl From<i64> for ColumnValue {
    fn from(n: i64) -> Self {
        ColumnValue::Integer(n)
    }
}

impl From<serde_json::Value> for ColumnValue {
    fn from(v: serde_json::Value) -> Self {
        ColumnValue::Json(v)
    }
}

/// A behavior contribution: given the bound record, the collected diff,
/// and the round's unresolved feedback strings, returns the column updates
/// to apply to the record (e.g. appending to a `reviews` log column).
pub type AddReviewHook = Arc<dyn Fn(&Record, &str, &[String]) -> IndexMap<String, ColumnValue> + Send + Sync>;

/// Schema contributed by one or more `record` declarations for the same name.
#[derive(Clone)]
pub struct RecordDef {
    pub name: String,
    pub table: String,
    pub columns: IndexMap<String, ColumnType>,
    add_review: Vec<AddReviewHook>,
}

impl RecordDef {
    /// Declare a record; `table` defaults to `name` + "s" unless given.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let table = format!("{}s", name);
        Self {
            name,
            table,
            columns: IndexMap::new(),
            add_review: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.insert(name.into(), ty);
        self
    }

    /// Register a behavior this record responds to `add_review` with: called
    /// by `agent_review_loop` after each review pass, with the round's diff
    /// and outstanding feedback, if any.
    pub fn with_add_review<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Record, &str, &[String]) -> IndexMap<String, ColumnValue> + Send + Sync + 'static,
    {
        self.add_review.push(Arc::new(hook));
        self
    }

    /// Whether some contribution to this record registered `add_review`.
    pub fn responds_to_add_review(&self) -> bool {
        !self.add_review.is_empty()
    }

    /// Run every registered `add_review` hook, in registration order,
    /// folding each one's column updates into the next's view of the record.
    pub fn run_add_review(&self, mut record: Record, diff: &str, feedbacks: &[String]) -> IndexMap<String, ColumnValue> {
        let mut updates = IndexMap::new();
        for hook in &self.add_review {
            let fields = hook(&record, diff, feedbacks);
            for (name, value) in fields {
                record.fields.insert(name.clone(), value.clone());
                updates.insert(name, value);
            }
        }
        updates
    }

    /// Union this declaration with another contribution for the same record
    /// name, per spec: "schemas union, behaviors concatenate". Columns from
    /// `other` win on name collision (last declaration wins the type); its
    /// `add_review` hooks are appended after this declaration's own.
    pub fn merge(mut self, other: RecordDef) -> Self {
        for (name, ty) in other.columns {
            self.columns.insert(name, ty);
        }
        self.add_review.extend(other.add_review);
        self
    }

    pub(crate) fn create_table_sql(&self) -> String {
        let mut cols = vec![
            "id INTEGER PRIMARY KEY AUTOINCREMENT".to_string(),
            "created_at INTEGER NOT NULL".to_string(),
            "updated_at INTEGER NOT NULL".to_string(),
        ];
        for (col, ty) in &self.columns {
            cols.push(format!("{} {}", col, ty.sql_type()));
        }
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table,
            cols.join(", ")
        )
    }

    pub(crate) fn migration_version(&self) -> String {
        format!("table_{}", self.name)
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
