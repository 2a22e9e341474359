// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Generic CRUD over a user-declared [`crate::schema::RecordDef`] table.
//!
//! Unlike the built-in tables in [`crate::builtin`], domain records key on
//! an autoincrement integer id and carry an arbitrary, caller-declared set
//! of columns, so access goes through dynamically-typed [`ColumnValue`]s
//! rather than a hand-written struct.

use crate::error::StoreError;
use crate::schema::ColumnValue;
use crate::store::Store;
use indexmap::IndexMap;
use rusqlite::types::ValueRef;
use rusqlite::Row;

/// One row of a generic record table.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub fields: IndexMap<String, ColumnValue>,
}

fn value_ref_to_column(v: ValueRef<'_>) -> ColumnValue {
    match v {
        ValueRef::Null => ColumnValue::Null,
        ValueRef::Integer(n) => ColumnValue::Integer(n),
        ValueRef::Real(f) => ColumnValue::Real(f),
        ValueRef::Text(t) => {
            let s = String::from_utf8_lossy(t).into_owned();
            match serde_json::from_str::<serde_json::Value>(&s) {
                Ok(v @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => ColumnValue::Json(v),
                _ => ColumnValue::Text(s),
            }
        }
        ValueRef::Blob(_) => ColumnValue::Null,
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<Record> {
    let mut fields = IndexMap::new();
    for (idx, name) in row.as_ref().column_names().iter().enumerate() {
        if matches!(*name, "id" | "created_at" | "updated_at") {
            continue;
        }
        fields.insert(name.to_string(), value_ref_to_column(row.get_ref(idx)?));
    }
    Ok(Record {
        id: row.get("id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
        fields,
    })
}

/// A handle to one declared table, scoped to a single transaction. Each
/// method re-enters the store's reentrant connection lock for the duration
/// of its own query; see [`Store::transaction`] for why that's cheap and
/// safe even while an outer transaction is held on the same thread.
pub struct RecordTable<'a> {
    store: &'a Store,
    table: String,
    readonly: bool,
}

impl<'a> RecordTable<'a> {
    pub(crate) fn new(store: &'a Store, table: impl Into<String>, readonly: bool) -> Self {
        Self {
            store,
            table: table.into(),
            readonly,
        }
    }

    fn require_writable(&self) -> Result<(), StoreError> {
        if self.readonly {
            Err(StoreError::ReadOnly)
        } else {
            Ok(())
        }
    }

    pub fn create(
        &self,
        fields: impl IntoIterator<Item = (String, ColumnValue)>,
        now: i64,
    ) -> Result<Record, StoreError> {
        self.require_writable()?;
        let fields: Vec<(String, ColumnValue)> = fields.into_iter().collect();
        self.store.with_connection(|conn| {
            let mut columns = vec!["created_at".to_string(), "updated_at".to_string()];
            let mut placeholders = vec!["?1".to_string(), "?2".to_string()];
            let mut values: Vec<&dyn rusqlite::ToSql> = vec![&now, &now];
            for (i, (name, value)) in fields.iter().enumerate() {
                columns.push(name.clone());
                placeholders.push(format!("?{}", i + 3));
                values.push(value);
            }
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                self.table,
                columns.join(", "),
                placeholders.join(", ")
            );
            conn.execute(&sql, values.as_slice())?;
            let id = conn.last_insert_rowid();
            let sql = format!("SELECT * FROM {} WHERE id = ?1", self.table);
            conn.query_row(&sql, [id], record_from_row).map_err(StoreError::from)
        })
    }

    pub fn find(&self, id: i64) -> Result<Option<Record>, StoreError> {
        self.store.with_connection(|conn| {
            let sql = format!("SELECT * FROM {} WHERE id = ?1", self.table);
            conn.query_row(&sql, [id], record_from_row).optional_store_error()
        })
    }

    pub fn all(&self) -> Result<Vec<Record>, StoreError> {
        self.store.with_connection(|conn| {
            let sql = format!("SELECT * FROM {} ORDER BY id ASC", self.table);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], record_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
        })
    }

    pub fn where_eq(&self, column: &str, value: impl Into<ColumnValue>) -> Result<Vec<Record>, StoreError> {
        let value = value.into();
        self.store.with_connection(|conn| {
            let sql = format!("SELECT * FROM {} WHERE {} = ?1 ORDER BY id ASC", self.table, column);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([value], record_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
        })
    }

    pub fn update(
        &self,
        id: i64,
        fields: impl IntoIterator<Item = (String, ColumnValue)>,
        now: i64,
    ) -> Result<(), StoreError> {
        self.require_writable()?;
        let fields: Vec<(String, ColumnValue)> = fields.into_iter().collect();
        self.store.with_connection(|conn| {
            let mut sets = vec!["updated_at = ?1".to_string()];
            let mut values: Vec<&dyn rusqlite::ToSql> = vec![&now];
            for (i, (name, value)) in fields.iter().enumerate() {
                sets.push(format!("{} = ?{}", name, i + 2));
                values.push(value);
            }
            let id_placeholder = fields.len() + 2;
            let sql = format!(
                "UPDATE {} SET {} WHERE id = ?{}",
                self.table,
                sets.join(", "),
                id_placeholder
            );
            values.push(&id);
            let changed = conn.execute(&sql, values.as_slice())?;
            if changed == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
    }

    pub fn delete(&self, id: i64) -> Result<(), StoreError> {
        self.require_writable()?;
        self.store.with_connection(|conn| {
            let sql = format!("DELETE FROM {} WHERE id = ?1", self.table);
            conn.execute(&sql, [id])?;
            Ok(())
        })
    }

    pub fn delete_all(&self) -> Result<(), StoreError> {
        self.require_writable()?;
        self.store.with_connection(|conn| {
            let sql = format!("DELETE FROM {}", self.table);
            conn.execute(&sql, [])?;
            Ok(())
        })
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        self.store.with_connection(|conn| {
            let sql = format!("SELECT COUNT(*) FROM {}", self.table);
            conn.query_row(&sql, [], |row| row.get(0)).map_err(StoreError::from)
        })
    }
}

trait OptionalStoreError<T> {
    fn optional_store_error(self) -> Result<Option<T>, StoreError>;
}

impl<T> OptionalStoreError<T> for rusqlite::Result<T> {
    fn optional_store_error(self) -> Result<Option<T>, StoreError> {
        use rusqlite::OptionalExtension;
        self.optional().map_err(StoreError::from)
    }
}

#[cfg(test)]
#[path = "record_table_tests.rs"]
mod tests;
