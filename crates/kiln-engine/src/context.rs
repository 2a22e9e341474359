// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The environment a step body runs against: store, workspace, session,
//! git, and the i18n service, plus helpers for loading and updating the
//! domain record a task is bound to.

use crate::error::EngineError;
use crate::translator::I18nAttrs;
use kiln_adapters::Git;
use kiln_core::{Clock, TaskId, Workspace};
use kiln_session::Session;
use kiln_store::{ColumnValue, Record};
use serde_json::Value;
use std::sync::Arc;

/// Everything a step body needs, cheap to clone (everything inside is
/// itself a handle: `Store` wraps an `Arc`, the rest are already `Arc`s).
#[derive(Clone)]
pub struct StepArgs {
    pub store: kiln_store::Store,
    pub workspace: Workspace,
    pub session: Arc<Session>,
    pub git: Arc<dyn Git>,
    pub translator: Arc<dyn crate::translator::Translator>,
    pub clock: Arc<dyn Clock>,
    pub task_id: TaskId,
}

impl StepArgs {
    /// Load the domain record a task is bound to, if any. The record's
    /// table is assumed to share its name with `task.record_type`.
    pub fn record(&self) -> Result<Option<Record>, EngineError> {
        let task = self
            .store
            .transaction(|txn| txn.find_task(&self.task_id))?
            .ok_or_else(|| EngineError::TaskNotFound(self.task_id.as_str().to_string()))?;
        let (Some(table), Some(id)) = (task.record_type, task.record_id) else {
            return Ok(None);
        };
        Ok(self.store.transaction(|txn| txn.table(table).find(id))?)
    }

    /// Merge `fields` into the record a task is bound to.
    pub fn update_record(&self, fields: serde_json::Map<String, Value>) -> Result<(), EngineError> {
        let columns: Vec<(String, ColumnValue)> = fields.into_iter().map(|(k, v)| (k, json_to_column_value(v))).collect();
        self.update_record_columns(columns)
    }

    /// Merge already-typed `columns` into the record a task is bound to, a
    /// no-op if it has none. Used where the caller already has
    /// [`ColumnValue`]s, e.g. a record behavior's return.
    pub fn update_record_columns(&self, columns: Vec<(String, ColumnValue)>) -> Result<(), EngineError> {
        let task = self
            .store
            .transaction(|txn| txn.find_task(&self.task_id))?
            .ok_or_else(|| EngineError::TaskNotFound(self.task_id.as_str().to_string()))?;
        let (Some(table), Some(id)) = (task.record_type, task.record_id) else {
            return Ok(());
        };
        let now = self.clock.unix_seconds();
        self.store.transaction(|txn| txn.table(table).update(id, columns, now))?;
        Ok(())
    }

    /// The record type name a task is bound to, if any.
    pub fn record_type(&self) -> Result<Option<String>, EngineError> {
        let task = self
            .store
            .transaction(|txn| txn.find_task(&self.task_id))?
            .ok_or_else(|| EngineError::TaskNotFound(self.task_id.as_str().to_string()))?;
        Ok(task.record_type)
    }

    /// The record's fields as i18n attributes, or an empty map if the task
    /// has no bound record.
    pub fn record_i18n_attrs(&self) -> Result<I18nAttrs, EngineError> {
        let Some(record) = self.record()? else {
            return Ok(I18nAttrs::new());
        };
        Ok(record
            .fields
            .into_iter()
            .map(|(name, value)| (name, column_value_to_json(value)))
            .collect())
    }
}

fn column_value_to_json(value: ColumnValue) -> Value {
    match value {
        ColumnValue::Null => Value::Null,
        ColumnValue::Text(s) => Value::String(s),
        ColumnValue::Integer(n) => Value::from(n),
        ColumnValue::Real(f) => Value::from(f),
        ColumnValue::Json(v) => v,
    }
}

/// Convert a plain JSON scalar into the matching [`ColumnValue`]; objects
/// and arrays are stored as `Json`. Unlike `ColumnValue::from(Value)`, this
/// keeps scalars unquoted in their declared SQL type.
fn json_to_column_value(value: Value) -> ColumnValue {
    match value {
        Value::Null => ColumnValue::Null,
        Value::String(s) => ColumnValue::Text(s),
        Value::Bool(b) => ColumnValue::Integer(b as i64),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                ColumnValue::Integer(i)
            } else {
                ColumnValue::Real(n.as_f64().unwrap_or(0.0))
            }
        }
        other @ (Value::Object(_) | Value::Array(_)) => ColumnValue::Json(other),
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
