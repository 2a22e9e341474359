// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn default_table_name_is_pluralized() {
    let def = RecordDef::new("widget");
    assert_eq!(def.table, "widgets");
    assert_eq!(def.migration_version(), "table_widget");
}

#[test]
fn explicit_table_overrides_default() {
    let def = RecordDef::new("widget").with_table("custom_widgets");
    assert_eq!(def.table, "custom_widgets");
}

#[test]
fn merge_unions_columns_additively() {
    let a = RecordDef::new("widget").with_column("attr_1", ColumnType::Text);
    let b = RecordDef::new("widget").with_column("attr_2", ColumnType::Integer);
    let merged = a.merge(b);
    assert_eq!(merged.columns.len(), 2);
    assert_eq!(merged.columns.get("attr_1"), Some(&ColumnType::Text));
    assert_eq!(merged.columns.get("attr_2"), Some(&ColumnType::Integer));
}

#[test]
fn create_table_sql_includes_housekeeping_columns() {
    let def = RecordDef::new("widget").with_column("attr_1", ColumnType::Text);
    let sql = def.create_table_sql();
    assert!(sql.contains("CREATE TABLE IF NOT EXISTS widgets"));
    assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
    assert!(sql.contains("attr_1 TEXT"));
}
