// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn integer_version_is_stringified() {
    let m = Migration::new(2, |_conn| Ok(()));
    assert_eq!(m.version, "2");
}

#[test]
fn named_version_is_kept_verbatim() {
    let m = Migration::named("table_widget", |_conn| Ok(()));
    assert_eq!(m.version, "table_widget");
}

#[test]
fn run_executes_the_callback() {
    let conn = Connection::open_in_memory().unwrap();
    let m = Migration::new(1, |c| c.execute_batch("CREATE TABLE t (id INTEGER)"));
    m.run(&conn).unwrap();
    conn.execute("INSERT INTO t (id) VALUES (1)", []).unwrap();
}
