//! The SQLite connection and statement execution.
//!
//! Exactly one connection exists per database. It is only reachable through
//! [`Engine::execute`], which holds the mutex for the duration of a single
//! statement, so the caller thread and the dispatch worker never use it
//! concurrently.

use std::path::Path;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rusqlite::config::DbConfig;
use rusqlite::{params_from_iter, Connection};

use crate::config::DatabaseOptions;
use crate::error::{Error, Result};
use crate::query::Statement;
use crate::value::{Row, Value};

use super::operation::{Action, Outcome};

/// Owner of the database connection.
#[derive(Debug)]
pub struct Engine {
    conn: Mutex<Connection>,
}

impl Engine {
    /// Open (or create) a database file.
    pub fn open(path: &Path, options: &DatabaseOptions) -> Result<Self> {
        let conn = Connection::open(path)?;
        apply_pragmas(&conn, options)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(options: &DatabaseOptions) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_pragmas(&conn, options)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute one statement.
    ///
    /// Engine-level failures (syntax, constraint violations) are returned as
    /// [`Error::Query`] carrying the statement and its parameters.
    pub fn execute(&self, statement: &Statement, action: Action) -> Result<Outcome> {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        tracing::debug!(
            kind = ?action.kind(),
            sql = %statement.sql,
            params = statement.params.len(),
            "Executing statement"
        );

        let result = match action {
            Action::Read { first_only } => read_rows(&conn, statement, first_only).map(Outcome::Rows),
            Action::Write => conn
                .execute(&statement.sql, params_from_iter(statement.params.iter()))
                .map(|changes| Outcome::Written {
                    changes,
                    last_insert_rowid: conn.last_insert_rowid(),
                }),
        };
        result.map_err(|e| Error::query(&e, &statement.sql, &statement.params))
    }
}

fn read_rows(conn: &Connection, statement: &Statement, first_only: bool) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(&statement.sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
    let mut rows = stmt.query(params_from_iter(statement.params.iter()))?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let values = (0..columns.len())
            .map(|i| row.get::<_, Value>(i))
            .collect::<rusqlite::Result<Vec<_>>>()?;
        out.push(Row {
            columns: columns.clone(),
            values,
        });
        if first_only {
            break;
        }
    }
    Ok(out)
}

/// Apply connection pragmas.
///
/// - foreign_keys: enforce declared REFERENCES clauses
/// - busy_timeout: retry instead of failing on a locked file
/// - double-quoted strings off: `"name"` is always an identifier, so an
///   unknown column is an error rather than a text literal
pub fn apply_pragmas(conn: &Connection, options: &DatabaseOptions) -> rusqlite::Result<()> {
    conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DQS_DML, false)?;
    conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DQS_DDL, false)?;
    conn.pragma_update(None, "foreign_keys", options.foreign_keys)?;
    conn.busy_timeout(Duration::from_millis(options.busy_timeout_ms))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Engine {
        Engine::open_in_memory(&DatabaseOptions::default()).unwrap()
    }

    fn write(engine: &Engine, sql: &str, params: Vec<Value>) -> Result<Outcome> {
        engine.execute(&Statement::new(sql, params), Action::Write)
    }

    #[test]
    fn test_write_then_read() {
        let engine = engine();
        write(&engine, "CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT)", vec![]).unwrap();
        let outcome = write(&engine, "INSERT INTO t (name) VALUES (?)", vec!["a".into()]).unwrap();
        assert_eq!(outcome.changes(), 1);
        assert_eq!(outcome.last_insert_rowid(), Some(1));

        let rows = engine
            .execute(
                &Statement::new("SELECT id, name FROM t", vec![]),
                Action::Read { first_only: false },
            )
            .unwrap()
            .into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].columns, vec!["id", "name"]);
        assert_eq!(rows[0].values, vec![Value::Integer(1), Value::Text("a".into())]);
    }

    #[test]
    fn test_first_only_stops_early() {
        let engine = engine();
        write(&engine, "CREATE TABLE t (n INTEGER)", vec![]).unwrap();
        write(&engine, "INSERT INTO t VALUES (1), (2), (3)", vec![]).unwrap();
        let rows = engine
            .execute(
                &Statement::new("SELECT n FROM t", vec![]),
                Action::Read { first_only: true },
            )
            .unwrap()
            .into_rows();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_engine_error_carries_statement() {
        let engine = engine();
        let err = write(&engine, "INSERT INTO missing VALUES (?)", vec![1.into()]).unwrap_err();
        match err {
            Error::Query { message, sql, params } => {
                assert!(message.contains("no such table"));
                assert_eq!(sql, "INSERT INTO missing VALUES (?)");
                assert_eq!(params, vec![Value::Integer(1)]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_double_quotes_are_identifiers() {
        let engine = engine();
        write(&engine, "CREATE TABLE t (name TEXT)", vec![]).unwrap();
        let err = engine
            .execute(
                &Statement::new("SELECT \"missing\" FROM t", vec![]),
                Action::Read { first_only: false },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Query { message, .. } if message.contains("no such column")));
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let engine = engine();
        write(&engine, "CREATE TABLE a (id INTEGER PRIMARY KEY)", vec![]).unwrap();
        write(&engine, "CREATE TABLE b (a_id INTEGER REFERENCES a(id))", vec![]).unwrap();
        let err = write(&engine, "INSERT INTO b VALUES (9)", vec![]).unwrap_err();
        assert!(err.is_constraint_violation());
    }
}
