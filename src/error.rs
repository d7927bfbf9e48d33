//! Error types shared by every quarry operation.

use thiserror::Error;

use crate::value::Value;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for database, table and query operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Table error: {0}")]
    Table(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    #[error("Logic error: {0}")]
    Logic(String),

    #[error("Sort error: {0}")]
    Sort(String),

    #[error("Invalid input: {0}")]
    Input(String),

    /// SQLite rejected a compiled statement.
    #[error("{}", render_query_error(message, sql, params))]
    Query {
        message: String,
        sql: String,
        params: Vec<Value>,
    },

    #[error("Database is closed")]
    Closed,

    #[error("Dispatch worker stopped before the operation completed")]
    WorkerStopped,

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Reasons a join could not be resolved against the declared foreign keys.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinError {
    #[error("table '{table}' has no foreign key")]
    NoForeignKey { table: String },

    #[error("table '{table}' has multiple foreign keys ({}); name the column to join on", candidates.join(", "))]
    Ambiguous {
        table: String,
        candidates: Vec<String>,
    },

    #[error("column '{column}' is not a foreign key of '{table}'")]
    NotForeignKey { table: String, column: String },

    #[error("column '{column}' does not exist in table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("right column '{0}' must be qualified with its table, e.g. 'table.{0}'")]
    UnqualifiedRight(String),

    #[error("table '{0}' does not exist")]
    UnknownTable(String),

    /// A foreign key names no column and its table has no single primary key.
    #[error("foreign key '{column}' references '{table}', which has no single primary key")]
    UnresolvedReference { table: String, column: String },
}

impl Error {
    pub(crate) fn query(err: &rusqlite::Error, sql: &str, params: &[Value]) -> Self {
        let message = match err {
            rusqlite::Error::SqliteFailure(_, Some(msg)) => msg.clone(),
            other => other.to_string(),
        };
        Self::Query {
            message,
            sql: sql.to_string(),
            params: params.to_vec(),
        }
    }

    /// True if SQLite reported a constraint violation (unique, not null, foreign key).
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Query { message, .. } => message.contains("constraint failed"),
            _ => false,
        }
    }
}

fn render_query_error(message: &str, sql: &str, params: &[Value]) -> String {
    let mut out = format!("{message}\nOn query:\t{sql}");
    if !params.is_empty() {
        let rendered: Vec<String> = params.iter().map(Value::to_sql_literal).collect();
        out.push_str("\nWith values:\t");
        out.push_str(&rendered.join(", "));
    }
    out
}
