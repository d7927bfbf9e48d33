//! Chained query builders.
//!
//! Every builder is an immutable value: chain calls borrow the builder and
//! return a new one, so a base query can be reused and extended into
//! independent derived queries. Compilation into a [`Statement`] happens on
//! `run()` (or explicitly through `statement()`).
//!
//! - [`filter`]: WHERE predicates chained left to right with AND / OR
//! - [`sort`]: single-column ORDER BY with optional LIMIT
//! - [`join`]: foreign-key driven JOIN resolution
//! - [`select`]: `get` / `get_all`
//! - [`update`]: `set`
//! - [`delete`]: `remove`

pub mod delete;
pub mod filter;
pub mod join;
pub mod select;
pub mod sort;
pub mod update;

use crate::error::{Error, Result};
use crate::value::Value;

pub use delete::Delete;
pub use filter::{Condition, Connector, Filter, Filtered, Predicate};
pub use join::{Join, JoinKind};
pub use select::{All, FetchMode, First, Select};
pub use sort::{Order, Sort};
pub use update::{Assign, Update};

/// One compiled SQL statement with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// Double-quote a single identifier.
pub(crate) fn quote_ident(name: &str) -> Result<String> {
    if name.is_empty() {
        return Err(Error::Input("identifier cannot be empty".into()));
    }
    if name.contains('"') || name.contains('\0') {
        return Err(Error::Input(format!("invalid identifier '{name}'")));
    }
    Ok(format!("\"{name}\""))
}

/// Quote a column reference, which may be `*`, `column` or `table.column`.
pub(crate) fn quote_column(name: &str) -> Result<String> {
    if name == "*" {
        return Ok(name.to_string());
    }
    match name.split_once('.') {
        Some((table, "*")) => Ok(format!("{}.*", quote_ident(table)?)),
        Some((table, column)) => Ok(format!("{}.{}", quote_ident(table)?, quote_ident(column)?)),
        None => quote_ident(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_column_forms() {
        assert_eq!(quote_column("*").unwrap(), "*");
        assert_eq!(quote_column("id").unwrap(), "\"id\"");
        assert_eq!(quote_column("users.id").unwrap(), "\"users\".\"id\"");
        assert_eq!(quote_column("users.*").unwrap(), "\"users\".*");
    }

    #[test]
    fn test_quote_rejects_bad_identifiers() {
        assert!(matches!(quote_ident(""), Err(Error::Input(_))));
        assert!(matches!(quote_ident("a\"b"), Err(Error::Input(_))));
        assert!(matches!(quote_column("users."), Err(Error::Input(_))));
    }
}
