//! Quarry: a fluent SQLite wrapper with chained query builders.
//!
//! Tables are created from typed column descriptions and queried through
//! immutable builders (`get`, `get_all`, `set`, `remove`) that compile to a
//! single parameterized statement when run.
//!
//! # Architecture
//!
//! - **Single connection**: every [`Table`] of a [`Database`] shares one
//!   SQLite connection
//! - **Dispatch queue**: optionally, statements run on a dedicated worker
//!   that alternates between reads and writes so neither can starve
//! - **Drain barrier**: [`Database::drain`] waits for everything queued
//!   before it, which metadata queries use to observe earlier writes
//!
//! # Modules
//!
//! - [`config`]: connection and dispatch options (CLI / environment)
//! - [`database`]: database handle and table management
//! - [`table`]: table handle, inserts and reflection
//! - [`query`]: select / update / delete builders
//! - [`schema`]: column definitions and schema snapshots
//! - [`storage`]: connection engine and dispatch queue
//! - [`observability`]: tracing setup
//!
//! # Example
//!
//! ```
//! use quarry::{Column, Database, DatabaseOptions, Fetched, Value};
//!
//! let db = Database::open_in_memory(DatabaseOptions::default())?;
//! let users = db.create(
//!     "users",
//!     [
//!         ("id", Column::autoincrement()),
//!         ("username", Column::text().unique().not_null()),
//!     ],
//! )?;
//! assert_eq!(users.add([("username", "a")])?, Some(1));
//! assert_eq!(users.add([("username", "b")])?, Some(2));
//!
//! let names = users.get_all(&["username"]).sort("username").desc().run()?;
//! assert_eq!(
//!     names,
//!     vec![
//!         Fetched::Value(Value::from("b")),
//!         Fetched::Value(Value::from("a")),
//!     ]
//! );
//! # Ok::<(), quarry::Error>(())
//! ```

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions,    // query::select::Select is fine
    clippy::must_use_candidate,         // Not all functions need #[must_use]
    clippy::missing_errors_doc,         // Error docs can be verbose
    clippy::missing_panics_doc,         // Panic docs can be verbose
    clippy::needless_raw_string_hashes, // r#""# is fine for SQL
    clippy::struct_excessive_bools,     // Config structs may have flags
    clippy::too_many_lines              // Some functions are inherently long
)]

pub mod config;
pub mod database;
pub mod error;
pub mod observability;
pub mod query;
pub mod schema;
pub mod storage;
pub mod table;
pub mod value;

pub use config::DatabaseOptions;
pub use database::{Completion, Database};
pub use error::{Error, JoinError, Result};
pub use query::{Assign, JoinKind, Statement};
pub use schema::{Column, SqlType};
pub use table::Table;
pub use value::{Fetched, Row, Value};

use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) operation ID.
///
/// # Example
///
/// ```
/// let a = quarry::generate_operation_id();
/// let b = quarry::generate_operation_id();
/// assert!(a < b);
/// ```
#[must_use]
pub fn generate_operation_id() -> Uuid {
    Uuid::now_v7()
}
