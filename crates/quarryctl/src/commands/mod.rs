//! Subcommand implementations.

pub mod manage;
pub mod schema;
pub mod sql;
