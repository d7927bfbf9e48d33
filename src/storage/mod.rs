//! SQLite execution layer for quarry.
//!
//! Provides:
//! - A single connection guarded by a mutex, with pragmas applied on open
//! - Compiled operations and their outcomes
//! - A dedicated worker thread alternating between read and write queues

pub mod dispatch;
pub mod engine;
pub mod operation;
