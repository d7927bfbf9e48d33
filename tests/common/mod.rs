//! Test utilities and fixtures for quarry integration tests.
//!
//! Provides:
//! - Temporary database files
//! - A `users` / `items` schema with one foreign key

#![allow(dead_code)]

use std::path::PathBuf;

use quarry::{Column, Database, DatabaseOptions, Table};
use tempfile::TempDir;

/// Test fixture that manages a temporary database directory.
///
/// The directory is automatically cleaned up when the fixture is dropped.
pub struct TestFixture {
    /// Temporary directory for test database
    pub temp_dir: TempDir,
    /// Path to the database file
    pub db_path: PathBuf,
}

impl TestFixture {
    /// Create a new test fixture with a temporary database directory.
    pub fn new() -> Self {
        quarry::observability::tracing::init_test_tracing();
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        Self { temp_dir, db_path }
    }

    /// Open the fixture database with the given options.
    pub fn open(&self, options: DatabaseOptions) -> Database {
        Database::open(&self.db_path, options).expect("failed to open database")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// `users(id, username unique)`.
pub fn create_users(db: &Database) -> Table {
    db.create(
        "users",
        [
            ("id", Column::autoincrement()),
            ("username", Column::text().unique().not_null()),
        ],
    )
    .expect("failed to create users")
}

/// `items(id, label, owner_id -> users.id)`.
pub fn create_items(db: &Database) -> Table {
    db.create(
        "items",
        [
            ("id", Column::autoincrement()),
            ("label", Column::text().not_null()),
            ("owner_id", Column::foreign("users")),
        ],
    )
    .expect("failed to create items")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_creates_temp_dir() {
        let fixture = TestFixture::new();
        assert!(fixture.temp_dir.path().exists());
        assert!(fixture.db_path.ends_with("test.db"));
    }
}
