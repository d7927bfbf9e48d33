//! quarryctl end-to-end tests against a temporary database file.

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn quarryctl(db: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_quarryctl"))
        .arg("--database")
        .arg(db)
        .args(args)
        .env_remove("QUARRY_SEPARATE_THREAD")
        .env_remove("QUARRY_AWAIT_COMPLETION")
        .output()
        .expect("failed to run quarryctl")
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "quarryctl failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn seeded() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("failed to create temp dir");
    let db = dir.path().join("cli.db");
    stdout(&quarryctl(
        &db,
        &[
            "exec",
            "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, username TEXT NOT NULL)",
        ],
    ));
    for name in ["ann", "bob"] {
        stdout(&quarryctl(
            &db,
            &["exec", "INSERT INTO users (username) VALUES (?)", "--param", name],
        ));
    }
    (dir, db)
}

#[test]
fn test_cli_help_output() {
    let output = Command::new(env!("CARGO_BIN_EXE_quarryctl"))
        .arg("--help")
        .output()
        .expect("failed to run");
    let text = String::from_utf8_lossy(&output.stdout);

    assert!(text.contains("--database"), "help should mention --database");
    assert!(text.contains("--separate-thread"), "help should mention --separate-thread");
    assert!(text.contains("tables"), "help should list the tables command");
}

#[test]
fn test_tables_and_count() {
    let (_dir, db) = seeded();

    let tables: serde_json::Value =
        serde_json::from_str(&stdout(&quarryctl(&db, &["--output", "json", "tables"]))).unwrap();
    assert_eq!(tables["tables"], serde_json::json!(["users"]));
    assert_eq!(tables["total"], 1);

    assert_eq!(stdout(&quarryctl(&db, &["count", "users"])).trim(), "2");
}

#[test]
fn test_query_with_params_as_json() {
    let (_dir, db) = seeded();

    let rows: serde_json::Value = serde_json::from_str(&stdout(&quarryctl(
        &db,
        &[
            "--output",
            "json",
            "query",
            "SELECT id, username FROM users WHERE id > ?",
            "--param",
            "1",
        ],
    )))
    .unwrap();
    assert_eq!(rows, serde_json::json!([{ "id": 2, "username": "bob" }]));
}

#[test]
fn test_keys_and_columns() {
    let (_dir, db) = seeded();

    let keys: serde_json::Value =
        serde_json::from_str(&stdout(&quarryctl(&db, &["-o", "json", "keys", "users"]))).unwrap();
    assert_eq!(keys["primary"], serde_json::json!(["id"]));
    assert_eq!(keys["foreign"], serde_json::json!([]));

    let columns = stdout(&quarryctl(&db, &["columns", "users"]));
    assert!(columns.contains("username"));
    assert!(columns.contains("TEXT"));
}

#[test]
fn test_rename_then_drop() {
    let (_dir, db) = seeded();

    stdout(&quarryctl(&db, &["rename", "users", "members"]));
    assert_eq!(stdout(&quarryctl(&db, &["tables"])).lines().next(), Some("members"));

    stdout(&quarryctl(&db, &["drop", "members"]));
    assert!(stdout(&quarryctl(&db, &["tables"])).contains("No tables found."));
}

#[test]
fn test_missing_table_fails() {
    let (_dir, db) = seeded();
    let output = quarryctl(&db, &["count", "nope"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("does not exist"));
}
