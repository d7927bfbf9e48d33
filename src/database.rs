//! Database handle: opening, table management and statement routing.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::DatabaseOptions;
use crate::error::{Error, Result};
use crate::query::{quote_ident, Statement};
use crate::schema::{create_table_sql, Column, ColumnInfo, ForeignKey, SqlType, TableSchema};
use crate::storage::dispatch::Dispatcher;
use crate::storage::engine::Engine;
use crate::storage::operation::{self, Action, Operation, Outcome};
use crate::table::Table;
use crate::value::{Row, Value};

/// Whether a write should block until it has been executed.
///
/// Only meaningful when the database runs a dispatch worker; without one
/// every statement executes on the calling thread. Reads always wait for
/// their rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    /// Use [`DatabaseOptions::await_completion`].
    #[default]
    Default,
    Await,
    Detached,
}

struct Inner {
    name: String,
    path: Option<PathBuf>,
    options: DatabaseOptions,
    engine: Arc<Engine>,
    dispatcher: Option<Dispatcher<Operation>>,
    closed: AtomicBool,
}

/// Handle to an SQLite database.
///
/// Cheap to clone; all clones and every [`Table`] obtained from it share one
/// connection and at most one dispatch worker.
#[derive(Clone)]
pub struct Database {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.inner.name)
            .field("path", &self.inner.path)
            .field("separate_thread", &self.inner.dispatcher.is_some())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Database {
    /// Open or create a database file. A `.db` extension is added when the
    /// path has none.
    pub fn open<P: AsRef<Path>>(path: P, options: DatabaseOptions) -> Result<Self> {
        let mut path = path.as_ref().to_path_buf();
        if path.extension().is_none() {
            path.set_extension("db");
        }
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let engine = Engine::open(&path, &options)?;
        Self::start(name, Some(path), engine, options)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory(options: DatabaseOptions) -> Result<Self> {
        let engine = Engine::open_in_memory(&options)?;
        Self::start("memory".to_string(), None, engine, options)
    }

    fn start(
        name: String,
        path: Option<PathBuf>,
        engine: Engine,
        options: DatabaseOptions,
    ) -> Result<Self> {
        let engine = Arc::new(engine);

        let dispatcher = if options.separate_thread {
            let worker_engine = Arc::clone(&engine);
            Some(Dispatcher::spawn(
                &format!("quarry-{name}"),
                move |_, op: Operation| {
                    let _span = tracing::debug_span!("operation", operation_id = %op.id).entered();
                    let result = worker_engine.execute(&op.statement, op.action);
                    op.complete(result);
                },
            )?)
        } else {
            None
        };

        tracing::info!(
            database = %name,
            path = ?path,
            separate_thread = options.separate_thread,
            await_completion = options.await_completion,
            "Database opened"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                name,
                path,
                options,
                engine,
                dispatcher,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Name of the database (the file stem).
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.inner.path.as_deref()
    }

    pub fn options(&self) -> &DatabaseOptions {
        &self.inner.options
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Number of queued operations waiting for the dispatch worker.
    pub fn queue_len(&self) -> usize {
        self.inner.dispatcher.as_ref().map_or(0, Dispatcher::len)
    }

    /// Block until every operation queued before this call has completed.
    pub fn drain(&self) -> Result<()> {
        match &self.inner.dispatcher {
            Some(dispatcher) => dispatcher.drain(),
            None => Ok(()),
        }
    }

    /// Drain the queue, stop the worker and reject further operations.
    pub fn close(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        self.drain()?;
        self.shut_down()
    }

    /// Close without running queued operations; their callers see
    /// [`Error::WorkerStopped`].
    pub fn close_now(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Closed);
        }
        if let Some(dispatcher) = &self.inner.dispatcher {
            let dropped = dispatcher.discard();
            if dropped > 0 {
                tracing::warn!(database = %self.inner.name, dropped, "Discarded queued operations");
            }
        }
        self.shut_down()
    }

    fn shut_down(&self) -> Result<()> {
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Some(dispatcher) = &self.inner.dispatcher {
            dispatcher.shutdown()?;
        }
        tracing::info!(database = %self.inner.name, "Database closed");
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            Err(Error::Closed)
        } else {
            Ok(())
        }
    }

    fn awaits(&self, action: Action, completion: Completion) -> bool {
        match (action, completion) {
            (Action::Read { .. }, _) | (_, Completion::Await) => true,
            (_, Completion::Detached) => false,
            (_, Completion::Default) => self.inner.options.await_completion,
        }
    }

    /// Run a statement on the calling thread or through the dispatch queue.
    ///
    /// Returns `None` for a detached write.
    pub(crate) fn execute(
        &self,
        statement: Statement,
        action: Action,
        completion: Completion,
    ) -> Result<Option<Outcome>> {
        self.ensure_open()?;
        let Some(dispatcher) = &self.inner.dispatcher else {
            return self.inner.engine.execute(&statement, action).map(Some);
        };

        let op = Operation::new(statement, action);
        let kind = op.kind();
        if self.awaits(action, completion) {
            let (op, rx) = op.awaited();
            dispatcher.submit(kind, op)?;
            operation::wait(rx).map(Some)
        } else {
            tracing::debug!(operation_id = %op.id, "Submitting detached operation");
            dispatcher.submit(kind, op)?;
            Ok(None)
        }
    }

    /// Async counterpart of [`Database::execute`]. Without a dispatch worker
    /// the statement runs on the blocking thread pool of the current Tokio
    /// runtime, or inline when polled outside one.
    pub(crate) async fn execute_async(
        &self,
        statement: Statement,
        action: Action,
        completion: Completion,
    ) -> Result<Option<Outcome>> {
        self.ensure_open()?;
        let Some(dispatcher) = &self.inner.dispatcher else {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                return self.inner.engine.execute(&statement, action).map(Some);
            };
            let engine = Arc::clone(&self.inner.engine);
            return runtime
                .spawn_blocking(move || engine.execute(&statement, action))
                .await
                .map_err(|_| Error::WorkerStopped)?
                .map(Some);
        };

        let op = Operation::new(statement, action);
        let kind = op.kind();
        if self.awaits(action, completion) {
            let (op, rx) = op.awaited();
            dispatcher.submit(kind, op)?;
            rx.await.map_err(|_| Error::WorkerStopped)?.map(Some)
        } else {
            dispatcher.submit(kind, op)?;
            Ok(None)
        }
    }

    pub(crate) fn fetch(&self, statement: Statement, first_only: bool) -> Result<Vec<Row>> {
        Ok(self
            .execute(statement, Action::Read { first_only }, Completion::Await)?
            .map(Outcome::into_rows)
            .unwrap_or_default())
    }

    pub(crate) async fn fetch_async(&self, statement: Statement, first_only: bool) -> Result<Vec<Row>> {
        Ok(self
            .execute_async(statement, Action::Read { first_only }, Completion::Await)
            .await?
            .map(Outcome::into_rows)
            .unwrap_or_default())
    }

    /// Drain, then read. Used by metadata queries so they observe every
    /// earlier write.
    fn fetch_settled(&self, sql: &str, params: Vec<Value>) -> Result<Vec<Row>> {
        self.drain()?;
        self.fetch(Statement::new(sql, params), false)
    }

    /// Execute a raw read statement.
    pub fn read(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.fetch(Statement::new(sql, params.to_vec()), false)
    }

    /// Execute a raw write statement, returning the number of changed rows
    /// (`None` when detached).
    pub fn write(&self, sql: &str, params: &[Value]) -> Result<Option<usize>> {
        self.write_with(sql, params, Completion::Default)
    }

    pub fn write_with(
        &self,
        sql: &str,
        params: &[Value],
        completion: Completion,
    ) -> Result<Option<usize>> {
        Ok(self
            .execute(Statement::new(sql, params.to_vec()), Action::Write, completion)?
            .map(|outcome| outcome.changes()))
    }

    /// Names of all user tables, sorted.
    pub fn tables(&self) -> Result<Vec<String>> {
        let rows = self.fetch_settled(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name",
            Vec::new(),
        )?;
        Ok(rows.iter().map(|row| text(row, 0)).collect())
    }

    pub fn exists(&self, table: &str) -> Result<bool> {
        let rows = self.fetch_settled(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?",
            vec![table.into()],
        )?;
        Ok(!rows.is_empty())
    }

    /// Handle to an existing table.
    pub fn table(&self, name: &str) -> Result<Table> {
        if !self.exists(name)? {
            return Err(Error::Table(format!("table '{name}' does not exist")));
        }
        Table::load(self.clone(), name)
    }

    /// Create a table if it does not exist yet and return a handle to it.
    pub fn create<I, N>(&self, name: &str, columns: I) -> Result<Table>
    where
        I: IntoIterator<Item = (N, Column)>,
        N: Into<String>,
    {
        self.create_table(name, columns, false)
    }

    /// Create a table, failing with [`Error::Table`] if it already exists.
    pub fn create_strict<I, N>(&self, name: &str, columns: I) -> Result<Table>
    where
        I: IntoIterator<Item = (N, Column)>,
        N: Into<String>,
    {
        self.create_table(name, columns, true)
    }

    fn create_table<I, N>(&self, name: &str, columns: I, strict: bool) -> Result<Table>
    where
        I: IntoIterator<Item = (N, Column)>,
        N: Into<String>,
    {
        self.ensure_open()?;
        if strict && self.exists(name)? {
            return Err(Error::Table(format!("table '{name}' already exists")));
        }

        let mut columns: Vec<(String, Column)> =
            columns.into_iter().map(|(n, c)| (n.into(), c)).collect();
        for (_, column) in &mut columns {
            self.resolve_reference(column)?;
        }

        let sql = create_table_sql(name, &columns)?;
        self.execute(Statement::new(sql, Vec::new()), Action::Write, Completion::Await)?;
        tracing::info!(database = %self.inner.name, table = name, "Table created");

        Table::load(self.clone(), name)
    }

    /// Point a foreign key column at a concrete referenced column and copy
    /// that column's type.
    fn resolve_reference(&self, column: &mut Column) -> Result<()> {
        let Some(reference) = column.references().cloned() else {
            return Ok(());
        };
        if !self.exists(&reference.table)? {
            return Err(Error::Table(format!(
                "referenced table '{}' does not exist",
                reference.table
            )));
        }

        let target = self.load_schema(&reference.table)?;
        let referenced = match &reference.column {
            Some(name) => target.column(name).ok_or_else(|| {
                Error::Schema(format!(
                    "column '{name}' does not exist in referenced table '{}'",
                    reference.table
                ))
            })?,
            None => match target.primary_keys().as_slice() {
                [key] => target.column(key).ok_or_else(|| {
                    Error::Schema(format!("primary key '{key}' vanished from '{}'", target.name))
                })?,
                [] => {
                    return Err(Error::Schema(format!(
                        "referenced table '{}' has no primary key",
                        reference.table
                    )))
                }
                _ => {
                    return Err(Error::Schema(format!(
                        "referenced table '{}' has multiple primary keys; name the referenced column",
                        reference.table
                    )))
                }
            },
        };

        let ty = SqlType::from_declared(&referenced.declared_type).unwrap_or(SqlType::Integer);
        column.resolve_reference(referenced.name.clone(), ty);
        Ok(())
    }

    /// Drop a table.
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let sql = format!("DROP TABLE {}", quote_ident(name)?);
        self.execute(Statement::new(sql, Vec::new()), Action::Write, Completion::Await)?;
        tracing::info!(database = %self.inner.name, table = name, "Table dropped");
        Ok(())
    }

    /// Current structure of a table, or `None` if it does not exist.
    pub(crate) fn find_schema(&self, table: &str) -> Result<Option<TableSchema>> {
        if self.exists(table)? {
            self.load_schema(table).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Read the current structure of a table.
    pub(crate) fn load_schema(&self, table: &str) -> Result<TableSchema> {
        let columns = self
            .fetch_settled(
                "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?) ORDER BY cid",
                vec![table.into()],
            )?
            .iter()
            .map(|row| ColumnInfo {
                name: text(row, 0),
                declared_type: text(row, 1),
                not_null: integer(row, 2) != 0,
                default: row.get(3).and_then(Value::as_str).map(str::to_string),
                primary_key: u32::try_from(integer(row, 4)).unwrap_or(0),
            })
            .collect();

        let foreign_keys = self
            .fetch_settled(
                "SELECT \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?) ORDER BY id, seq",
                vec![table.into()],
            )?
            .iter()
            .map(|row| {
                let referenced = text(row, 0);
                // `REFERENCES other` without a column targets its primary key.
                let to = match row.get(2) {
                    Some(Value::Text(to)) => to.clone(),
                    _ => self.implicit_reference_target(&referenced)?.unwrap_or_default(),
                };
                Ok(ForeignKey {
                    table: referenced,
                    from: text(row, 1),
                    to,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(TableSchema {
            name: table.to_string(),
            columns,
            foreign_keys,
        })
    }

    /// The single primary key column of `table`, which is what SQLite
    /// targets for a foreign key that names no column.
    fn implicit_reference_target(&self, table: &str) -> Result<Option<String>> {
        let keys = self.fetch_settled(
            "SELECT name FROM pragma_table_info(?) WHERE pk > 0 ORDER BY pk",
            vec![table.into()],
        )?;
        Ok(match keys.as_slice() {
            [key] => Some(text(key, 0)),
            _ => None,
        })
    }
}

fn text(row: &Row, index: usize) -> String {
    row.get(index)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn integer(row: &Row, index: usize) -> i64 {
    row.get(index).and_then(Value::as_i64).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn memory() -> Database {
        Database::open_in_memory(DatabaseOptions::default()).unwrap()
    }

    #[test]
    fn test_open_appends_extension() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("store"), DatabaseOptions::default()).unwrap();
        assert_eq!(db.name(), "store");
        assert_eq!(db.path().unwrap(), temp_dir.path().join("store.db"));
        assert!(temp_dir.path().join("store.db").exists());
    }

    #[test]
    fn test_open_keeps_existing_extension() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("data.sqlite"), DatabaseOptions::default()).unwrap();
        assert_eq!(db.name(), "data");
        assert!(temp_dir.path().join("data.sqlite").exists());
    }

    #[test]
    fn test_tables_exclude_internal() {
        let db = memory();
        db.create("b", [("id", Column::autoincrement())]).unwrap();
        db.create("a", [("id", Column::integer())]).unwrap();
        assert_eq!(db.tables().unwrap(), vec!["a", "b"]);
        assert!(db.exists("a").unwrap());
        assert!(!db.exists("sqlite_sequence_missing").unwrap());
    }

    #[test]
    fn test_strict_create_rejects_existing() {
        let db = memory();
        db.create("t", [("id", Column::integer())]).unwrap();
        db.create("t", [("id", Column::integer())]).unwrap();
        assert!(matches!(
            db.create_strict("t", [("id", Column::integer())]),
            Err(Error::Table(_))
        ));
    }

    #[test]
    fn test_missing_table_handle() {
        assert!(matches!(memory().table("nope"), Err(Error::Table(_))));
    }

    #[test]
    fn test_foreign_key_resolves_primary_key_type() {
        let db = memory();
        db.create("users", [("name", Column::text().primary_key())]).unwrap();
        let items = db.create("items", [("owner", Column::foreign("users"))]).unwrap();
        assert_eq!(
            items.schema().foreign_keys,
            vec![ForeignKey {
                table: "users".into(),
                from: "owner".into(),
                to: "name".into()
            }]
        );
        assert_eq!(items.schema().columns[0].declared_type, "TEXT");
    }

    #[test]
    fn test_foreign_key_without_column_targets_primary_key() {
        let db = memory();
        db.write("CREATE TABLE owners (code TEXT PRIMARY KEY, name TEXT)", &[]).unwrap();
        db.write("CREATE TABLE pets (name TEXT, owner TEXT REFERENCES owners)", &[]).unwrap();
        assert_eq!(
            db.table("pets").unwrap().schema().foreign_keys,
            vec![ForeignKey {
                table: "owners".into(),
                from: "owner".into(),
                to: "code".into()
            }]
        );

        db.write("CREATE TABLE loose (a INTEGER, b INTEGER)", &[]).unwrap();
        db.write("CREATE TABLE refs (l INTEGER REFERENCES loose)", &[]).unwrap();
        assert_eq!(db.table("refs").unwrap().schema().foreign_keys[0].to, "");
    }

    #[test]
    fn test_foreign_key_to_missing_table() {
        let db = memory();
        assert!(matches!(
            db.create("items", [("owner", Column::foreign("users"))]),
            Err(Error::Table(_))
        ));
    }

    #[test]
    fn test_foreign_key_needs_single_primary_key() {
        let db = memory();
        db.create("plain", [("a", Column::integer())]).unwrap();
        db.create(
            "pairs",
            [
                ("a", Column::integer().primary_key()),
                ("b", Column::integer().primary_key()),
            ],
        )
        .unwrap();
        assert!(matches!(
            db.create("x", [("p", Column::foreign("plain"))]),
            Err(Error::Schema(_))
        ));
        assert!(matches!(
            db.create("y", [("p", Column::foreign("pairs"))]),
            Err(Error::Schema(_))
        ));
        db.create("z", [("p", Column::foreign("pairs").references_column("b"))])
            .unwrap();
    }

    #[test]
    fn test_raw_read_and_write() {
        let db = memory();
        db.write("CREATE TABLE t (n INTEGER)", &[]).unwrap();
        assert_eq!(
            db.write("INSERT INTO t VALUES (?), (?)", &[1.into(), 2.into()]).unwrap(),
            Some(2)
        );
        let rows = db.read("SELECT SUM(n) AS total FROM t", &[]).unwrap();
        assert_eq!(rows[0].by_name("total"), Some(&Value::Integer(3)));
    }

    #[test]
    fn test_closed_database_rejects_operations() {
        let db = memory();
        db.close().unwrap();
        assert!(matches!(db.read("SELECT 1", &[]), Err(Error::Closed)));
        assert!(matches!(db.close(), Err(Error::Closed)));
    }

    #[test]
    fn test_drop_table() {
        let db = memory();
        db.create("t", [("id", Column::integer())]).unwrap();
        db.drop_table("t").unwrap();
        assert!(!db.exists("t").unwrap());
    }
}
