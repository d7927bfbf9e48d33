//! Table handle: row mutation, query entry points and schema reflection.

use std::sync::Arc;

use crate::database::{Completion, Database};
use crate::error::{Error, Result};
use crate::query::{quote_ident, All, Assign, Delete, First, Select, Statement, Update};
use crate::schema::{add_column_sql, Column, ForeignKey, TableSchema};
use crate::storage::operation::Action;
use crate::value::{Row, Value};

/// Handle to one table of a [`Database`].
///
/// Holds a schema snapshot taken when the handle was created; join
/// resolution runs against it. [`Table::refresh`] reloads it.
#[derive(Debug, Clone)]
pub struct Table {
    db: Database,
    schema: Arc<TableSchema>,
}

impl Table {
    pub(crate) fn load(db: Database, name: &str) -> Result<Self> {
        let schema = db.load_schema(name)?;
        Ok(Self {
            db,
            schema: Arc::new(schema),
        })
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Schema snapshot used for join resolution.
    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Reload the schema snapshot.
    pub fn refresh(&mut self) -> Result<()> {
        self.schema = Arc::new(self.db.load_schema(self.name())?);
        Ok(())
    }

    /// Insert one row and return its rowid (`None` when detached).
    pub fn add<I, K, V>(&self, values: I) -> Result<Option<i64>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.add_with(values, Completion::Default)
    }

    pub fn add_with<I, K, V>(&self, values: I, completion: Completion) -> Result<Option<i64>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let statement = self.insert_statement(values)?;
        Ok(self
            .db
            .execute(statement, Action::Write, completion)?
            .and_then(|outcome| outcome.last_insert_rowid()))
    }

    fn insert_statement<I, K, V>(&self, values: I) -> Result<Statement>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (column, value) in values {
            columns.push(quote_ident(&column.into())?);
            params.push(value.into());
        }
        if columns.is_empty() {
            return Err(Error::Input("you must provide values to be added".into()));
        }

        let slots = vec!["?"; params.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({slots})",
            quote_ident(self.name())?,
            columns.join(", ")
        );
        Ok(Statement::new(sql, params))
    }

    /// Query for the first matching row. An empty column list selects `*`.
    pub fn get(&self, columns: &[&str]) -> Select<First> {
        Select::new(self.clone(), columns)
    }

    /// Query for every matching row. An empty column list selects `*`.
    pub fn get_all(&self, columns: &[&str]) -> Select<All> {
        Select::new(self.clone(), columns)
    }

    /// Start an update; needs at least one predicate before `run()`.
    pub fn set<I, K>(&self, assignments: I) -> Update
    where
        I: IntoIterator<Item = (K, Assign)>,
        K: Into<String>,
    {
        Update::new(
            self.clone(),
            assignments.into_iter().map(|(k, a)| (k.into(), a)).collect(),
        )
    }

    /// Start a delete; needs at least one predicate before `run()`.
    pub fn remove(&self) -> Delete {
        Delete::new(self.clone())
    }

    pub fn exists(&self) -> Result<bool> {
        self.db.exists(self.name())
    }

    /// Rename the table, failing if the new name is taken.
    pub fn rename(&mut self, new_name: &str) -> Result<()> {
        if self.db.exists(new_name)? {
            return Err(Error::Table(format!("table '{new_name}' already exists")));
        }
        let sql = format!(
            "ALTER TABLE {} RENAME TO {}",
            quote_ident(self.name())?,
            quote_ident(new_name)?
        );
        self.write_ddl(sql)?;
        tracing::info!(from = self.name(), to = new_name, "Table renamed");

        self.schema = Arc::new(self.db.load_schema(new_name)?);
        Ok(())
    }

    /// Drop the table, consuming the handle.
    #[allow(clippy::should_implement_trait)]
    pub fn drop(self) -> Result<()> {
        self.db.drop_table(self.name())
    }

    /// Add a column. Primary, unique and foreign key columns cannot be added
    /// to an existing table.
    pub fn add_column(&mut self, name: &str, column: Column) -> Result<()> {
        self.refresh()?;
        if self.schema.has_column(name) {
            return Err(Error::Table(format!("column '{name}' already exists")));
        }
        self.write_ddl(add_column_sql(self.name(), name, &column)?)?;
        self.refresh()
    }

    /// Remove a column.
    pub fn remove_column(&mut self, name: &str) -> Result<()> {
        self.refresh()?;
        if !self.schema.has_column(name) {
            return Err(Error::Table(format!(
                "column '{name}' does not exist in table '{}'",
                self.name()
            )));
        }
        let sql = format!(
            "ALTER TABLE {} DROP COLUMN {}",
            quote_ident(self.name())?,
            quote_ident(name)?
        );
        self.write_ddl(sql)?;
        self.refresh()
    }

    fn write_ddl(&self, sql: String) -> Result<()> {
        self.db
            .execute(Statement::new(sql, Vec::new()), Action::Write, Completion::Await)?;
        Ok(())
    }

    /// Column names in declaration order.
    pub fn columns(&self) -> Result<Vec<String>> {
        let schema = self.db.load_schema(self.name())?;
        Ok(schema.columns.into_iter().map(|c| c.name).collect())
    }

    /// `(name, declared type)` pairs in declaration order.
    pub fn column_types(&self) -> Result<Vec<(String, String)>> {
        let schema = self.db.load_schema(self.name())?;
        Ok(schema
            .columns
            .into_iter()
            .map(|c| (c.name, c.declared_type))
            .collect())
    }

    /// Primary key columns in key order.
    pub fn primary_keys(&self) -> Result<Vec<String>> {
        let schema = self.db.load_schema(self.name())?;
        Ok(schema
            .primary_keys()
            .into_iter()
            .map(str::to_string)
            .collect())
    }

    pub fn foreign_keys(&self) -> Result<Vec<ForeignKey>> {
        Ok(self.db.load_schema(self.name())?.foreign_keys)
    }

    /// Number of rows in the table.
    pub fn rows(&self) -> Result<u64> {
        self.db.drain()?;
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(self.name())?);
        let rows: Vec<Row> = self.db.fetch(Statement::new(sql, Vec::new()), true)?;
        let count = rows
            .first()
            .and_then(|row| row.get(0))
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(u64::try_from(count).unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseOptions;

    fn users() -> Table {
        let db = Database::open_in_memory(DatabaseOptions::default()).unwrap();
        db.create(
            "users",
            [
                ("id", Column::autoincrement()),
                ("username", Column::text().unique().not_null()),
                ("tag", Column::with_default(0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_add_returns_increasing_ids() {
        let table = users();
        assert_eq!(table.add([("username", "a")]).unwrap(), Some(1));
        assert_eq!(table.add([("username", "b")]).unwrap(), Some(2));
        assert_eq!(table.rows().unwrap(), 2);
    }

    #[test]
    fn test_add_without_values() {
        let table = users();
        let empty: [(&str, Value); 0] = [];
        assert!(matches!(table.add(empty), Err(Error::Input(_))));
    }

    #[test]
    fn test_unique_violation_surfaces() {
        let table = users();
        table.add([("username", "a")]).unwrap();
        let err = table.add([("username", "a")]).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_reflection() {
        let table = users();
        assert_eq!(table.columns().unwrap(), vec!["id", "username", "tag"]);
        assert_eq!(
            table.column_types().unwrap(),
            vec![
                ("id".to_string(), "INTEGER".to_string()),
                ("username".to_string(), "TEXT".to_string()),
                ("tag".to_string(), "INTEGER".to_string()),
            ]
        );
        assert_eq!(table.primary_keys().unwrap(), vec!["id"]);
        assert!(table.foreign_keys().unwrap().is_empty());
        assert!(table.exists().unwrap());
    }

    #[test]
    fn test_rename() {
        let mut table = users();
        table.rename("members").unwrap();
        assert_eq!(table.name(), "members");
        assert!(!table.database().exists("users").unwrap());
        assert!(table.exists().unwrap());
    }

    #[test]
    fn test_rename_onto_existing_table() {
        let mut table = users();
        table
            .database()
            .create("other", [("id", Column::integer())])
            .unwrap();
        assert!(matches!(table.rename("other"), Err(Error::Table(_))));
    }

    #[test]
    fn test_add_and_remove_column() {
        let mut table = users();
        table.add_column("status", Column::text()).unwrap();
        assert!(table.schema().has_column("status"));
        assert!(matches!(
            table.add_column("status", Column::text()),
            Err(Error::Table(_))
        ));

        table.remove_column("status").unwrap();
        assert!(!table.schema().has_column("status"));
        assert!(matches!(table.remove_column("status"), Err(Error::Table(_))));
    }

    #[test]
    fn test_drop() {
        let table = users();
        let db = table.database().clone();
        table.drop().unwrap();
        assert!(!db.exists("users").unwrap());
    }
}
