//! SELECT builder behind `Table::get` and `Table::get_all`.

use std::marker::PhantomData;

use crate::error::Result;
use crate::table::Table;
use crate::value::{Fetched, Row};

use super::filter::{filter_methods, Filter};
use super::join::{Join, JoinKind};
use super::sort::{Order, Sort};
use super::{quote_column, quote_ident, Statement};

/// How many rows a [`Select`] returns and in what shape.
pub trait FetchMode: Clone + Send + Sync + 'static {
    type Output;

    /// Stop reading after the first row.
    const FIRST_ONLY: bool;

    fn collect(rows: Vec<Row>, unwrap: bool) -> Self::Output;
}

/// The first matching row.
#[derive(Debug, Clone, Copy)]
pub struct First;

/// Every matching row.
#[derive(Debug, Clone, Copy)]
pub struct All;

fn shape(row: Row, unwrap: bool) -> Fetched {
    if unwrap {
        Fetched::Value(row.into_first())
    } else {
        Fetched::Row(row)
    }
}

impl FetchMode for First {
    type Output = Option<Fetched>;
    const FIRST_ONLY: bool = true;

    fn collect(rows: Vec<Row>, unwrap: bool) -> Self::Output {
        rows.into_iter().next().map(|row| shape(row, unwrap))
    }
}

impl FetchMode for All {
    type Output = Vec<Fetched>;
    const FIRST_ONLY: bool = false;

    fn collect(rows: Vec<Row>, unwrap: bool) -> Self::Output {
        rows.into_iter().map(|row| shape(row, unwrap)).collect()
    }
}

/// A SELECT on one table with optional joins, predicates and sort.
#[derive(Debug, Clone)]
#[must_use = "a query does nothing until run() is called"]
pub struct Select<M: FetchMode> {
    table: Table,
    columns: Vec<String>,
    joins: Vec<Join>,
    filter: Filter,
    sort: Sort,
    mode: PhantomData<M>,
}

filter_methods!(impl<M: FetchMode> Select<M>);

impl<M: FetchMode> Select<M> {
    pub(crate) fn new(table: Table, columns: &[&str]) -> Self {
        Self {
            table,
            columns: columns.iter().map(|c| (*c).to_string()).collect(),
            joins: Vec::new(),
            filter: Filter::default(),
            sort: Sort::default(),
            mode: PhantomData,
        }
    }

    /// Exactly one named column was requested, so results are bare values.
    fn unwraps(&self) -> bool {
        match self.columns.as_slice() {
            [column] => column != "*" && !column.ends_with(".*"),
            _ => false,
        }
    }

    /// Join through a declared foreign key.
    ///
    /// With neither column given, the table must have exactly one foreign
    /// key. With only `left`, it must be a foreign key column. With both,
    /// `right` is `table.column` and need not be declared.
    pub fn join_with(&self, kind: JoinKind, left: Option<&str>, right: Option<&str>) -> Self {
        let mut next = self.clone();
        next.joins.push(Join::new(kind, left, right));
        next
    }

    /// LEFT JOIN through the table's only foreign key.
    pub fn join(&self) -> Self {
        self.join_with(JoinKind::Left, None, None)
    }

    /// LEFT JOIN through the foreign key declared on `left`.
    pub fn join_on(&self, left: &str) -> Self {
        self.join_with(JoinKind::Left, Some(left), None)
    }

    /// LEFT JOIN on `left = right`, where `right` is `table.column`.
    pub fn join_using(&self, left: &str, right: &str) -> Self {
        self.join_with(JoinKind::Left, Some(left), Some(right))
    }

    pub fn inner_join(&self) -> Self {
        self.join_with(JoinKind::Inner, None, None)
    }

    pub fn right_join(&self) -> Self {
        self.join_with(JoinKind::Right, None, None)
    }

    pub fn full_join(&self) -> Self {
        self.join_with(JoinKind::Full, None, None)
    }

    /// Sort by one column, ascending unless `desc()` follows.
    pub fn sort(&self, column: &str) -> Self {
        let mut next = self.clone();
        next.sort.by(column);
        next
    }

    pub fn asc(&self) -> Self {
        let mut next = self.clone();
        next.sort.order(Order::Asc);
        next
    }

    pub fn desc(&self) -> Self {
        let mut next = self.clone();
        next.sort.order(Order::Desc);
        next
    }

    /// Return at most `limit` rows; requires a sort column.
    pub fn limit(&self, limit: u64) -> Self {
        let mut next = self.clone();
        next.sort.limit(limit);
        next
    }

    /// Compile without executing.
    pub fn statement(&self) -> Result<Statement> {
        let columns = if self.columns.is_empty() {
            "*".to_string()
        } else {
            self.columns
                .iter()
                .map(|c| quote_column(c))
                .collect::<Result<Vec<_>>>()?
                .join(", ")
        };

        let mut sql = format!("SELECT {columns} FROM {}", quote_ident(self.table.name())?);
        let db = self.table.database();
        for join in &self.joins {
            sql.push_str(&join.compile(self.table.schema(), |name| db.find_schema(name))?);
        }

        let mut params = Vec::new();
        sql.push_str(&self.filter.compile(&mut params)?);
        sql.push_str(&self.sort.compile()?);
        Ok(Statement::new(sql, params))
    }

    /// Execute against the current data.
    pub fn run(&self) -> Result<M::Output> {
        let rows = self.table.database().fetch(self.statement()?, M::FIRST_ONLY)?;
        Ok(M::collect(rows, self.unwraps()))
    }

    pub async fn run_async(&self) -> Result<M::Output> {
        let statement = self.statement()?;
        let rows = self
            .table
            .database()
            .fetch_async(statement, M::FIRST_ONLY)
            .await?;
        Ok(M::collect(rows, self.unwraps()))
    }
}

#[cfg(test)]
mod tests {
    use crate::config::DatabaseOptions;
    use crate::error::{Error, JoinError};
    use crate::schema::Column;
    use crate::value::{Fetched, Value};
    use crate::{Database, Table};

    fn users() -> Table {
        let db = Database::open_in_memory(DatabaseOptions::default()).unwrap();
        let users = db
            .create(
                "users",
                [
                    ("id", Column::autoincrement()),
                    ("username", Column::text().unique().not_null()),
                    ("tag", Column::with_default(0)),
                ],
            )
            .unwrap();
        users.add([("username", "a")]).unwrap();
        users.add([("username", "b")]).unwrap();
        users
    }

    #[test]
    fn test_statement_shape() {
        let statement = users()
            .get_all(&["username"])
            .filter("id")
            .gt(0)
            .sort("username")
            .desc()
            .limit(1)
            .statement()
            .unwrap();
        assert_eq!(
            statement.sql,
            "SELECT \"username\" FROM \"users\" WHERE \"id\" > ? ORDER BY \"username\" DESC LIMIT 1"
        );
        assert_eq!(statement.params, vec![Value::Integer(0)]);
    }

    #[test]
    fn test_single_column_get_unwraps() {
        let name = users().get(&["username"]).filter("id").eq(2).run().unwrap();
        assert_eq!(name, Some(Fetched::Value(Value::Text("b".into()))));
    }

    #[test]
    fn test_star_get_returns_row() {
        let row = users().get(&[]).filter("id").eq(1).run().unwrap().unwrap();
        let row = row.as_row().unwrap();
        assert_eq!(row.columns, vec!["id", "username", "tag"]);
        assert_eq!(row.by_name("tag"), Some(&Value::Integer(0)));
    }

    #[test]
    fn test_get_without_match() {
        assert_eq!(users().get(&["id"]).filter("id").eq(9).run().unwrap(), None);
    }

    #[test]
    fn test_join_without_foreign_key() {
        let err = users().get_all(&[]).join().run().unwrap_err();
        assert!(matches!(err, Error::Join(JoinError::NoForeignKey { .. })));
    }

    #[test]
    fn test_desc_without_sort() {
        assert!(matches!(users().get_all(&[]).desc().run(), Err(Error::Sort(_))));
    }
}
