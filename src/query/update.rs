//! UPDATE builder behind `Table::set`.

use crate::database::Completion;
use crate::error::{Error, Result};
use crate::storage::operation::{Action, Outcome};
use crate::table::Table;
use crate::value::Value;

use super::filter::{filter_methods, Filter};
use super::{quote_ident, Statement};

/// Right-hand side of one `SET` assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Assign {
    /// `column = value`
    Value(Value),
    /// `column = column + value`
    Increment(Value),
    /// `column = column || text`
    Concat(String),
    /// `column = NULL`
    Null,
}

impl Assign {
    pub fn increment(by: impl Into<Value>) -> Self {
        Self::Increment(by.into())
    }

    pub fn concat(text: impl Into<String>) -> Self {
        Self::Concat(text.into())
    }

    fn compile(&self, column: &str, params: &mut Vec<Value>) -> String {
        match self {
            Self::Value(value) => {
                params.push(value.clone());
                format!("{column} = ?")
            }
            Self::Increment(by) => {
                params.push(by.clone());
                format!("{column} = {column} + ?")
            }
            Self::Concat(text) => {
                params.push(Value::Text(text.clone()));
                format!("{column} = {column} || ?")
            }
            Self::Null => format!("{column} = NULL"),
        }
    }
}

impl From<Value> for Assign {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

macro_rules! assign_from {
    ($($t:ty),* $(,)?) => {
        $(
            impl From<$t> for Assign {
                fn from(value: $t) -> Self {
                    Self::Value(value.into())
                }
            }
        )*
    };
}

assign_from!(i8, i16, i32, i64, u8, u16, u32, bool, f32, f64, &str, String, Vec<u8>);

/// An UPDATE on one table. Running it requires at least one predicate.
#[derive(Debug, Clone)]
#[must_use = "an update does nothing until run() is called"]
pub struct Update {
    table: Table,
    assignments: Vec<(String, Assign)>,
    filter: Filter,
    completion: Completion,
}

filter_methods!(Update);

impl Update {
    pub(crate) fn new(table: Table, assignments: Vec<(String, Assign)>) -> Self {
        Self {
            table,
            assignments,
            filter: Filter::default(),
            completion: Completion::Default,
        }
    }

    /// Override the database's default completion mode for this update.
    pub fn completion(&self, completion: Completion) -> Self {
        let mut next = self.clone();
        next.completion = completion;
        next
    }

    pub fn statement(&self) -> Result<Statement> {
        if self.assignments.is_empty() {
            return Err(Error::Input("you must provide values to be set".into()));
        }
        if self.filter.is_empty() {
            return Err(Error::Logic(
                "updating every row requires at least one filter".into(),
            ));
        }

        let mut params = Vec::new();
        let mut sets = Vec::with_capacity(self.assignments.len());
        for (column, assign) in &self.assignments {
            sets.push(assign.compile(&quote_ident(column)?, &mut params));
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            quote_ident(self.table.name())?,
            sets.join(", ")
        );
        sql.push_str(&self.filter.compile(&mut params)?);
        Ok(Statement::new(sql, params))
    }

    /// Execute and return the number of changed rows (`None` when detached).
    pub fn run(&self) -> Result<Option<usize>> {
        let outcome = self
            .table
            .database()
            .execute(self.statement()?, Action::Write, self.completion)?;
        Ok(outcome.map(|o: Outcome| o.changes()))
    }

    pub async fn run_async(&self) -> Result<Option<usize>> {
        let statement = self.statement()?;
        let outcome = self
            .table
            .database()
            .execute_async(statement, Action::Write, self.completion)
            .await?;
        Ok(outcome.map(|o| o.changes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseOptions;
    use crate::schema::Column;
    use crate::value::Fetched;
    use crate::Database;

    fn accounts() -> Table {
        let db = Database::open_in_memory(DatabaseOptions::default()).unwrap();
        let table = db
            .create(
                "accounts",
                [
                    ("id", Column::autoincrement()),
                    ("name", Column::text()),
                    ("balance", Column::with_default(0)),
                ],
            )
            .unwrap();
        table.add([("name", Value::from("ann")), ("balance", 10.into())]).unwrap();
        table.add([("name", Value::from("bob")), ("balance", 5.into())]).unwrap();
        table
    }

    fn balance(table: &Table, id: i64) -> Option<Fetched> {
        table.get(&["balance"]).filter("id").eq(id).run().unwrap()
    }

    #[test]
    fn test_statement_shape() {
        let statement = accounts()
            .set([
                ("name", Assign::concat("!")),
                ("balance", Assign::increment(3)),
            ])
            .filter("id")
            .eq(1)
            .statement()
            .unwrap();
        assert_eq!(
            statement.sql,
            "UPDATE \"accounts\" SET \"name\" = \"name\" || ?, \"balance\" = \"balance\" + ? WHERE \"id\" = ?"
        );
        assert_eq!(
            statement.params,
            vec![Value::Text("!".into()), Value::Integer(3), Value::Integer(1)]
        );
    }

    #[test]
    fn test_increment_changes_only_matching_rows() {
        let table = accounts();
        let changed = table
            .set([("balance", Assign::increment(-4))])
            .filter("name")
            .eq("ann")
            .run()
            .unwrap();
        assert_eq!(changed, Some(1));
        assert_eq!(balance(&table, 1), Some(Fetched::Value(Value::Integer(6))));
        assert_eq!(balance(&table, 2), Some(Fetched::Value(Value::Integer(5))));
    }

    #[test]
    fn test_set_null() {
        let table = accounts();
        table
            .set([("name", Assign::Null)])
            .filter("id")
            .eq(2)
            .run()
            .unwrap();
        let name = table.get(&["name"]).filter("id").eq(2).run().unwrap();
        assert_eq!(name, Some(Fetched::Value(Value::Null)));
    }

    #[test]
    fn test_update_requires_filter() {
        let err = accounts().set([("balance", Assign::from(0))]).run().unwrap_err();
        assert!(matches!(err, Error::Logic(_)));
    }

    #[test]
    fn test_update_requires_assignments() {
        let empty: [(&str, Assign); 0] = [];
        let err = accounts().set(empty).filter("id").eq(1).run().unwrap_err();
        assert!(matches!(err, Error::Input(_)));
    }
}
