//! DELETE builder behind `Table::remove`.

use crate::database::Completion;
use crate::error::{Error, Result};
use crate::storage::operation::Action;
use crate::table::Table;

use super::filter::{filter_methods, Filter};
use super::{quote_ident, Statement};

/// A DELETE on one table. Running it requires at least one predicate.
#[derive(Debug, Clone)]
#[must_use = "a delete does nothing until run() is called"]
pub struct Delete {
    table: Table,
    filter: Filter,
    completion: Completion,
}

filter_methods!(Delete);

impl Delete {
    pub(crate) fn new(table: Table) -> Self {
        Self {
            table,
            filter: Filter::default(),
            completion: Completion::Default,
        }
    }

    pub fn completion(&self, completion: Completion) -> Self {
        let mut next = self.clone();
        next.completion = completion;
        next
    }

    pub fn statement(&self) -> Result<Statement> {
        if self.filter.is_empty() {
            return Err(Error::Logic(
                "removing every row requires at least one filter".into(),
            ));
        }
        let mut params = Vec::new();
        let mut sql = format!("DELETE FROM {}", quote_ident(self.table.name())?);
        sql.push_str(&self.filter.compile(&mut params)?);
        Ok(Statement::new(sql, params))
    }

    /// Execute and return the number of removed rows (`None` when detached).
    pub fn run(&self) -> Result<Option<usize>> {
        Ok(self
            .table
            .database()
            .execute(self.statement()?, Action::Write, self.completion)?
            .map(|outcome| outcome.changes()))
    }

    pub async fn run_async(&self) -> Result<Option<usize>> {
        let statement = self.statement()?;
        Ok(self
            .table
            .database()
            .execute_async(statement, Action::Write, self.completion)
            .await?
            .map(|outcome| outcome.changes()))
    }
}
