//! ORDER BY / LIMIT state.

use crate::error::{Error, Result};

use super::quote_column;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

/// Single-column sort with an optional row limit.
///
/// Direction and limit are only meaningful once a sort column is set;
/// compiling them without one is a [`Error::Sort`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sort {
    column: Option<String>,
    order: Option<Order>,
    limit: Option<u64>,
}

impl Sort {
    pub(crate) fn by(&mut self, column: &str) {
        self.column = Some(column.to_string());
    }

    pub(crate) fn order(&mut self, order: Order) {
        self.order = Some(order);
    }

    pub(crate) fn limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub(crate) fn compile(&self) -> Result<String> {
        let Some(column) = &self.column else {
            if self.order.is_some() || self.limit.is_some() {
                return Err(Error::Sort(
                    "no sort column has been provided (use .sort first)".into(),
                ));
            }
            return Ok(String::new());
        };

        let direction = match self.order.unwrap_or_default() {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        };
        let mut sql = format!(" ORDER BY {} {direction}", quote_column(column)?);
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        Ok(sql)
    }
}
