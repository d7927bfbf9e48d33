//! JOIN resolution against declared foreign keys.

use crate::error::{JoinError, Result};
use crate::schema::{ForeignKey, TableSchema};

use super::quote_ident;

/// Kind of join emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    #[default]
    Left,
    Inner,
    Right,
    Full,
}

impl JoinKind {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Inner => "INNER",
            Self::Right => "RIGHT",
            Self::Full => "FULL",
        }
    }
}

/// A requested join, resolved when the statement is compiled.
///
/// - no columns: the owning table's single foreign key
/// - `left` only: the foreign key declared on `left`
/// - `left` and `right` (`table.column`): an explicit, undeclared relationship
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    kind: JoinKind,
    left: Option<String>,
    right: Option<String>,
}

impl Join {
    pub(crate) fn new(kind: JoinKind, left: Option<&str>, right: Option<&str>) -> Self {
        Self {
            kind,
            left: left.map(str::to_string),
            right: right.map(str::to_string),
        }
    }

    /// Resolve to `(referenced table, left column, right column)`.
    pub(crate) fn resolve(&self, schema: &TableSchema) -> Result<(String, String, String), JoinError> {
        let table = &schema.name;
        match (&self.left, &self.right) {
            (None, _) => match schema.foreign_keys.as_slice() {
                [] => Err(JoinError::NoForeignKey {
                    table: table.clone(),
                }),
                [fk] => through(fk),
                many => Err(JoinError::Ambiguous {
                    table: table.clone(),
                    candidates: many.iter().map(|fk| fk.from.clone()).collect(),
                }),
            },
            (Some(left), _) if !schema.has_column(left) => Err(JoinError::UnknownColumn {
                table: table.clone(),
                column: left.clone(),
            }),
            (Some(left), None) => schema
                .foreign_keys
                .iter()
                .find(|fk| &fk.from == left)
                .ok_or_else(|| JoinError::NotForeignKey {
                    table: table.clone(),
                    column: left.clone(),
                })
                .and_then(through),
            (Some(left), Some(right)) => match right.split_once('.') {
                Some((other, column)) if !other.is_empty() && !column.is_empty() => {
                    Ok((other.to_string(), left.clone(), column.to_string()))
                }
                _ => Err(JoinError::UnqualifiedRight(right.clone())),
            },
        }
    }

    /// Compile to ` KIND JOIN "other" ON "base"."left" = "other"."right"`.
    ///
    /// `lookup` returns the current schema of a table, or `None` if it does
    /// not exist. It is only consulted for explicit joins, whose right side
    /// is not backed by a declared foreign key.
    pub(crate) fn compile<F>(&self, schema: &TableSchema, lookup: F) -> Result<String>
    where
        F: FnOnce(&str) -> Result<Option<TableSchema>>,
    {
        let (other, left, right) = self.resolve(schema)?;
        if self.right.is_some() {
            let target = lookup(&other)?.ok_or_else(|| JoinError::UnknownTable(other.clone()))?;
            if !target.has_column(&right) {
                return Err(JoinError::UnknownColumn {
                    table: other,
                    column: right,
                }
                .into());
            }
        }

        let other = quote_ident(&other)?;
        Ok(format!(
            " {} JOIN {other} ON {}.{} = {other}.{}",
            self.kind.as_sql(),
            quote_ident(&schema.name)?,
            quote_ident(&left)?,
            quote_ident(&right)?
        ))
    }
}

fn through(fk: &ForeignKey) -> Result<(String, String, String), JoinError> {
    if fk.to.is_empty() {
        return Err(JoinError::UnresolvedReference {
            table: fk.table.clone(),
            column: fk.from.clone(),
        });
    }
    Ok((fk.table.clone(), fk.from.clone(), fk.to.clone()))
}
