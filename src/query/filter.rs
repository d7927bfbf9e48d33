//! WHERE predicates.
//!
//! Predicates form a strict left-to-right chain: the first one is started
//! with `filter(column)`, every following one with `and(column)` or
//! `or(column)`. There is no grouping; SQLite's own precedence applies to a
//! mixed AND/OR chain.

use crate::error::{Error, Result};
use crate::value::Value;

use super::quote_column;

/// Boolean connector placed before a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connector {
    And,
    Or,
}

impl Connector {
    fn as_sql(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Eq,
    Neq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    In,
    NotIn,
    Like,
    NotLike,
    Is,
    IsNot,
}

impl Operator {
    fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::LtEq => "<=",
            Self::GtEq => ">=",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::Is => "IS",
            Self::IsNot => "IS NOT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Single(Value),
    List(Vec<Value>),
}

/// A single comparison in a WHERE chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    connector: Option<Connector>,
    column: String,
    op: Operator,
    operand: Operand,
}

/// Accumulated WHERE state of a builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Compile to ` WHERE ...` (or an empty string), appending bound values
    /// to `params`.
    pub(crate) fn compile(&self, params: &mut Vec<Value>) -> Result<String> {
        if self.predicates.is_empty() {
            return Ok(String::new());
        }

        let mut sql = String::from(" WHERE");
        for (i, predicate) in self.predicates.iter().enumerate() {
            match (i, predicate.connector) {
                (0, Some(connector)) => {
                    return Err(Error::Logic(format!(
                        "no predicate to combine with {} (start with filter)",
                        connector.as_sql()
                    )));
                }
                (0, None) => {}
                (_, None) => {
                    return Err(Error::Logic(
                        "already filtering; chain further predicates with and/or".into(),
                    ));
                }
                (_, Some(connector)) => {
                    sql.push(' ');
                    sql.push_str(connector.as_sql());
                }
            }

            sql.push(' ');
            sql.push_str(&quote_column(&predicate.column)?);
            sql.push(' ');
            sql.push_str(predicate.op.as_sql());

            match &predicate.operand {
                Operand::Single(value) => {
                    sql.push_str(" ?");
                    params.push(value.clone());
                }
                Operand::List(values) => {
                    let slots = vec!["?"; values.len()].join(", ");
                    sql.push_str(&format!(" ({slots})"));
                    params.extend(values.iter().cloned());
                }
            }
        }
        Ok(sql)
    }
}

/// Builders that carry a WHERE chain.
pub trait Filtered: Clone {
    fn filter_state(&self) -> &Filter;

    fn filter_state_mut(&mut self) -> &mut Filter;
}

/// A pending predicate on one column; completing it with an operator
/// returns the extended builder.
#[derive(Debug, Clone)]
#[must_use = "a condition does nothing until an operator such as eq() is applied"]
pub struct Condition<B> {
    base: B,
    column: String,
    connector: Option<Connector>,
}

impl<B: Filtered> Condition<B> {
    pub(crate) fn new(base: &B, column: &str, connector: Option<Connector>) -> Self {
        Self {
            base: base.clone(),
            column: column.to_string(),
            connector,
        }
    }

    fn push(self, op: Operator, operand: Operand) -> B {
        let mut base = self.base;
        base.filter_state_mut().predicates.push(Predicate {
            connector: self.connector,
            column: self.column,
            op,
            operand,
        });
        base
    }

    /// `column = value`; a NULL value compiles to `IS NULL`.
    pub fn eq(self, value: impl Into<Value>) -> B {
        match value.into() {
            Value::Null => self.push(Operator::Is, Operand::Single(Value::Null)),
            v => self.push(Operator::Eq, Operand::Single(v)),
        }
    }

    /// `column != value`; a NULL value compiles to `IS NOT NULL`.
    pub fn neq(self, value: impl Into<Value>) -> B {
        match value.into() {
            Value::Null => self.push(Operator::IsNot, Operand::Single(Value::Null)),
            v => self.push(Operator::Neq, Operand::Single(v)),
        }
    }

    pub fn lt(self, value: impl Into<Value>) -> B {
        self.push(Operator::Lt, Operand::Single(value.into()))
    }

    pub fn gt(self, value: impl Into<Value>) -> B {
        self.push(Operator::Gt, Operand::Single(value.into()))
    }

    pub fn lteq(self, value: impl Into<Value>) -> B {
        self.push(Operator::LtEq, Operand::Single(value.into()))
    }

    pub fn gteq(self, value: impl Into<Value>) -> B {
        self.push(Operator::GtEq, Operand::Single(value.into()))
    }

    pub fn is_in<I, V>(self, values: I) -> B
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(Operator::In, Operand::List(values))
    }

    pub fn not_in<I, V>(self, values: I) -> B
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.push(Operator::NotIn, Operand::List(values))
    }

    /// Raw LIKE pattern (`%` and `_` are wildcards).
    pub fn like(self, pattern: &str) -> B {
        self.push(Operator::Like, Operand::Single(pattern.into()))
    }

    pub fn not_like(self, pattern: &str) -> B {
        self.push(Operator::NotLike, Operand::Single(pattern.into()))
    }

    pub fn contains(self, text: &str) -> B {
        self.like(&format!("%{text}%"))
    }

    pub fn not_contains(self, text: &str) -> B {
        self.not_like(&format!("%{text}%"))
    }

    pub fn starts_with(self, text: &str) -> B {
        self.like(&format!("{text}%"))
    }

    pub fn not_starts_with(self, text: &str) -> B {
        self.not_like(&format!("{text}%"))
    }

    pub fn ends_with(self, text: &str) -> B {
        self.like(&format!("%{text}"))
    }

    pub fn not_ends_with(self, text: &str) -> B {
        self.not_like(&format!("%{text}"))
    }

    pub fn is_null(self) -> B {
        self.push(Operator::Is, Operand::Single(Value::Null))
    }

    pub fn is_not_null(self) -> B {
        self.push(Operator::IsNot, Operand::Single(Value::Null))
    }
}

/// Adds the `filter` / `and` / `or` entry points to a builder with a
/// `filter: Filter` field.
macro_rules! filter_methods {
    (impl<$($gen:ident: $bound:path),*> $builder:ty) => {
        impl<$($gen: $bound),*> $crate::query::filter::Filtered for $builder {
            fn filter_state(&self) -> &$crate::query::filter::Filter {
                &self.filter
            }

            fn filter_state_mut(&mut self) -> &mut $crate::query::filter::Filter {
                &mut self.filter
            }
        }

        impl<$($gen: $bound),*> $builder {
            /// Start the WHERE chain on `column`.
            pub fn filter(&self, column: &str) -> $crate::query::filter::Condition<Self> {
                $crate::query::filter::Condition::new(self, column, None)
            }

            /// Add a predicate that must also hold.
            pub fn and(&self, column: &str) -> $crate::query::filter::Condition<Self> {
                $crate::query::filter::Condition::new(
                    self,
                    column,
                    Some($crate::query::filter::Connector::And),
                )
            }

            /// Add a predicate that may hold instead.
            pub fn or(&self, column: &str) -> $crate::query::filter::Condition<Self> {
                $crate::query::filter::Condition::new(
                    self,
                    column,
                    Some($crate::query::filter::Connector::Or),
                )
            }
        }
    };
    ($builder:ty) => {
        $crate::query::filter::filter_methods!(impl<> $builder);
    };
}

pub(crate) use filter_methods;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct Harness {
        filter: Filter,
    }

    filter_methods!(Harness);

    fn compile(harness: &Harness) -> Result<(String, Vec<Value>)> {
        let mut params = Vec::new();
        let sql = harness.filter.compile(&mut params)?;
        Ok((sql, params))
    }

    #[test]
    fn test_empty_filter_compiles_to_nothing() {
        let (sql, params) = compile(&Harness::default()).unwrap();
        assert_eq!(sql, "");
        assert!(params.is_empty());
    }

    #[test]
    fn test_chain_left_to_right() {
        let harness = Harness::default()
            .filter("id")
            .lt(5)
            .and("name")
            .starts_with("us")
            .or("tag")
            .is_in([0, 1]);
        let (sql, params) = compile(&harness).unwrap();
        assert_eq!(
            sql,
            " WHERE \"id\" < ? AND \"name\" LIKE ? OR \"tag\" IN (?, ?)"
        );
        assert_eq!(
            params,
            vec![
                Value::Integer(5),
                Value::Text("us%".into()),
                Value::Integer(0),
                Value::Integer(1)
            ]
        );
    }

    #[test]
    fn test_null_comparisons() {
        let harness = Harness::default().filter("a").eq(Value::Null).and("b").is_not_null();
        let (sql, _) = compile(&harness).unwrap();
        assert_eq!(sql, " WHERE \"a\" IS ? AND \"b\" IS NOT ?");
    }

    #[test]
    fn test_pattern_helpers() {
        let harness = Harness::default()
            .filter("a")
            .contains("x")
            .and("b")
            .not_ends_with("y");
        let (_, params) = compile(&harness).unwrap();
        assert_eq!(params, vec![Value::from("%x%"), Value::from("%y")]);
    }

    #[test]
    fn test_second_filter_is_logic_error() {
        let harness = Harness::default().filter("a").eq(1).filter("b").eq(2);
        assert!(matches!(compile(&harness), Err(Error::Logic(_))));
    }

    #[test]
    fn test_leading_connector_is_logic_error() {
        let harness = Harness::default().and("a").eq(1);
        assert!(matches!(compile(&harness), Err(Error::Logic(_))));
    }

    #[test]
    fn test_condition_leaves_base_untouched() {
        let base = Harness::default().filter("a").eq(1);
        let derived = base.and("b").eq(2);
        assert_eq!(base.filter_state().len(), 1);
        assert_eq!(derived.filter_state().len(), 2);
    }
}
