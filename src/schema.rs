//! Column descriptors, DDL rendering and schema snapshots.
//!
//! A [`Column`] describes a column to create; [`TableSchema`] is what
//! SQLite reports back for an existing table and is what join resolution
//! runs against.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::query::quote_ident;
use crate::value::Value;

/// Declared storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
    Blob,
}

impl SqlType {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Blob => "BLOB",
        }
    }

    /// Map a declared type reported by SQLite, using its affinity rules.
    pub fn from_declared(declared: &str) -> Option<Self> {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            Some(Self::Integer)
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Some(Self::Text)
        } else if upper.contains("BLOB") || upper.is_empty() {
            Some(Self::Blob)
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Some(Self::Real)
        } else {
            None
        }
    }

    fn of_value(value: &Value) -> Self {
        match value {
            Value::Integer(_) => Self::Integer,
            Value::Real(_) => Self::Real,
            Value::Blob(_) => Self::Blob,
            Value::Text(_) | Value::Null => Self::Text,
        }
    }
}

/// Target of a foreign key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub table: String,
    /// Referenced column; resolved to the table's single primary key when absent.
    pub column: Option<String>,
}

/// Descriptor of a column to create.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    ty: SqlType,
    primary: bool,
    autoincrement: bool,
    unique: bool,
    not_null: bool,
    default: Option<Value>,
    references: Option<Reference>,
}

impl Column {
    /// Nullable column of the given type.
    pub fn new(ty: SqlType) -> Self {
        Self {
            ty,
            primary: false,
            autoincrement: false,
            unique: false,
            not_null: false,
            default: None,
            references: None,
        }
    }

    pub fn text() -> Self {
        Self::new(SqlType::Text)
    }

    pub fn integer() -> Self {
        Self::new(SqlType::Integer)
    }

    pub fn real() -> Self {
        Self::new(SqlType::Real)
    }

    pub fn blob() -> Self {
        Self::new(SqlType::Blob)
    }

    /// INTEGER primary key with AUTOINCREMENT.
    pub fn autoincrement() -> Self {
        Self {
            primary: true,
            autoincrement: true,
            ..Self::integer()
        }
    }

    /// Column with a default value; the type follows the value.
    pub fn with_default(value: impl Into<Value>) -> Self {
        let value = value.into();
        Self {
            default: Some(value.clone()),
            ..Self::new(SqlType::of_value(&value))
        }
    }

    /// NOT NULL reference to `table`'s single primary key. The column type is
    /// copied from the referenced column when the table is created.
    pub fn foreign(table: &str) -> Self {
        Self {
            not_null: true,
            references: Some(Reference {
                table: table.to_string(),
                column: None,
            }),
            ..Self::integer()
        }
    }

    /// Name the referenced column of a foreign key explicitly.
    pub fn references_column(mut self, column: &str) -> Self {
        if let Some(reference) = &mut self.references {
            reference.column = Some(column.to_string());
        }
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn sql_type(&self) -> SqlType {
        self.ty
    }

    pub fn is_primary(&self) -> bool {
        self.primary
    }

    pub fn is_autoincrement(&self) -> bool {
        self.autoincrement
    }

    pub fn references(&self) -> Option<&Reference> {
        self.references.as_ref()
    }

    /// Fill in the referenced column and copy its type.
    pub(crate) fn resolve_reference(&mut self, column: String, ty: SqlType) {
        if let Some(reference) = &mut self.references {
            reference.column = Some(column);
            self.ty = ty;
        }
    }

    fn definition(&self, name: &str) -> Result<String> {
        let mut sql = format!("{} {}", quote_ident(name)?, self.ty.as_sql());
        if self.autoincrement {
            sql.push_str(" NOT NULL PRIMARY KEY AUTOINCREMENT");
        } else if self.primary || self.not_null {
            sql.push_str(" NOT NULL");
        }
        if self.unique {
            sql.push_str(" UNIQUE");
        }
        if let Some(default) = &self.default {
            if matches!(default, Value::Real(v) if !v.is_finite()) {
                return Err(Error::Input(format!(
                    "default for column '{name}' must be a finite number"
                )));
            }
            sql.push_str(" DEFAULT ");
            sql.push_str(&default.to_sql_literal());
        }
        if let Some(reference) = &self.references {
            let column = reference.column.as_deref().ok_or_else(|| {
                Error::Schema(format!(
                    "foreign key to '{}' has no referenced column",
                    reference.table
                ))
            })?;
            sql.push_str(&format!(
                " REFERENCES {}({})",
                quote_ident(&reference.table)?,
                quote_ident(column)?
            ));
        }
        Ok(sql)
    }
}

/// Check table-level invariants of a column set.
pub(crate) fn validate_columns(columns: &[(String, Column)]) -> Result<()> {
    if columns.is_empty() {
        return Err(Error::Input("a table needs at least one column".into()));
    }

    let mut seen = HashSet::new();
    for (name, column) in columns {
        if !seen.insert(name.as_str()) {
            return Err(Error::Input(format!("column '{name}' is declared twice")));
        }
        if column.autoincrement && column.ty != SqlType::Integer {
            return Err(Error::Schema(format!(
                "autoincrementing primary key '{name}' must be INTEGER"
            )));
        }
    }

    let autoincrements = columns.iter().filter(|(_, c)| c.autoincrement).count();
    let primaries = columns.iter().filter(|(_, c)| c.primary).count();
    if autoincrements > 1 {
        return Err(Error::Schema(
            "a table can have at most one autoincrementing primary key".into(),
        ));
    }
    if autoincrements == 1 && primaries > 1 {
        return Err(Error::Schema(
            "cannot autoincrement a primary key alongside other primary keys; use unique for the others"
                .into(),
        ));
    }
    Ok(())
}

/// `CREATE TABLE IF NOT EXISTS` for validated, reference-resolved columns.
pub(crate) fn create_table_sql(table: &str, columns: &[(String, Column)]) -> Result<String> {
    validate_columns(columns)?;

    let mut lines = columns
        .iter()
        .map(|(name, column)| column.definition(name))
        .collect::<Result<Vec<_>>>()?;

    let autoincrement = columns.iter().any(|(_, c)| c.autoincrement);
    let primaries: Vec<&str> = columns
        .iter()
        .filter(|(_, c)| c.primary)
        .map(|(name, _)| name.as_str())
        .collect();
    if !autoincrement && !primaries.is_empty() {
        let keys = primaries
            .iter()
            .map(|name| quote_ident(name))
            .collect::<Result<Vec<_>>>()?;
        lines.push(format!("PRIMARY KEY ({})", keys.join(", ")));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        quote_ident(table)?,
        lines.join(", ")
    ))
}

/// `ALTER TABLE ... ADD COLUMN`, rejecting constraints SQLite cannot add.
pub(crate) fn add_column_sql(table: &str, name: &str, column: &Column) -> Result<String> {
    if column.primary || column.autoincrement {
        return Err(Error::Schema("cannot add a primary key column to an existing table".into()));
    }
    if column.unique {
        return Err(Error::Schema("cannot add a unique column to an existing table".into()));
    }
    if column.references.is_some() {
        return Err(Error::Schema("cannot add a foreign key column to an existing table".into()));
    }
    if column.not_null && column.default.as_ref().map_or(true, Value::is_null) {
        return Err(Error::Schema(
            "a NOT NULL column added to an existing table needs a non-null default".into(),
        ));
    }
    Ok(format!(
        "ALTER TABLE {} ADD COLUMN {}",
        quote_ident(table)?,
        column.definition(name)?
    ))
}

/// A column as reported by `pragma_table_info`.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub not_null: bool,
    pub default: Option<String>,
    /// 1-based position in the primary key, 0 if not part of it.
    pub primary_key: u32,
}

/// A foreign key as reported by `pragma_foreign_key_list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    /// Referenced table.
    pub table: String,
    /// Column in the owning table.
    pub from: String,
    /// Referenced column.
    pub to: String,
}

/// Snapshot of an existing table's structure.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key columns in key order.
    pub fn primary_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&ColumnInfo> = self.columns.iter().filter(|c| c.primary_key > 0).collect();
        keys.sort_by_key(|c| c.primary_key);
        keys.into_iter().map(|c| c.name.as_str()).collect()
    }
}
