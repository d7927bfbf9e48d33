//! Schema inspection commands.

use anyhow::Result;
use quarry::Database;
use serde::Serialize;

use crate::OutputFormat;

#[derive(Serialize)]
struct TablesOutput {
    tables: Vec<String>,
    total: usize,
}

pub fn tables(db: &Database, format: OutputFormat) -> Result<()> {
    let tables = db.tables()?;
    let output = TablesOutput {
        total: tables.len(),
        tables,
    };

    match format {
        OutputFormat::Text => {
            if output.tables.is_empty() {
                println!("No tables found.");
            } else {
                for table in &output.tables {
                    println!("{table}");
                }
                println!();
                println!("Total: {} table(s)", output.total);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
    }
    Ok(())
}

#[derive(Serialize)]
struct ColumnOutput {
    name: String,
    #[serde(rename = "type")]
    declared_type: String,
    not_null: bool,
    default: Option<String>,
    primary_key: bool,
}

pub fn columns(db: &Database, table: &str, format: OutputFormat) -> Result<()> {
    let table = db.table(table)?;
    let columns: Vec<ColumnOutput> = table
        .schema()
        .columns
        .iter()
        .map(|c| ColumnOutput {
            name: c.name.clone(),
            declared_type: c.declared_type.clone(),
            not_null: c.not_null,
            default: c.default.clone(),
            primary_key: c.primary_key > 0,
        })
        .collect();

    match format {
        OutputFormat::Text => {
            println!("{:<30} {:<10} {:>8} {:>4}  {}", "COLUMN", "TYPE", "NOT NULL", "PK", "DEFAULT");
            println!("{}", "-".repeat(68));
            for c in &columns {
                println!(
                    "{:<30} {:<10} {:>8} {:>4}  {}",
                    c.name,
                    c.declared_type,
                    if c.not_null { "yes" } else { "" },
                    if c.primary_key { "yes" } else { "" },
                    c.default.as_deref().unwrap_or("-")
                );
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&columns)?),
    }
    Ok(())
}

#[derive(Serialize)]
struct CountOutput<'a> {
    table: &'a str,
    rows: u64,
}

pub fn count(db: &Database, table: &str, format: OutputFormat) -> Result<()> {
    let rows = db.table(table)?.rows()?;
    match format {
        OutputFormat::Text => println!("{rows}"),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&CountOutput { table, rows })?);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ForeignKeyOutput {
    column: String,
    references: String,
}

#[derive(Serialize)]
struct KeysOutput {
    primary: Vec<String>,
    foreign: Vec<ForeignKeyOutput>,
}

pub fn keys(db: &Database, table: &str, format: OutputFormat) -> Result<()> {
    let table = db.table(table)?;
    let output = KeysOutput {
        primary: table.primary_keys()?,
        foreign: table
            .foreign_keys()?
            .into_iter()
            .map(|fk| ForeignKeyOutput {
                column: fk.from,
                references: format!("{}.{}", fk.table, fk.to),
            })
            .collect(),
    };

    match format {
        OutputFormat::Text => {
            println!("Primary: {}", output.primary.join(", "));
            for fk in &output.foreign {
                println!("Foreign: {} -> {}", fk.column, fk.references);
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
    }
    Ok(())
}
