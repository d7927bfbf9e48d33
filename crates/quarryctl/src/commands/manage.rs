//! Table management commands.

use anyhow::{Context, Result};
use quarry::Database;
use serde::Serialize;

use crate::OutputFormat;

#[derive(Serialize)]
struct RenameOutput<'a> {
    from: &'a str,
    to: &'a str,
}

pub fn rename(db: &Database, table: &str, new_name: &str, format: OutputFormat) -> Result<()> {
    let mut handle = db.table(table)?;
    handle
        .rename(new_name)
        .with_context(|| format!("failed to rename '{table}'"))?;

    let output = RenameOutput { from: table, to: new_name };
    match format {
        OutputFormat::Text => println!("Renamed {} -> {}", output.from, output.to),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
    }
    Ok(())
}

#[derive(Serialize)]
struct DropOutput<'a> {
    dropped: &'a str,
}

pub fn drop(db: &Database, table: &str, format: OutputFormat) -> Result<()> {
    db.table(table)?
        .drop()
        .with_context(|| format!("failed to drop '{table}'"))?;

    match format {
        OutputFormat::Text => println!("Dropped {table}"),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&DropOutput { dropped: table })?);
        }
    }
    Ok(())
}
