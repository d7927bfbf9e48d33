//! quarryctl: Command-line interface for quarry databases.
//!
//! Lists tables and their schema, runs raw statements, and renames or drops
//! tables from the terminal.

mod commands;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quarry::{Database, DatabaseOptions};

/// Command-line interface for quarry databases.
#[derive(Parser)]
#[command(name = "quarryctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Database file (a `.db` extension is added when missing)
    #[arg(short, long, env = "QUARRY_DATABASE")]
    database: PathBuf,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    output: OutputFormat,

    #[command(flatten)]
    options: DatabaseOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List tables
    Tables,
    /// Show the columns of a table
    Columns {
        /// Table name
        table: String,
    },
    /// Count the rows of a table
    Count {
        /// Table name
        table: String,
    },
    /// Show primary and foreign keys of a table
    Keys {
        /// Table name
        table: String,
    },
    /// Run a raw read statement and print its rows
    Query {
        /// SQL text with `?` placeholders
        sql: String,
        /// Bound values, in order (integers, reals, `null`, otherwise text)
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
    /// Run a raw write statement
    Exec {
        /// SQL text with `?` placeholders
        sql: String,
        /// Bound values, in order (integers, reals, `null`, otherwise text)
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
    /// Rename a table
    Rename {
        /// Current table name
        table: String,
        /// New table name
        new_name: String,
    },
    /// Drop a table
    Drop {
        /// Table name
        table: String,
    },
}

fn main() -> Result<()> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let db = Database::open(&cli.database, cli.options)
        .with_context(|| format!("failed to open database: {}", cli.database.display()))?;

    match cli.command {
        Commands::Tables => commands::schema::tables(&db, cli.output)?,
        Commands::Columns { table } => commands::schema::columns(&db, &table, cli.output)?,
        Commands::Count { table } => commands::schema::count(&db, &table, cli.output)?,
        Commands::Keys { table } => commands::schema::keys(&db, &table, cli.output)?,
        Commands::Query { sql, params } => commands::sql::query(&db, &sql, &params, cli.output)?,
        Commands::Exec { sql, params } => commands::sql::exec(&db, &sql, &params, cli.output)?,
        Commands::Rename { table, new_name } => {
            commands::manage::rename(&db, &table, &new_name, cli.output)?;
        }
        Commands::Drop { table } => commands::manage::drop(&db, &table, cli.output)?,
    }

    db.close().context("failed to close database")?;
    Ok(())
}
