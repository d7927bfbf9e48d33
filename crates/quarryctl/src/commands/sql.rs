//! Raw statement commands.

use anyhow::Result;
use quarry::{Database, Value};
use serde::Serialize;
use serde_json::{Map, Value as Json};

use crate::OutputFormat;

/// Parse a command-line parameter into a bound value.
fn parse_param(raw: &str) -> Value {
    if raw.eq_ignore_ascii_case("null") {
        Value::Null
    } else if let Ok(i) = raw.parse::<i64>() {
        Value::Integer(i)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Real(f)
    } else {
        Value::Text(raw.to_string())
    }
}

fn parse_params(raw: &[String]) -> Vec<Value> {
    raw.iter().map(|p| parse_param(p)).collect()
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => s.clone(),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}

pub fn query(db: &Database, sql: &str, params: &[String], format: OutputFormat) -> Result<()> {
    let rows = db.read(sql, &parse_params(params))?;

    match format {
        OutputFormat::Text => {
            if let Some(first) = rows.first() {
                println!("{}", first.columns.join("\t"));
            }
            for row in &rows {
                let cells: Vec<String> = row.values.iter().map(display).collect();
                println!("{}", cells.join("\t"));
            }
            println!();
            println!("{} row(s)", rows.len());
        }
        OutputFormat::Json => {
            let mut objects = Vec::with_capacity(rows.len());
            for row in rows {
                let mut object = Map::new();
                for (column, value) in row.columns.into_iter().zip(row.values) {
                    object.insert(column, serde_json::to_value(value)?);
                }
                objects.push(Json::Object(object));
            }
            println!("{}", serde_json::to_string_pretty(&objects)?);
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ExecOutput {
    /// `None` when the write was detached.
    changes: Option<usize>,
}

pub fn exec(db: &Database, sql: &str, params: &[String], format: OutputFormat) -> Result<()> {
    let changes = db.write(sql, &parse_params(params))?;

    match format {
        OutputFormat::Text => match changes {
            Some(n) => println!("{n} row(s) changed"),
            None => println!("Queued."),
        },
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&ExecOutput { changes })?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_param() {
        assert_eq!(parse_param("NULL"), Value::Null);
        assert_eq!(parse_param("42"), Value::Integer(42));
        assert_eq!(parse_param("-1.5"), Value::Real(-1.5));
        assert_eq!(parse_param("alice"), Value::Text("alice".into()));
    }
}
