use clap::ValueEnum;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::{Cell, SchemaError, Table};

pub const TOML_ROWS_KEY: &str = "scenario";

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum InputFormat {
    Json,
    Toml,
}

impl InputFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("json") => Ok(InputFormat::Json),
            Some("toml") => Ok(InputFormat::Toml),
            _ => Err(LoadError::UnknownFormat(path.to_path_buf())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid TOML table: {0}")]
    Toml(#[from] toml::de::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("cannot infer the table format of {}; pass --format", .0.display())]
    UnknownFormat(PathBuf),
}

pub fn load_table(path: &Path, format: InputFormat) -> Result<Table, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match format {
        InputFormat::Json => table_from_json(&text),
        InputFormat::Toml => table_from_toml(&text),
    }
}

/// Accepts either a list of records or a dataframe-style object of equal-length columns.
pub fn table_from_json(text: &str) -> Result<Table, LoadError> {
    match serde_json::from_str::<Value>(text)? {
        Value::Array(items) => {
            let mut records = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let Value::Object(fields) = item else {
                    return Err(shape_error(format!("row {index} is not a JSON object")));
                };
                records.push(
                    fields
                        .into_iter()
                        .map(|(name, value)| (name, json_cell(value)))
                        .collect::<Vec<_>>(),
                );
            }
            Ok(Table::from_records(records))
        }
        Value::Object(columns) => {
            let mut parsed = Vec::with_capacity(columns.len());
            for (name, values) in columns {
                let Value::Array(values) = values else {
                    return Err(shape_error(format!("column '{name}' is not a JSON array")));
                };
                parsed.push((name, values.into_iter().map(json_cell).collect()));
            }
            Ok(Table::from_columns(parsed)?)
        }
        _ => Err(shape_error(
            "expected an array of records or an object of columns".to_string(),
        )),
    }
}

pub fn table_from_toml(text: &str) -> Result<Table, LoadError> {
    let mut document: toml::Table = toml::from_str(text)?;
    let Some(rows) = document.remove(TOML_ROWS_KEY) else {
        return Err(shape_error(format!(
            "expected [[{TOML_ROWS_KEY}]] tables, none found"
        )));
    };
    let toml::Value::Array(rows) = rows else {
        return Err(shape_error(format!(
            "'{TOML_ROWS_KEY}' must be an array of tables"
        )));
    };

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let toml::Value::Table(fields) = row else {
            return Err(shape_error(format!("{TOML_ROWS_KEY} {index} is not a table")));
        };
        records.push(
            fields
                .into_iter()
                .map(|(name, value)| (name, toml_cell(value)))
                .collect::<Vec<_>>(),
        );
    }
    Ok(Table::from_records(records))
}

fn shape_error(message: String) -> LoadError {
    LoadError::Schema(SchemaError::Shape(message))
}

fn json_cell(value: Value) -> Cell {
    match value {
        Value::Number(number) => match number.as_f64() {
            Some(value) => Cell::Number(value),
            None => Cell::Text(number.to_string()),
        },
        Value::String(text) => Cell::Text(text),
        Value::Null => Cell::Empty,
        other => Cell::Text(other.to_string()),
    }
}

fn toml_cell(value: toml::Value) -> Cell {
    match value {
        toml::Value::Float(value) => Cell::Number(value),
        toml::Value::Integer(value) => Cell::Number(value as f64),
        toml::Value::String(text) => Cell::Text(text),
        other => Cell::Text(other.to_string()),
    }
}
