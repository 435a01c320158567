use serde::Serialize;
use std::collections::BTreeMap;

use super::error::{CellProblem, MissingParameterError, SchemaError};
use super::types::{Metric, PARAMETER_COLUMNS, ParameterRow};

/// Output column holding each row's error messages.
pub const ERRORS_COLUMN: &str = "errors";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
    Empty,
}

pub type Record = BTreeMap<String, Cell>;

/// A rectangular-ish table of named cells. `columns` keeps first-seen order across all records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from records given as `(column, cell)` pairs. Column order follows the
    /// pairs' order, so ordered inputs keep their layout.
    pub fn from_records<R>(records: Vec<R>) -> Self
    where
        R: IntoIterator<Item = (String, Cell)>,
    {
        let mut table = Self::new();
        for record in records {
            table.push(record);
        }
        table
    }

    pub fn from_columns(columns: Vec<(String, Vec<Cell>)>) -> Result<Self, SchemaError> {
        let expected = columns.first().map(|(_, cells)| cells.len()).unwrap_or(0);
        for (name, cells) in &columns {
            if cells.len() != expected {
                return Err(SchemaError::RaggedColumn {
                    column: name.clone(),
                    expected,
                    found: cells.len(),
                });
            }
        }

        let mut records = vec![Record::new(); expected];
        let mut names = Vec::with_capacity(columns.len());
        for (name, cells) in columns {
            for (record, cell) in records.iter_mut().zip(cells) {
                record.insert(name.clone(), cell);
            }
            names.push(name);
        }
        Ok(Self {
            columns: names,
            rows: records,
        })
    }

    pub fn push<R: IntoIterator<Item = (String, Cell)>>(&mut self, fields: R) {
        let mut record = Record::new();
        for (name, cell) in fields {
            if !self.has_column(&name) {
                self.columns.push(name.clone());
            }
            record.insert(name, cell);
        }
        self.rows.push(record);
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Columns carried through to the output untouched. Parameters are written separately, and
    /// input columns named like a derived column or `errors` are replaced by the computed ones.
    pub fn passthrough_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| !PARAMETER_COLUMNS.contains(&c.as_str()))
            .filter(|c| Metric::from_column(c).is_none() && c.as_str() != ERRORS_COLUMN)
            .cloned()
            .collect()
    }

    pub fn validate_schema(&self) -> Result<(), SchemaError> {
        if self.is_empty() {
            return Err(SchemaError::NoRows);
        }
        for column in PARAMETER_COLUMNS {
            if !self.has_column(column) {
                return Err(SchemaError::MissingColumn(column));
            }
        }
        Ok(())
    }
}

pub fn parameter_row(index: usize, record: &Record) -> Result<ParameterRow, MissingParameterError> {
    ParameterRow::from_lookup(|column| {
        let problem = match record.get(column) {
            Some(Cell::Number(value)) => return Ok(*value),
            Some(Cell::Text(_)) => CellProblem::NonNumeric,
            Some(Cell::Empty) => CellProblem::Empty,
            None => CellProblem::Absent,
        };
        Err(MissingParameterError {
            row: index,
            column,
            found: problem,
        })
    })
}
