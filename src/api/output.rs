use serde::ser::{Serialize, SerializeMap, Serializer};

pub use crate::core::ERRORS_COLUMN;
use crate::core::{AugmentedRow, AugmentedTable, Metric, PARAMETER_COLUMNS};

/// Serializes as a list of records. Keys are written in output order: pass-through columns,
/// parameters, derived metrics, then the row's error messages.
pub struct OutputTable<'a> {
    table: &'a AugmentedTable,
}

impl<'a> OutputTable<'a> {
    pub fn new(table: &'a AugmentedTable) -> Self {
        Self { table }
    }
}

impl Serialize for OutputTable<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.table.rows.iter().map(|row| OutputRow {
            row,
            passthrough: &self.table.passthrough_columns,
        }))
    }
}

struct OutputRow<'a> {
    row: &'a AugmentedRow,
    passthrough: &'a [String],
}

impl Serialize for OutputRow<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(
            self.passthrough.len() + PARAMETER_COLUMNS.len() + Metric::COUNT + 1,
        ))?;
        let source = &self.row.source;
        for column in self.passthrough {
            map.serialize_entry(column, &source.get(column))?;
        }
        for column in PARAMETER_COLUMNS {
            map.serialize_entry(column, &source.get(column))?;
        }
        for metric in Metric::ORDER {
            map.serialize_entry(metric.column(), &self.row.metric(metric))?;
        }
        map.serialize_entry(ERRORS_COLUMN, &self.row.error_messages())?;
        map.end()
    }
}

pub fn to_json(table: &AugmentedTable, pretty: bool) -> serde_json::Result<String> {
    let output = OutputTable::new(table);
    if pretty {
        serde_json::to_string_pretty(&output)
    } else {
        serde_json::to_string(&output)
    }
}
