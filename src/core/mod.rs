mod engine;
mod error;
pub mod formulas;
mod table;
mod types;

pub use engine::{AugmentedRow, AugmentedTable, evaluate_row, run_pipeline};
pub use error::{CellProblem, DomainError, MissingParameterError, SchemaError};
pub use table::{Cell, ERRORS_COLUMN, Record, Table, parameter_row};
pub use types::{
    DerivedMetrics, Metric, MetricIssue, PARAMETER_COLUMNS, ParameterRow, RowOutcome, Unavailable,
};
