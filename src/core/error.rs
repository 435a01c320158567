use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("'{column}' is undefined: denominator {denominator} is zero")]
    ZeroDenominator {
        column: &'static str,
        denominator: &'static str,
    },
    #[error("'{column}' evaluated to a non-finite value ({value})")]
    NonFinite { column: &'static str, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("row {row}: parameter '{column}' is {found}")]
pub struct MissingParameterError {
    pub row: usize,
    pub column: &'static str,
    pub found: CellProblem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellProblem {
    Absent,
    Empty,
    NonNumeric,
}

impl std::fmt::Display for CellProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CellProblem::Absent => f.write_str("absent"),
            CellProblem::Empty => f.write_str("empty"),
            CellProblem::NonNumeric => f.write_str("not numeric"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("input table has no rows")]
    NoRows,
    #[error("input table is missing required column '{0}'")]
    MissingColumn(&'static str),
    #[error("column '{column}' has {found} values, expected {expected}")]
    RaggedColumn {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("{0}")]
    Shape(String),
}
