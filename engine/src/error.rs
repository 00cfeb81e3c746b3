//! FILENAME: engine/src/error.rs

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed rule, unknown base category, or an unusable definition.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A category appears more than once for one entity within a grouping.
    #[error(
        "Data integrity error: category '{category}' appears more than once for id {id} in '{grouping}'"
    )]
    DataIntegrity {
        id: String,
        grouping: String,
        category: String,
    },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid search pattern: {0}")]
    InvalidSearchPattern(String),

    #[error("Non-numeric value '{value}' in column '{column}' at row {row}")]
    NonNumeric {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Invalid date '{value}' in column '{column}' at row {row}")]
    InvalidDate {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Cache error: {0}")]
    Cache(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
