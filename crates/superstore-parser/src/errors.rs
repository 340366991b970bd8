use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

use crate::model::TextEncoding;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("input is not valid {encoding}: {message}")]
    Encoding {
        encoding: TextEncoding,
        message: String,
    },

    #[error("file did not contain a header row")]
    MissingHeader,

    #[error("required columns missing: {}", missing.join(", "))]
    MissingColumn { missing: Vec<&'static str> },

    #[error("CSV error: {source}")]
    Csv {
        #[from]
        source: csv::Error,
    },

    #[error("line {line_index} column '{column}' is not numeric: '{value}'")]
    InvalidNumber {
        line_index: usize,
        column: &'static str,
        value: String,
    },

    #[error("column '{column}' has type {found}, expected {expected}")]
    ColumnType {
        column: &'static str,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    Polars(#[from] PolarsError),
}
