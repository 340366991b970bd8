// crates/superstore-core/src/error.rs

use std::path::PathBuf;

use polars::prelude::PolarsError;
use superstore_parser::LoadError;
use thiserror::Error;

/// A single aggregate could not be computed. Callers report it as
/// unavailable and carry on with the remaining aggregates.
#[derive(Error, Debug)]
pub enum ComputationError {
    #[error("polars operation failed: {0}")]
    Polars(#[from] PolarsError),

    #[error("need at least {required} observations, found {found}")]
    TooFewObservations { required: usize, found: usize },

    #[error("series is degenerate: {0}")]
    DegenerateSeries(String),

    #[error("non-finite value in {0}")]
    NonFinite(&'static str),
}

/// A chart or export could not be produced.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error("no data to plot for '{0}'")]
    NoData(String),

    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("spreadsheet export failed: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("failed to load transactions: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("report output failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReportError>;

pub type ComputationResult<T> = std::result::Result<T, ComputationError>;
