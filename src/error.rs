//! Error taxonomy shared by every analysis module.

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Window, order, fraction or trial count outside its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Two tables meant to be joined or compared share no keys.
    #[error("Inputs share no row keys")]
    EmptyIntersection,

    /// Non-unique row keys or a column whose length does not match the table.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// An optional statistical capability was not supplied.
    #[error("Missing capability: {0}")]
    MissingDependency(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
