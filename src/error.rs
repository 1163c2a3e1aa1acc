use thiserror::Error;

use crate::validation::{format_violations, Violation};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    #[error("Unknown sheet '{sheet}' (available: {})", available.join(", "))]
    UnknownSheet { sheet: String, available: Vec<String> },

    #[error("Unsupported source file: {0}")]
    UnsupportedSource(String),

    #[error("Supplier id is empty")]
    MissingSupplierId,

    #[error("Invalid supplier id: {0:?}")]
    InvalidSupplierId(String),

    #[error("Validation failed: {}", format_violations(.0))]
    Invalid(Vec<Violation>),
}

pub type Result<T> = std::result::Result<T, SyncError>;
