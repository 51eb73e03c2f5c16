use std::io;
use thiserror::Error;

use crate::domain::DomainError;

/// IO-level errors for CSV reading and row parsing
#[derive(Error, Debug)]
pub enum IoError {
    #[error("CSV async parsing error: {0}")]
    CsvAsync(#[from] csv_async::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Insufficient columns: got {got}, need at least {need}")]
    InsufficientColumns { got: usize, need: usize },

    #[error("Invalid {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl IoError {
    /// Build an `InvalidField` error from a raw field value
    pub fn invalid(field: &'static str, value: &str) -> Self {
        Self::InvalidField {
            field,
            value: value.to_string(),
        }
    }
}
