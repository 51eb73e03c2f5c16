use std::io;
use thiserror::Error;

use crate::config::ConfigError;
use crate::service::ServiceError;
use crate::storage::StorageError;

/// Top-level application errors unifying all layer errors
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Service(#[from] ServiceError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streaming::PipelineError;

    #[test]
    fn error_display_formats_correctly() {
        assert_eq!(
            AppError::FileNotFound("input.csv".to_string()).to_string(),
            "File not found: input.csv"
        );
        assert_eq!(
            AppError::InvalidArguments("unknown command".to_string()).to_string(),
            "Invalid arguments: unknown command"
        );
    }

    #[test]
    fn io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let app_err = AppError::from(io_err);

        match app_err {
            AppError::Io(_) => {}
            _ => panic!("Expected Io error variant"),
        }
    }

    #[test]
    fn config_error_conversion() {
        let app_err = AppError::from(ConfigError::Invalid("bad".to_string()));
        assert_eq!(app_err.to_string(), "Configuration error: Invalid configuration: bad");
    }

    #[test]
    fn service_error_passes_message_through() {
        let app_err = AppError::from(ServiceError::from(PipelineError::Cancelled));

        match &app_err {
            AppError::Service(err) => assert!(err.is_cancelled()),
            _ => panic!("Expected Service error variant"),
        }
        assert_eq!(app_err.to_string(), "Ingest failed: Ingest run was cancelled");
    }
}
