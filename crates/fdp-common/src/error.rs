//! Error types for FDP

use thiserror::Error;

/// Result type alias for FDP operations
pub type Result<T> = std::result::Result<T, FdpError>;

/// Main error type for FDP
#[derive(Error, Debug)]
pub enum FdpError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Unknown data source: {0}")]
    UnknownSource(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}
