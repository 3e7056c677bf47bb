//! Error types for stagegate

use thiserror::Error;

/// Result type alias for stagegate operations
pub type Result<T> = std::result::Result<T, GateError>;

/// Main error type for stagegate
#[derive(Error, Debug)]
pub enum GateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File is not valid UTF-8: {0}")]
    Decode(#[from] std::str::Utf8Error),

    #[error("Parse error: {0}")]
    Parse(String),
}
