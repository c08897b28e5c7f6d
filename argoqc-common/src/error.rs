//! Common error types for ArgoQC

use thiserror::Error;

/// Common result type for ArgoQC operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the ArgoQC crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed text input (config file, date token, CSV)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid user input or parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
