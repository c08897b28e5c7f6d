//! Error types for argoqc
//!
//! Per-artifact failures are logged inside the sinks; these errors surface only
//! at listing time, per item (turned into `ItemOutcome::Failed`) or from the
//! lower-level building blocks.

use thiserror::Error;

/// Result type for argoqc operations
pub type QcResult<T> = std::result::Result<T, QcError>;

/// argoqc error type
#[derive(Debug, Error)]
pub enum QcError {
    /// Backend call failed (listing, markers, uploads, HTTP)
    #[error("Backend error: {0}")]
    Backend(String),

    /// The optical analysis could not produce measurements for an item
    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// Two pixel regions that must have equal dimensions do not
    #[error("Shape mismatch: {left_width}x{left_height} vs {right_width}x{right_height}")]
    ShapeMismatch {
        left_width: u32,
        left_height: u32,
        right_width: u32,
        right_height: u32,
    },

    /// Raster encoding failed
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// argoqc-common error
    #[error("Common error: {0}")]
    Common(#[from] argoqc_common::Error),
}

impl From<reqwest::Error> for QcError {
    fn from(err: reqwest::Error) -> Self {
        QcError::Backend(format!("HTTP request failed: {}", err))
    }
}

impl From<serde_json::Error> for QcError {
    fn from(err: serde_json::Error) -> Self {
        QcError::Analysis(format!("Invalid measurement document: {}", err))
    }
}
