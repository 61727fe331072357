//! Error types for the dactyl core library

use thiserror::Error;

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors that can occur in the core library
#[derive(Debug, Error)]
pub enum CoreError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry document could not be parsed
    #[error("Registry document error: {0}")]
    Document(#[from] serde_json::Error),

    /// Registry document version is not supported
    #[error("Unsupported registry document version: {0}")]
    UnsupportedVersion(u32),
}
