//! Error types for the dactyl service layer

use thiserror::Error;

/// Result type alias for service operations
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors that can occur in the service layer
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] dactyl_core::CoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for ServiceError {
    fn from(e: serde_json::Error) -> Self {
        ServiceError::Serialization(e.to_string())
    }
}
