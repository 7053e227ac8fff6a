//! Error types for raggate

use thiserror::Error;

/// Result type alias using RaggateError
pub type Result<T> = std::result::Result<T, RaggateError>;

/// Error type alias for convenience
pub type Error = RaggateError;

/// Main error type for raggate
#[derive(Debug, Error)]
pub enum RaggateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl RaggateError {
    /// True when the client sent something unusable (maps to HTTP 400)
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}
