//! Error types for the previsit core

use thiserror::Error;

/// Result type alias for previsit core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Main error type for the previsit core
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream model call failed (text generation or speech synthesis)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Interview session lifecycle errors
    #[error("Session error: {0}")]
    Session(String),

    /// Cache snapshot export/import errors
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Patient/symptom fixture errors
    #[error("Fixture error: {0}")]
    Fixture(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(String),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl CoreError {
    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a new upstream model error
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Create a new session error
    pub fn session(message: impl Into<String>) -> Self {
        Self::Session(message.into())
    }

    /// Create a new snapshot error
    pub fn snapshot(message: impl Into<String>) -> Self {
        Self::Snapshot(message.into())
    }

    /// Create a new fixture error
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture(message.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(error: serde_json::Error) -> Self {
        Self::Json(error.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(error: reqwest::Error) -> Self {
        Self::Http(error.to_string())
    }
}
