//! Error types for the AI client.

use thiserror::Error;

/// Result type for AI client operations.
pub type Result<T> = std::result::Result<T, AiError>;

/// AI client errors.
#[derive(Debug, Error)]
pub enum AiError {
    /// Configuration error (missing API key, unknown provider)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-2xx response from the provider
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The provider answered but produced nothing usable (blocked, empty candidates)
    #[error("Empty response: {0}")]
    EmptyResponse(String),

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AiError::Parse(e.to_string())
        } else {
            AiError::Network(e.to_string())
        }
    }
}
