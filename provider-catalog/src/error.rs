//! Error types for the catalog connector

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Catalog backend errors
///
/// Transport-level failures (`Network`, `Timeout`) are distinguished from
/// HTTP responses carrying an error status (`Api`), which in turn are
/// distinguished from responses whose body does not match any known shape
/// (`MalformedResponse`).
#[derive(Error, Debug)]
pub enum ApiError {
    /// Connection-level failure before any HTTP status was received
    #[error("Network failure: {0}")]
    Network(String),

    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,

    /// Backend returned a non-2xx status
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match any recognized shape
    #[error("Malformed response: {context}")]
    MalformedResponse { context: String },

    /// Request body could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for catalog operations
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Whether this error is an HTTP 401, the signal for token refresh.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Api { status: 401, .. })
    }
}

impl From<BridgeError> for ApiError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Timeout => ApiError::Timeout,
            BridgeError::Network(msg) => ApiError::Network(msg),
            other => ApiError::Network(other.to_string()),
        }
    }
}
