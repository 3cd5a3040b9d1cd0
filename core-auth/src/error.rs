//! Authentication error types.

use provider_catalog::ApiError;
use thiserror::Error;

/// Errors produced by the authentication layer.
#[derive(Debug, Error)]
pub enum AuthError {
    /// An operation needed an access token and none is stored.
    #[error("Authentication required")]
    AuthRequired,

    /// The refresh token was rejected; the session has been torn down and
    /// the user must sign in again.
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Client-side validation failed before any network call was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The durable token/session store failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The backend rejected the request or the transport failed.
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, AuthError>;
