//! Favorites error types.

use core_auth::AuthError;
use provider_catalog::ApiError;
use thiserror::Error;

/// Errors produced by the favorites synchronizer.
#[derive(Debug, Error)]
pub enum FavoritesError {
    /// No authenticated session; favorites are a signed-in feature.
    #[error("Authentication required")]
    AuthRequired,

    /// A favorite toggle failed on the server and was rolled back locally.
    #[error("Could not update favorite: {message}")]
    ToggleFailed { message: String },

    /// The authoritative favorites list could not be loaded.
    #[error("Failed to load favorites: {0}")]
    LoadFailed(String),

    /// The durable favorites cache failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl FavoritesError {
    /// Collapse auth-layer failures: anything that means "sign in again"
    /// becomes `AuthRequired`, the rest keeps its message.
    pub(crate) fn from_auth(e: AuthError, toggle: bool) -> Self {
        let message = match e {
            AuthError::AuthRequired | AuthError::SessionExpired => {
                return FavoritesError::AuthRequired
            }
            AuthError::Storage(msg) => return FavoritesError::Storage(msg),
            // Surface the server's own message for rejections, the full
            // error text for everything else.
            AuthError::Api(ApiError::Api { message, .. }) => message,
            other => other.to_string(),
        };
        if toggle {
            FavoritesError::ToggleFailed { message }
        } else {
            FavoritesError::LoadFailed(message)
        }
    }
}

pub type Result<T> = std::result::Result<T, FavoritesError>;
