//! Library error types.

use provider_catalog::ApiError;
use thiserror::Error;

/// Errors produced by catalog and selection loads.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// The backend request failed and no local recovery applies.
    #[error(transparent)]
    Api(#[from] ApiError),
}

pub type Result<T> = std::result::Result<T, LibraryError>;
