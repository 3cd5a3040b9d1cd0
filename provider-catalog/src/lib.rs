//! Catalog backend connector
//!
//! REST client for the streaming catalog and auth service. Wraps the
//! `HttpClient` port, normalizes the backend's inconsistent response shapes,
//! and maps HTTP failures into a typed error taxonomy.

pub mod connector;
pub mod error;
pub mod normalize;
pub mod types;

pub use connector::CatalogConnector;
pub use error::{ApiError, Result};
pub use types::{AuthTokens, Selection, SelectionSummary, Track, User};
