//! Track catalog and curated selections.
//!
//! [`CatalogState`] loads the public track catalog and curated selections
//! from the backend. A failed catalog load never leaves the library empty:
//! a small bundled placeholder list takes its place while the failure
//! stays recorded in state for the UI to report.
//!
//! Search and genre/author filtering are pure functions over a track
//! slice ([`filter`]); they produce display lists and never modify the
//! authoritative collections.

pub mod error;
pub mod fallback;
pub mod filter;
pub mod state;

pub use error::{LibraryError, Result};
pub use state::{CatalogSnapshot, CatalogState};
