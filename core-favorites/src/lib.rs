//! Favorites synchronization.
//!
//! Keeps the signed-in user's favorite tracks in sync with the backend.
//! Toggles are optimistic: the local flag flips immediately, the server
//! write happens in the background through the session's authenticated
//! wrapper, and a failed write rolls the flag back and surfaces the server
//! message. Writes for the same track are serialized through per-track
//! locks so rapid double-clicks cannot interleave.
//!
//! Favorites are strictly per-user: whenever the authenticated user
//! changes (including to or from anonymous), all local and cached state is
//! cleared before anything new is loaded.

pub mod error;
pub mod sync;

pub use error::{FavoritesError, Result};
pub use sync::{FavoritesState, FavoritesSync};
