//! Authentication and session management.
//!
//! This crate owns the credential lifecycle for the streaming backend:
//!
//! - [`TokenStore`] keeps the access/refresh token pair in memory with
//!   write-through persistence to the host [`LocalStore`]
//!   (`bridge_traits::storage::LocalStore`), so tokens survive restarts.
//! - [`SessionManager`] drives the session state machine
//!   (anonymous, authenticating, authenticated, expired), performs
//!   login/registration against the backend, restores persisted sessions at
//!   startup, and wraps authenticated calls with a one-shot
//!   refresh-and-retry via [`SessionManager::with_auth`].
//!
//! Session transitions are broadcast on the shared
//! [`EventBus`](core_runtime::events::EventBus) so other components
//! (favorites, UI shells) can react without direct coupling.

pub mod error;
pub mod session;
pub mod token_store;

pub use error::{AuthError, Result};
pub use session::{SessionManager, SessionState};
pub use token_store::{TokenPair, TokenStore};
