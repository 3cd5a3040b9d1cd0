//! Durable Key/Value Storage Abstraction
//!
//! Abstracts the client's persistent key/value store (the equivalent of a
//! browser's `localStorage`): string keys, string values. The core treats
//! this layer as a secondary cache: a missing or unparsable value is "no
//! cached value", never a fatal condition.
//!
//! Typical backends:
//! - Desktop: SQLite key/value table
//! - Tests: in-memory map
//!
//! # Example
//!
//! ```ignore
//! use bridge_traits::storage::LocalStore;
//!
//! async fn remember_token(store: &dyn LocalStore, token: &str) -> Result<()> {
//!     store.set("access_token", token).await?;
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;

use crate::error::Result;

/// String-keyed, string-valued durable storage port.
///
/// Writes must be durable before the call returns so that a process restart
/// immediately after a successful operation observes consistent state.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Retrieve a value. Returns `Ok(None)` if the key doesn't exist.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, overwriting any prior value for the key.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key. Idempotent; succeeds if the key doesn't exist.
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check if a key exists without retrieving its value.
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// List all stored keys.
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Remove all keys.
    async fn clear_all(&self) -> Result<()>;
}
