//! Token persistence.
//!
//! Keeps the access/refresh pair in an in-memory cache backed by the host's
//! durable [`LocalStore`]. Every mutation is written through to durable
//! storage before the call returns, so a restart immediately after a login
//! or refresh observes the new tokens. Reads prefer the memory cache and
//! fall back to durable storage the first time.
//!
//! Token values are never logged; failures are reported with the failing
//! operation only.

use bridge_traits::storage::LocalStore;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{AuthError, Result};

/// Durable storage key for the access token.
pub const ACCESS_TOKEN_KEY: &str = "access_token";
/// Durable storage key for the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// An access token and its optional refresh companion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: Option<String>,
}

/// Two-layer token store: memory cache plus write-through durable storage.
#[derive(Clone)]
pub struct TokenStore {
    local_store: Arc<dyn LocalStore>,
    cached: Arc<RwLock<Option<TokenPair>>>,
}

impl TokenStore {
    pub fn new(local_store: Arc<dyn LocalStore>) -> Self {
        debug!("Initializing TokenStore");
        Self {
            local_store,
            cached: Arc::new(RwLock::new(None)),
        }
    }

    /// Store a new token pair.
    ///
    /// Writes to durable storage first and only updates the memory cache
    /// once persistence succeeded. When `refresh` is `None` any previously
    /// persisted refresh token is removed rather than left stale.
    pub async fn set(&self, access: &str, refresh: Option<&str>) -> Result<()> {
        self.local_store
            .set(ACCESS_TOKEN_KEY, access)
            .await
            .map_err(|e| Self::storage_error("persist access token", e))?;

        match refresh {
            Some(value) => self
                .local_store
                .set(REFRESH_TOKEN_KEY, value)
                .await
                .map_err(|e| Self::storage_error("persist refresh token", e))?,
            None => self
                .local_store
                .remove(REFRESH_TOKEN_KEY)
                .await
                .map_err(|e| Self::storage_error("remove stale refresh token", e))?,
        }

        let mut cached = self.cached.write().await;
        *cached = Some(TokenPair {
            access: access.to_string(),
            refresh: refresh.map(|s| s.to_string()),
        });

        debug!("Token pair stored");
        Ok(())
    }

    /// Current access token, if any.
    pub async fn access(&self) -> Result<Option<String>> {
        Ok(self.pair().await?.map(|p| p.access))
    }

    /// Current refresh token, if any.
    pub async fn refresh(&self) -> Result<Option<String>> {
        Ok(self.pair().await?.and_then(|p| p.refresh))
    }

    /// Current token pair, hydrating the memory cache from durable storage
    /// on first use.
    pub async fn pair(&self) -> Result<Option<TokenPair>> {
        {
            let cached = self.cached.read().await;
            if cached.is_some() {
                return Ok(cached.clone());
            }
        }
        self.hydrate().await
    }

    /// Read tokens from durable storage into the memory cache.
    ///
    /// Returns `None` when no access token is persisted. A refresh token
    /// without an access token is meaningless and is treated as absent.
    pub async fn hydrate(&self) -> Result<Option<TokenPair>> {
        let access = self
            .local_store
            .get(ACCESS_TOKEN_KEY)
            .await
            .map_err(|e| Self::storage_error("read access token", e))?;

        let Some(access) = access else {
            return Ok(None);
        };

        let refresh = self
            .local_store
            .get(REFRESH_TOKEN_KEY)
            .await
            .map_err(|e| Self::storage_error("read refresh token", e))?;

        let pair = TokenPair { access, refresh };
        let mut cached = self.cached.write().await;
        *cached = Some(pair.clone());
        Ok(Some(pair))
    }

    /// Remove tokens from both layers.
    pub async fn clear(&self) -> Result<()> {
        {
            let mut cached = self.cached.write().await;
            *cached = None;
        }

        self.local_store
            .remove(ACCESS_TOKEN_KEY)
            .await
            .map_err(|e| Self::storage_error("remove access token", e))?;
        self.local_store
            .remove(REFRESH_TOKEN_KEY)
            .await
            .map_err(|e| Self::storage_error("remove refresh token", e))?;

        debug!("Token pair cleared");
        Ok(())
    }

    fn storage_error(operation: &str, e: bridge_traits::error::BridgeError) -> AuthError {
        warn!(operation, error = %e, "Token storage operation failed");
        AuthError::Storage(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::{BridgeError, Result as BridgeResult};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockLocalStore {
        data: Mutex<HashMap<String, String>>,
        fail_writes: bool,
    }

    impl MockLocalStore {
        fn new() -> Self {
            Self {
                data: Mutex::new(HashMap::new()),
                fail_writes: false,
            }
        }

        fn failing() -> Self {
            Self {
                data: Mutex::new(HashMap::new()),
                fail_writes: true,
            }
        }
    }

    #[async_trait]
    impl LocalStore for MockLocalStore {
        async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
            if self.fail_writes {
                return Err(BridgeError::Storage("disk full".to_string()));
            }
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }

        async fn remove(&self, key: &str) -> BridgeResult<()> {
            self.data.lock().unwrap().remove(key);
            Ok(())
        }

        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.data.lock().unwrap().keys().cloned().collect())
        }

        async fn clear_all(&self) -> BridgeResult<()> {
            self.data.lock().unwrap().clear();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_set_writes_through_to_durable_storage() {
        let local = Arc::new(MockLocalStore::new());
        let store = TokenStore::new(local.clone());

        store.set("acc-1", Some("ref-1")).await.unwrap();

        let data = local.data.lock().unwrap();
        assert_eq!(data.get(ACCESS_TOKEN_KEY), Some(&"acc-1".to_string()));
        assert_eq!(data.get(REFRESH_TOKEN_KEY), Some(&"ref-1".to_string()));
    }

    #[tokio::test]
    async fn test_reads_prefer_memory_cache() {
        let local = Arc::new(MockLocalStore::new());
        let store = TokenStore::new(local.clone());

        store.set("acc-1", Some("ref-1")).await.unwrap();

        // Mutate durable storage behind the store's back; the cached value
        // must win until the cache is dropped.
        local
            .data
            .lock()
            .unwrap()
            .insert(ACCESS_TOKEN_KEY.to_string(), "other".to_string());

        assert_eq!(store.access().await.unwrap(), Some("acc-1".to_string()));
    }

    #[tokio::test]
    async fn test_cold_store_hydrates_from_durable_storage() {
        let local = Arc::new(MockLocalStore::new());
        {
            let store = TokenStore::new(local.clone());
            store.set("acc-1", Some("ref-1")).await.unwrap();
        }

        // Fresh store over the same durable layer, as after a restart.
        let store = TokenStore::new(local);
        assert_eq!(store.access().await.unwrap(), Some("acc-1".to_string()));
        assert_eq!(store.refresh().await.unwrap(), Some("ref-1".to_string()));
    }

    #[tokio::test]
    async fn test_set_without_refresh_removes_stale_refresh() {
        let local = Arc::new(MockLocalStore::new());
        let store = TokenStore::new(local.clone());

        store.set("acc-1", Some("ref-1")).await.unwrap();
        store.set("acc-2", None).await.unwrap();

        assert_eq!(store.refresh().await.unwrap(), None);
        assert!(!local
            .data
            .lock()
            .unwrap()
            .contains_key(REFRESH_TOKEN_KEY));
    }

    #[tokio::test]
    async fn test_clear_removes_both_layers() {
        let local = Arc::new(MockLocalStore::new());
        let store = TokenStore::new(local.clone());

        store.set("acc-1", Some("ref-1")).await.unwrap();
        store.clear().await.unwrap();

        assert_eq!(store.access().await.unwrap(), None);
        assert!(local.data.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_without_access_is_treated_as_absent() {
        let local = Arc::new(MockLocalStore::new());
        local
            .data
            .lock()
            .unwrap()
            .insert(REFRESH_TOKEN_KEY.to_string(), "orphan".to_string());

        let store = TokenStore::new(local);
        assert_eq!(store.pair().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_storage_failure_maps_to_storage_error() {
        let store = TokenStore::new(Arc::new(MockLocalStore::failing()));

        let err = store.set("acc-1", None).await.unwrap_err();
        assert!(matches!(err, AuthError::Storage(_)));
    }
}
