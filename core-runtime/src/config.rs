//! # Core Configuration Module
//!
//! Provides configuration management for the streaming client core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds all dependencies and settings for the core library.
//! It enforces fail-fast validation so missing bridges surface at startup
//! rather than on first use.
//!
//! ## Required Dependencies
//!
//! - `LocalStore` - Required for token and session persistence
//!
//! ## Optional Dependencies (with platform defaults)
//!
//! - `HttpClient` - HTTP operations (desktop default: reqwest, injected by
//!   the service layer when the `desktop-shims` feature is enabled)
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .local_store(Arc::new(MyLocalStore))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{HttpClient, LocalStore};
use std::sync::Arc;
use std::time::Duration;

/// Default backend base URL.
pub const DEFAULT_BASE_URL: &str = "https://webdev-music-003b5b991590.herokuapp.com";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Core configuration for the streaming client core.
///
/// This struct holds all dependencies and settings required to initialize
/// the core library. Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Base URL of the catalog backend
    pub base_url: String,

    /// Timeout applied to each backend request
    pub request_timeout: Duration,

    /// Buffer size for the core event bus
    pub event_buffer_size: usize,

    /// HTTP client for making API requests (optional with desktop default)
    pub http_client: Option<Arc<dyn HttpClient>>,

    /// Durable key/value storage for tokens and cached state (required)
    pub local_store: Arc<dyn LocalStore>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("event_buffer_size", &self.event_buffer_size)
            .field(
                "http_client",
                &self.http_client.as_ref().map(|_| "HttpClient { ... }"),
            )
            .field("local_store", &"LocalStore { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Creates a new builder for constructing a `CoreConfig`.
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Validates the configuration and returns an error if invalid.
    ///
    /// This checks:
    /// - Base URL is non-empty and uses an HTTP scheme
    /// - Request timeout is positive and below 5 minutes
    /// - Event buffer can hold at least one event
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("Base URL cannot be empty".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "Base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        if self.request_timeout > Duration::from_secs(300) {
            return Err(Error::Config(
                "Request timeout exceeds maximum of 5 minutes".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for constructing [`CoreConfig`] instances.
///
/// Use this builder to incrementally set configuration options and then
/// call [`build()`](CoreConfigBuilder::build) to create the final config.
/// The builder validates required dependencies and provides actionable
/// error messages.
#[derive(Default)]
pub struct CoreConfigBuilder {
    base_url: Option<String>,
    request_timeout: Option<Duration>,
    event_buffer_size: Option<usize>,
    http_client: Option<Arc<dyn HttpClient>>,
    local_store: Option<Arc<dyn LocalStore>>,
}

impl CoreConfigBuilder {
    /// Sets the backend base URL.
    ///
    /// Trailing slashes are stripped so endpoint paths can always be joined
    /// with a leading slash.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        self.base_url = Some(url.trim_end_matches('/').to_string());
        self
    }

    /// Sets the per-request timeout.
    ///
    /// Default: 30 seconds.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Sets the event bus buffer size.
    ///
    /// Default: 100 events.
    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Sets the HTTP client implementation.
    ///
    /// If not provided, the desktop default (reqwest-based) will be injected
    /// by the service layer when the `desktop-shims` feature is enabled.
    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Sets the local store implementation (required).
    ///
    /// The local store persists tokens, the session record, and the
    /// favorites cache across restarts.
    pub fn local_store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.local_store = Some(store);
        self
    }

    /// Builds the final `CoreConfig` instance.
    ///
    /// # Returns
    ///
    /// Returns `Ok(CoreConfig)` on success, or an error if:
    /// - The required `LocalStore` is missing
    /// - Configuration values are invalid
    pub fn build(self) -> Result<CoreConfig> {
        let local_store = self.local_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "LocalStore".to_string(),
            message: "LocalStore implementation is required for token and session persistence. \
                      Desktop: inject bridge_desktop::SqliteLocalStore. \
                      Tests: inject an in-memory implementation."
                .to_string(),
        })?;

        let config = CoreConfig {
            base_url: self
                .base_url
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
            event_buffer_size: self
                .event_buffer_size
                .unwrap_or(crate::events::DEFAULT_EVENT_BUFFER_SIZE),
            http_client: self.http_client,
            local_store,
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::BridgeError;
    use std::sync::Arc;

    struct MockLocalStore;

    #[async_trait]
    impl LocalStore for MockLocalStore {
        async fn get(&self, _key: &str) -> std::result::Result<Option<String>, BridgeError> {
            Ok(None)
        }

        async fn set(&self, _key: &str, _value: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn remove(&self, _key: &str) -> std::result::Result<(), BridgeError> {
            Ok(())
        }

        async fn list_keys(&self) -> std::result::Result<Vec<String>, BridgeError> {
            Ok(Vec::new())
        }

        async fn clear_all(&self) -> std::result::Result<(), BridgeError> {
            Ok(())
        }
    }

    #[test]
    fn test_builder_requires_local_store() {
        let result = CoreConfig::builder().build();

        assert!(result.is_err());
        let err_msg = result.unwrap_err().to_string();
        assert!(err_msg.contains("LocalStore"));
        assert!(err_msg.contains("token and session persistence"));
    }

    #[test]
    fn test_builder_with_defaults() {
        let config = CoreConfig::builder()
            .local_store(Arc::new(MockLocalStore))
            .build()
            .unwrap();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(
            config.event_buffer_size,
            crate::events::DEFAULT_EVENT_BUFFER_SIZE
        );
        assert!(config.http_client.is_none());
    }

    #[test]
    fn test_builder_strips_trailing_slash() {
        let config = CoreConfig::builder()
            .base_url("https://api.example.com/")
            .local_store(Arc::new(MockLocalStore))
            .build()
            .unwrap();

        assert_eq!(config.base_url, "https://api.example.com");
    }

    #[test]
    fn test_validate_rejects_non_http_url() {
        let result = CoreConfig::builder()
            .base_url("ftp://api.example.com")
            .local_store(Arc::new(MockLocalStore))
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("must start with http"));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let result = CoreConfig::builder()
            .request_timeout(Duration::ZERO)
            .local_store(Arc::new(MockLocalStore))
            .build();

        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("greater than zero"));
    }

    #[test]
    fn test_validate_rejects_excessive_timeout() {
        let result = CoreConfig::builder()
            .request_timeout(Duration::from_secs(600))
            .local_store(Arc::new(MockLocalStore))
            .build();

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("exceeds maximum"));
    }

    #[test]
    fn test_validate_rejects_zero_event_buffer() {
        let result = CoreConfig::builder()
            .event_buffer_size(0)
            .local_store(Arc::new(MockLocalStore))
            .build();

        assert!(result.is_err());
    }

    #[test]
    fn test_config_is_cloneable() {
        let config = CoreConfig::builder()
            .base_url("https://api.example.com")
            .local_store(Arc::new(MockLocalStore))
            .build()
            .unwrap();

        let cloned = config.clone();
        assert_eq!(cloned.base_url, config.base_url);
        assert_eq!(cloned.request_timeout, config.request_timeout);
    }
}
