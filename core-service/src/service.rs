//! Core service wiring.

use bridge_traits::http::HttpClient;
use core_auth::SessionManager;
use core_favorites::FavoritesSync;
use core_library::CatalogState;
use core_playback::PlaybackQueue;
use core_runtime::config::CoreConfig;
use core_runtime::events::{CoreEvent, EventBus};
use core_runtime::{Error, Result};
use provider_catalog::{CatalogConnector, User};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{info, instrument, warn};

/// The assembled streaming client core.
///
/// One instance per signed-in device. All components share a single event
/// bus and a single backend connector built from the configuration.
pub struct MusicService {
    event_bus: EventBus,
    connector: Arc<CatalogConnector>,
    session: Arc<SessionManager>,
    favorites: Arc<FavoritesSync>,
    catalog: Arc<CatalogState>,
    queue: Mutex<PlaybackQueue>,
}

impl MusicService {
    /// Build the service from a validated configuration.
    ///
    /// Fails with `CapabilityMissing` when no HTTP client is configured
    /// and no platform default is available.
    pub fn new(config: CoreConfig) -> Result<Self> {
        let http_client = match config.http_client.clone() {
            Some(client) => client,
            None => default_http_client(&config)?,
        };

        let event_bus = EventBus::new(config.event_buffer_size);
        let connector = Arc::new(CatalogConnector::new(
            http_client,
            config.base_url.clone(),
            config.request_timeout,
        ));
        let session = Arc::new(SessionManager::new(
            connector.clone(),
            config.local_store.clone(),
            event_bus.clone(),
        ));
        let favorites = Arc::new(FavoritesSync::new(
            session.clone(),
            connector.clone(),
            config.local_store.clone(),
            event_bus.clone(),
        ));
        let catalog = Arc::new(CatalogState::new(connector.clone(), event_bus.clone()));
        let queue = Mutex::new(PlaybackQueue::new(event_bus.clone()));

        info!(base_url = %config.base_url, "Core service assembled");
        Ok(Self {
            event_bus,
            connector,
            session,
            favorites,
            catalog,
            queue,
        })
    }

    /// Restore persisted state at startup.
    ///
    /// Hydrates the session from durable storage and, when a user comes
    /// back, binds the favorites synchronizer to that user and pre-fills
    /// it from the durable cache. Never fails; an authoritative favorites
    /// load still has to happen (and is attempted here, best-effort).
    #[instrument(skip(self))]
    pub async fn restore(&self) {
        self.session.restore().await;
        if let Some(user) = self.session.current_user().await {
            self.favorites.bind_user(Some(user.id)).await;
            self.favorites.restore_cached().await;
            if let Err(e) = self.favorites.load().await {
                warn!(error = %e, "Favorites reload after restore failed");
            }
        }
    }

    /// Sign in, then reload favorites for the new user.
    pub async fn login(&self, email: &str, password: &str) -> core_auth::Result<User> {
        let user = self.session.login(email, password).await?;
        self.favorites.handle_user_change(Some(user.id)).await;
        if let Err(e) = self.favorites.load().await {
            warn!(error = %e, "Favorites reload after login failed");
        }
        Ok(user)
    }

    /// Create an account, sign in, then reload favorites.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirm: &str,
        username: &str,
    ) -> core_auth::Result<User> {
        let user = self
            .session
            .register(email, password, confirm, username)
            .await?;
        self.favorites.handle_user_change(Some(user.id)).await;
        if let Err(e) = self.favorites.load().await {
            warn!(error = %e, "Favorites reload after registration failed");
        }
        Ok(user)
    }

    /// Sign out. Favorites are cleared before the session so no stale
    /// per-user state survives the transition to anonymous.
    pub async fn logout(&self) {
        self.favorites.clear().await;
        self.session.logout().await;
    }

    pub fn session(&self) -> &Arc<SessionManager> {
        &self.session
    }

    pub fn favorites(&self) -> &Arc<FavoritesSync> {
        &self.favorites
    }

    pub fn catalog(&self) -> &Arc<CatalogState> {
        &self.catalog
    }

    pub fn connector(&self) -> &Arc<CatalogConnector> {
        &self.connector
    }

    /// Exclusive access to the playback queue.
    pub async fn queue(&self) -> MutexGuard<'_, PlaybackQueue> {
        self.queue.lock().await
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Subscribe to core events.
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }
}

#[cfg(feature = "desktop-shims")]
fn default_http_client(config: &CoreConfig) -> Result<Arc<dyn HttpClient>> {
    Ok(Arc::new(bridge_desktop::ReqwestHttpClient::with_timeout(
        config.request_timeout,
    )))
}

#[cfg(not(feature = "desktop-shims"))]
fn default_http_client(_config: &CoreConfig) -> Result<Arc<dyn HttpClient>> {
    Err(Error::CapabilityMissing {
        capability: "HttpClient".to_string(),
        message: "No HTTP client configured. Inject one via \
                  CoreConfigBuilder::http_client, or enable the \
                  `desktop-shims` feature for the reqwest default."
            .to_string(),
    })
}

/// Build a desktop service: SQLite-backed storage plus the reqwest client.
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop(db_path: std::path::PathBuf) -> Result<MusicService> {
    let local_store = bridge_desktop::SqliteLocalStore::new(db_path)
        .await
        .map_err(|e| Error::Config(format!("Failed to open local store: {}", e)))?;

    let config = CoreConfig::builder()
        .local_store(Arc::new(local_store))
        .build()?;

    MusicService::new(config)
}
