//! Session lifecycle management.
//!
//! [`SessionManager`] owns the session state machine and every interaction
//! with the backend's user endpoints. Login and registration are two-step
//! operations against the backend: the user endpoint authenticates (or
//! creates) the account, then the token endpoint issues the JWT pair. The
//! authenticated user record is persisted alongside the tokens so a restart
//! can restore the session without a network round trip.
//!
//! [`SessionManager::with_auth`] is the single entry point for
//! authenticated API calls. It injects the stored access token and, on an
//! HTTP 401, performs at most one silent refresh followed by exactly one
//! retry. A failed refresh tears the session down.

use bridge_traits::storage::LocalStore;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use provider_catalog::{ApiError, CatalogConnector, User};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::error::{AuthError, Result};
use crate::token_store::TokenStore;

/// Durable storage key for the serialized user record.
pub const USER_KEY: &str = "user";

/// Session state machine.
///
/// `Expired` is transient: a failed silent refresh passes through it and
/// collapses to `Anonymous` immediately, with tokens and the persisted
/// user cleared. Hosts learn about the teardown from the `SessionExpired`
/// event rather than a resting state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No user is signed in.
    Anonymous,
    /// A login or registration call is in flight.
    Authenticating,
    /// A user is signed in and tokens are stored.
    Authenticated { user: User },
    /// The refresh token was rejected; tokens and user were cleared.
    Expired,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            SessionState::Authenticated { user } => Some(user),
            _ => None,
        }
    }
}

/// Drives authentication against the backend and holds the current session.
pub struct SessionManager {
    connector: Arc<CatalogConnector>,
    token_store: TokenStore,
    local_store: Arc<dyn LocalStore>,
    event_bus: EventBus,
    state: Arc<RwLock<SessionState>>,
}

impl SessionManager {
    pub fn new(
        connector: Arc<CatalogConnector>,
        local_store: Arc<dyn LocalStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            connector,
            token_store: TokenStore::new(local_store.clone()),
            local_store,
            event_bus,
            state: Arc::new(RwLock::new(SessionState::Anonymous)),
        }
    }

    /// Current session state snapshot.
    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// The signed-in user, if any.
    pub async fn current_user(&self) -> Option<User> {
        self.state.read().await.user().cloned()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    /// Restore a persisted session at startup.
    ///
    /// Read-only hydration: when durable storage holds a well-formed user
    /// record and an access token, the session jumps straight to
    /// `Authenticated` without a network round trip. Malformed or partial
    /// data is treated as absent: the stale keys are removed and the
    /// session stays `Anonymous`. Never fails; storage errors are logged
    /// and treated as "nothing persisted".
    #[instrument(skip(self))]
    pub async fn restore(&self) {
        let user_json = match self.local_store.get(USER_KEY).await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted user, starting anonymous");
                return;
            }
        };
        let tokens = match self.token_store.hydrate().await {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Failed to read persisted tokens, starting anonymous");
                return;
            }
        };

        let user = user_json
            .as_deref()
            .and_then(|json| serde_json::from_str::<User>(json).ok());

        match (user, tokens) {
            (Some(user), Some(_)) => {
                info!(user_id = user.id, "Session restored from storage");
                let mut state = self.state.write().await;
                *state = SessionState::Authenticated { user };
            }
            (None, None) if user_json.is_none() => {
                debug!("No persisted session");
            }
            _ => {
                warn!("Persisted session is malformed or partial, clearing");
                self.discard_persisted_session().await;
            }
        }
    }

    /// Sign in with email and password.
    ///
    /// Validates inputs client-side before any network call, then runs the
    /// two-step backend flow (user endpoint, token endpoint). On success
    /// the user record and tokens are persisted and a `LoggedIn` event is
    /// emitted. On failure the session falls back to `Anonymous`.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        self.begin_authenticating(email).await;
        match self.login_inner(email, password).await {
            Ok(user) => Ok(user),
            Err(e) => {
                self.fail_authentication(&e, "Login failed").await;
                Err(e)
            }
        }
    }

    async fn login_inner(&self, email: &str, password: &str) -> Result<User> {
        let user = self.connector.login(email, password).await?;
        self.establish_session(user, email, password).await
    }

    /// Create an account and sign in.
    ///
    /// The backend signs the new account in with the same credentials right
    /// after creation, so registration ends in an authenticated session.
    #[instrument(skip(self, password, confirm), fields(email = %email))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        confirm: &str,
        username: &str,
    ) -> Result<User> {
        if email.trim().is_empty() || password.is_empty() || username.trim().is_empty() {
            return Err(AuthError::Validation(
                "Email, password and username are required".to_string(),
            ));
        }
        if password != confirm {
            return Err(AuthError::Validation(
                "Passwords do not match".to_string(),
            ));
        }

        self.begin_authenticating(email).await;
        match self.register_inner(email, password, username).await {
            Ok(user) => Ok(user),
            Err(e) => {
                self.fail_authentication(&e, "Registration failed").await;
                Err(e)
            }
        }
    }

    async fn register_inner(&self, email: &str, password: &str, username: &str) -> Result<User> {
        let user = self.connector.signup(email, password, username).await?;
        self.establish_session(user, email, password).await
    }

    async fn establish_session(&self, user: User, email: &str, password: &str) -> Result<User> {
        let tokens = self.connector.request_tokens(email, password).await?;
        self.token_store
            .set(&tokens.access, tokens.refresh.as_deref())
            .await?;

        let json = serde_json::to_string(&user)
            .map_err(|e| AuthError::Storage(format!("user serialization failed: {}", e)))?;
        self.local_store
            .set(USER_KEY, &json)
            .await
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        {
            let mut state = self.state.write().await;
            *state = SessionState::Authenticated { user: user.clone() };
        }

        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::LoggedIn {
            user_id: user.id.to_string(),
            email: user.email.clone(),
        }));
        info!(user_id = user.id, "Signed in");
        Ok(user)
    }

    async fn begin_authenticating(&self, email: &str) {
        {
            let mut state = self.state.write().await;
            *state = SessionState::Authenticating;
        }
        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::LoggingIn {
            email: email.to_string(),
        }));
    }

    /// Reset to `Anonymous` and surface a normalized error message.
    ///
    /// Backend rejections keep their server message; transport failures are
    /// replaced by the localized default so raw error text never reaches
    /// the user.
    async fn fail_authentication(&self, error: &AuthError, default_message: &str) {
        warn!(error = %error, "Authentication failed");
        {
            let mut state = self.state.write().await;
            *state = SessionState::Anonymous;
        }

        let (message, recoverable) = match error {
            AuthError::Api(ApiError::Api { message, .. }) => (message.clone(), false),
            AuthError::Api(ApiError::Network(_)) | AuthError::Api(ApiError::Timeout) => {
                (default_message.to_string(), true)
            }
            _ => (default_message.to_string(), false),
        };
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::AuthError {
                message,
                recoverable,
            }));
    }

    /// Sign out.
    ///
    /// Pure local cleanup, never fails: tokens and the persisted user
    /// record are removed, storage errors are logged and swallowed. The
    /// caller is responsible for clearing dependent per-user state (such as
    /// favorites) before invoking this.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        if let Err(e) = self.token_store.clear().await {
            warn!(error = %e, "Failed to clear tokens during logout");
        }
        if let Err(e) = self.local_store.remove(USER_KEY).await {
            warn!(error = %e, "Failed to remove persisted user during logout");
        }
        {
            let mut state = self.state.write().await;
            *state = SessionState::Anonymous;
        }
        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::LoggedOut));
        info!("Signed out");
    }

    /// Run an authenticated API call with one-shot refresh-and-retry.
    ///
    /// `call` receives the current access token. Without a stored token the
    /// call fails immediately with [`AuthError::AuthRequired`]. When the
    /// call comes back with an HTTP 401 the manager refreshes the token
    /// pair once and retries the call exactly once with the new token; the
    /// old refresh token is carried over when the server does not rotate
    /// it. A failed refresh clears tokens, expires the session, emits
    /// `SessionExpired` and returns [`AuthError::SessionExpired`]. A second
    /// 401 from the retried call propagates unmodified.
    pub async fn with_auth<T, F, Fut>(&self, call: F) -> Result<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = std::result::Result<T, ApiError>>,
    {
        let access = self
            .token_store
            .access()
            .await?
            .ok_or(AuthError::AuthRequired)?;

        match call(access).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_unauthorized() => {
                debug!("Access token rejected, attempting silent refresh");
                let refreshed = self.refresh_access_token().await?;
                call(refreshed).await.map_err(AuthError::from)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Refresh the token pair, tearing the session down on failure.
    async fn refresh_access_token(&self) -> Result<String> {
        let refresh = match self.token_store.refresh().await? {
            Some(token) => token,
            None => {
                warn!("No refresh token stored, expiring session");
                self.expire_session().await;
                return Err(AuthError::SessionExpired);
            }
        };

        match self.connector.refresh_tokens(&refresh).await {
            Ok(tokens) => {
                // Not every backend rotates the refresh token; keep the old
                // one when the response omits it.
                let next_refresh = tokens.refresh.unwrap_or(refresh);
                self.token_store
                    .set(&tokens.access, Some(&next_refresh))
                    .await?;

                if let Some(user) = self.current_user().await {
                    let _ = self
                        .event_bus
                        .emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                            user_id: user.id.to_string(),
                        }));
                }
                info!("Access token refreshed");
                Ok(tokens.access)
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, expiring session");
                self.expire_session().await;
                Err(AuthError::SessionExpired)
            }
        }
    }

    async fn expire_session(&self) {
        let user_id = self.current_user().await.map(|u| u.id.to_string());
        self.discard_persisted_session().await;
        {
            let mut state = self.state.write().await;
            *state = SessionState::Expired;
        }
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::SessionExpired { user_id }));
        // No resting Expired state: the session collapses straight to
        // logged-out once the teardown has been announced.
        {
            let mut state = self.state.write().await;
            *state = SessionState::Anonymous;
        }
    }

    async fn discard_persisted_session(&self) {
        if let Err(e) = self.token_store.clear().await {
            warn!(error = %e, "Failed to clear tokens");
        }
        if let Err(e) = self.local_store.remove(USER_KEY).await {
            warn!(error = %e, "Failed to remove persisted user");
        }
    }
}
