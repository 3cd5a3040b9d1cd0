//! Catalog backend connector implementation

use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use futures::future::join_all;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{ApiError, Result};
use crate::normalize::{extract_raw_list, extract_track_list, normalize_user};
use crate::types::{
    AuthTokens, Selection, SelectionSummary, Track, User, ALL_SELECTIONS_PATH, ALL_TRACKS_PATH,
    FAVORITE_TRACKS_PATH, LOGIN_PATH, SIGNUP_PATH, TOKEN_PATH, TOKEN_REFRESH_PATH,
};

/// REST connector for the catalog and auth backend
///
/// Stateless apart from configuration; authenticated calls take the access
/// token as an argument so the session layer stays the single owner of
/// credentials.
///
/// # Example
///
/// ```ignore
/// use provider_catalog::CatalogConnector;
///
/// let connector = CatalogConnector::new(http_client, base_url, timeout);
/// let tracks = connector.all_tracks().await?;
/// ```
pub struct CatalogConnector {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Backend base URL, no trailing slash
    base_url: String,

    /// Per-request timeout
    timeout: Duration,
}

impl CatalogConnector {
    /// Create a new connector
    pub fn new(http_client: Arc<dyn HttpClient>, base_url: impl Into<String>, timeout: Duration) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
            timeout,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Execute a request and map transport failures.
    ///
    /// Non-2xx responses become `ApiError::Api` carrying the server's own
    /// message when the error body provides one.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.http_client.execute(request).await?;

        if response.is_success() {
            Ok(response)
        } else {
            Err(Self::api_error(&response))
        }
    }

    /// Build an `ApiError` from an error response.
    ///
    /// Prefers the server's `message` field, then `detail`, over a generic
    /// status line.
    fn api_error(response: &HttpResponse) -> ApiError {
        let message = serde_json::from_slice::<Value>(&response.body)
            .ok()
            .and_then(|body| {
                body.get("message")
                    .or_else(|| body.get("detail"))
                    .and_then(Value::as_str)
                    .map(str::to_string)
            })
            .unwrap_or_else(|| format!("Request failed with status {}", response.status));

        ApiError::Api {
            status: response.status,
            message,
        }
    }

    async fn get(&self, path: &str, bearer: Option<&str>) -> Result<HttpResponse> {
        let mut request =
            HttpRequest::new(HttpMethod::Get, self.url(path)).timeout(self.timeout);
        if let Some(token) = bearer {
            request = request.bearer_token(token);
        }
        self.send(request).await
    }

    async fn send_json(
        &self,
        method: HttpMethod,
        path: &str,
        body: &Value,
        bearer: Option<&str>,
    ) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(method, self.url(path))
            .timeout(self.timeout)
            .json(body)
            .map_err(|e| ApiError::Serialization(e.to_string()))?;
        if let Some(token) = bearer {
            request = request.bearer_token(token);
        }
        self.send(request).await
    }

    /// Create an account.
    ///
    /// A 403 surfaces the server's duplicate-account message verbatim.
    #[instrument(skip(self, password))]
    pub async fn signup(&self, email: &str, password: &str, username: &str) -> Result<User> {
        let body = json!({
            "email": email,
            "password": password,
            "username": username,
        });

        let response = self.send_json(HttpMethod::Post, SIGNUP_PATH, &body, None).await?;
        normalize_user(&response.body, "signup")
    }

    /// Authenticate with email and password.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let body = json!({
            "email": email,
            "password": password,
        });

        let response = self.send_json(HttpMethod::Post, LOGIN_PATH, &body, None).await?;
        normalize_user(&response.body, "login")
    }

    /// Obtain an access/refresh token pair.
    #[instrument(skip(self, password))]
    pub async fn request_tokens(&self, email: &str, password: &str) -> Result<AuthTokens> {
        let body = json!({
            "email": email,
            "password": password,
        });

        let response = self.send_json(HttpMethod::Post, TOKEN_PATH, &body, None).await?;
        response.json().map_err(|e| ApiError::MalformedResponse {
            context: format!("token: {}", e),
        })
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// The server may or may not rotate the refresh token; `refresh` is
    /// `None` when it does not.
    #[instrument(skip(self, refresh))]
    pub async fn refresh_tokens(&self, refresh: &str) -> Result<AuthTokens> {
        let body = json!({ "refresh": refresh });

        let response = self
            .send_json(HttpMethod::Post, TOKEN_REFRESH_PATH, &body, None)
            .await?;
        response.json().map_err(|e| ApiError::MalformedResponse {
            context: format!("token refresh: {}", e),
        })
    }

    /// Fetch the full catalog.
    #[instrument(skip(self))]
    pub async fn all_tracks(&self) -> Result<Vec<Track>> {
        let response = self.get(ALL_TRACKS_PATH, None).await?;
        let tracks = extract_track_list(&response.body, "all_tracks")?;

        info!(count = tracks.len(), "Fetched catalog");
        Ok(tracks)
    }

    /// Fetch a single track by ID.
    #[instrument(skip(self))]
    pub async fn track_by_id(&self, id: u64) -> Result<Track> {
        let path = format!("/catalog/track/{}/", id);
        let response = self.get(&path, None).await?;

        response.json().map_err(|e| ApiError::MalformedResponse {
            context: format!("track {}: {}", id, e),
        })
    }

    /// Fetch the favorite tracks of the authenticated user.
    #[instrument(skip(self, access))]
    pub async fn favorite_tracks(&self, access: &str) -> Result<Vec<Track>> {
        let response = self.get(FAVORITE_TRACKS_PATH, Some(access)).await?;
        extract_track_list(&response.body, "favorite_tracks")
    }

    /// Mark a track as favorite.
    #[instrument(skip(self, access))]
    pub async fn add_favorite(&self, access: &str, id: u64) -> Result<()> {
        let path = format!("/catalog/track/{}/favorite/", id);
        let request = HttpRequest::new(HttpMethod::Post, self.url(&path))
            .timeout(self.timeout)
            .bearer_token(access);

        self.send(request).await?;
        debug!(track_id = id, "Added favorite");
        Ok(())
    }

    /// Remove a track from favorites.
    #[instrument(skip(self, access))]
    pub async fn remove_favorite(&self, access: &str, id: u64) -> Result<()> {
        let path = format!("/catalog/track/{}/favorite/", id);
        let request = HttpRequest::new(HttpMethod::Delete, self.url(&path))
            .timeout(self.timeout)
            .bearer_token(access);

        self.send(request).await?;
        debug!(track_id = id, "Removed favorite");
        Ok(())
    }

    /// Fetch all curated selections as summaries.
    #[instrument(skip(self))]
    pub async fn all_selections(&self) -> Result<Vec<SelectionSummary>> {
        let response = self.get(ALL_SELECTIONS_PATH, None).await?;
        let entries = extract_raw_list(&response.body, "all_selections")?;

        let summaries = entries
            .iter()
            .filter_map(|entry| {
                let id = entry.get("_id").and_then(Value::as_u64)?;
                Some(SelectionSummary {
                    id,
                    name: selection_name(entry, id),
                    owner: selection_owner(entry),
                    track_ids: entry
                        .get("items")
                        .and_then(Value::as_array)
                        .map(|items| items.iter().filter_map(Value::as_u64).collect())
                        .unwrap_or_default(),
                })
            })
            .collect::<Vec<_>>();

        info!(count = summaries.len(), "Fetched selections");
        Ok(summaries)
    }

    /// Fetch and assemble a selection.
    ///
    /// The backend sends selection items either as full track records or as
    /// bare track IDs. ID lists are resolved with parallel per-track
    /// fetches; an individual fetch failure drops that track with a warning
    /// instead of failing the whole selection.
    #[instrument(skip(self))]
    pub async fn selection_by_id(&self, id: u64) -> Result<Selection> {
        let path = format!("/catalog/selection/{}/", id);
        let response = self.get(&path, None).await?;

        let value: Value =
            serde_json::from_slice(&response.body).map_err(|e| ApiError::MalformedResponse {
                context: format!("selection {}: invalid JSON: {}", id, e),
            })?;

        // Some deployments wrap the selection in a data/result envelope
        let payload = value
            .get("data")
            .or_else(|| value.get("result"))
            .filter(|v| v.is_object())
            .unwrap_or(&value);

        let name = selection_name(payload, id);
        let owner = selection_owner(payload);

        let raw_items = payload
            .get("items")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let items = self.resolve_items(id, raw_items).await;

        info!(
            selection_id = id,
            name = %name,
            track_count = items.len(),
            "Assembled selection"
        );

        Ok(Selection {
            id,
            name,
            items,
            owner,
        })
    }

    /// Resolve selection items from full records or bare IDs.
    async fn resolve_items(&self, selection_id: u64, raw_items: Vec<Value>) -> Vec<Track> {
        let mut tracks = Vec::new();
        let mut pending_ids = Vec::new();

        for item in raw_items {
            if let Some(track_id) = item.as_u64() {
                pending_ids.push(track_id);
            } else {
                match serde_json::from_value::<Track>(item) {
                    Ok(track) => tracks.push(track),
                    Err(e) => {
                        warn!(selection_id, error = %e, "Dropping unparsable selection item");
                    }
                }
            }
        }

        let fetches = pending_ids.iter().map(|&track_id| async move {
            (track_id, self.track_by_id(track_id).await)
        });

        for (track_id, result) in join_all(fetches).await {
            match result {
                Ok(track) => tracks.push(track),
                Err(e) => {
                    warn!(
                        selection_id,
                        track_id,
                        error = %e,
                        "Dropping failed track fetch from selection"
                    );
                }
            }
        }

        tracks
    }
}

fn selection_name(payload: &Value, id: u64) -> String {
    payload
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Selection {}", id))
}

fn selection_owner(payload: &Value) -> String {
    payload
        .get("owner")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| "unknown".to_string())
}
