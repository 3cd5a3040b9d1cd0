//! Optimistic favorites synchronizer.

use bridge_traits::storage::LocalStore;
use core_auth::SessionManager;
use core_runtime::events::{CoreEvent, EventBus, FavoritesEvent};
use provider_catalog::{CatalogConnector, Track};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument, warn};

use crate::error::{FavoritesError, Result};

/// Durable cache key for the favorite track records.
pub const FAVORITE_TRACKS_KEY: &str = "favorite_tracks";
/// Durable cache key for the favorite track ids.
pub const FAVORITE_IDS_KEY: &str = "favorite_track_ids";

/// Snapshot of the synchronizer's state.
#[derive(Debug, Clone, Default)]
pub struct FavoritesState {
    /// Ids of the user's favorite tracks. Membership checks go through
    /// this set, never through `tracks`.
    pub ids: HashSet<u64>,
    /// Full track records, for rendering the favorites list.
    pub tracks: Vec<Track>,
    /// An authoritative load is in flight.
    pub loading: bool,
    /// An authoritative load has completed for the current user.
    pub loaded: bool,
    /// Last load failure, kept visible until the next successful load.
    pub error: Option<String>,
}

/// Synchronizes the signed-in user's favorites with the backend.
///
/// Toggles flip the local flag immediately and perform the server write in
/// the background; a failed write rolls the flag back. Writes for the same
/// track id are serialized through per-track async locks. All state is
/// owned by exactly one user id and is cleared on any user change.
pub struct FavoritesSync {
    session: Arc<SessionManager>,
    connector: Arc<CatalogConnector>,
    local_store: Arc<dyn LocalStore>,
    event_bus: EventBus,
    state: Arc<RwLock<FavoritesState>>,
    current_user: Arc<RwLock<Option<u64>>>,
    toggle_locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl FavoritesSync {
    pub fn new(
        session: Arc<SessionManager>,
        connector: Arc<CatalogConnector>,
        local_store: Arc<dyn LocalStore>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            session,
            connector,
            local_store,
            event_bus,
            state: Arc::new(RwLock::new(FavoritesState::default())),
            current_user: Arc::new(RwLock::new(None)),
            toggle_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Current state snapshot.
    pub async fn state(&self) -> FavoritesState {
        self.state.read().await.clone()
    }

    pub async fn is_favorite(&self, track_id: u64) -> bool {
        self.state.read().await.ids.contains(&track_id)
    }

    /// Load the authoritative favorites list from the backend.
    ///
    /// Requires an authenticated session. The server response replaces the
    /// local set wholesale (the server is the source of truth) and the
    /// result is cached durably. Failures keep the previous set and record
    /// the error in state.
    #[instrument(skip(self))]
    pub async fn load(&self) -> Result<()> {
        let user_id = match self.session.current_user().await {
            Some(user) => user.id,
            None => return Err(FavoritesError::AuthRequired),
        };
        self.handle_user_change(Some(user_id)).await;

        {
            let mut state = self.state.write().await;
            state.loading = true;
        }

        let connector = self.connector.clone();
        let result = self
            .session
            .with_auth(move |token| {
                let connector = connector.clone();
                async move { connector.favorite_tracks(&token).await }
            })
            .await;

        match result {
            Ok(tracks) => {
                let count = tracks.len();
                {
                    let mut state = self.state.write().await;
                    state.ids = tracks.iter().map(|t| t.id).collect();
                    state.tracks = tracks;
                    state.loading = false;
                    state.loaded = true;
                    state.error = None;
                }
                self.persist_cache().await;

                let _ = self
                    .event_bus
                    .emit(CoreEvent::Favorites(FavoritesEvent::Loaded {
                        user_id: user_id.to_string(),
                        count,
                    }));
                debug!(count, "Favorites loaded");
                Ok(())
            }
            Err(e) => {
                let err = FavoritesError::from_auth(e, false);
                warn!(error = %err, "Failed to load favorites");
                let mut state = self.state.write().await;
                state.loading = false;
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Toggle a track's favorite flag.
    ///
    /// The local flag flips before the server write. On success the
    /// completion is the final authority for this track id, even if a
    /// concurrent reload replaced the set in between. On failure the flip
    /// is rolled back and the server message is surfaced. Returns the new
    /// membership.
    #[instrument(skip(self, track), fields(track_id = track.id))]
    pub async fn toggle(&self, track: &Track) -> Result<bool> {
        let lock = {
            let mut locks = self.toggle_locks.lock().await;
            locks
                .entry(track.id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        let _guard = lock.lock().await;

        let starting_user = *self.current_user.read().await;

        // Optimistic flip.
        let adding = {
            let mut state = self.state.write().await;
            let adding = !state.ids.contains(&track.id);
            if adding {
                state.ids.insert(track.id);
                state.tracks.push(track.clone());
            } else {
                state.ids.remove(&track.id);
                state.tracks.retain(|t| t.id != track.id);
            }
            adding
        };

        let connector = self.connector.clone();
        let track_id = track.id;
        let result = self
            .session
            .with_auth(move |token| {
                let connector = connector.clone();
                async move {
                    if adding {
                        connector.add_favorite(&token, track_id).await
                    } else {
                        connector.remove_favorite(&token, track_id).await
                    }
                }
            })
            .await;

        match result {
            Ok(()) => {
                // Re-assert the outcome under the user guard so a mid-flight
                // user switch cannot leak this track into the next user's set.
                let current = self.current_user.read().await;
                if *current == starting_user {
                    {
                        let mut state = self.state.write().await;
                        if adding {
                            state.ids.insert(track.id);
                            if !state.tracks.iter().any(|t| t.id == track.id) {
                                state.tracks.push(track.clone());
                            }
                        } else {
                            state.ids.remove(&track.id);
                            state.tracks.retain(|t| t.id != track.id);
                        }
                    }
                    drop(current);
                    self.persist_cache().await;

                    let event = if adding {
                        FavoritesEvent::Added {
                            track_id: track.id.to_string(),
                        }
                    } else {
                        FavoritesEvent::Removed {
                            track_id: track.id.to_string(),
                        }
                    };
                    let _ = self.event_bus.emit(CoreEvent::Favorites(event));
                }
                Ok(adding)
            }
            Err(e) => {
                let err = FavoritesError::from_auth(e, true);
                warn!(error = %err, "Favorite toggle failed, rolling back");

                let current = self.current_user.read().await;
                if *current == starting_user {
                    let mut state = self.state.write().await;
                    if adding {
                        state.ids.remove(&track.id);
                        state.tracks.retain(|t| t.id != track.id);
                    } else {
                        state.ids.insert(track.id);
                        state.tracks.push(track.clone());
                    }
                }

                let _ = self
                    .event_bus
                    .emit(CoreEvent::Favorites(FavoritesEvent::ToggleReverted {
                        track_id: track.id.to_string(),
                        message: err.to_string(),
                    }));
                Err(err)
            }
        }
    }

    /// Best-effort hydration from the durable cache.
    ///
    /// Populates `ids` and `tracks` for instant rendering at startup but
    /// does not mark the state `loaded`; an authoritative load still has to
    /// happen. Missing or unparsable cache entries are treated as absent.
    pub async fn restore_cached(&self) {
        let tracks = match self.read_cache_value::<Vec<Track>>(FAVORITE_TRACKS_KEY).await {
            Some(tracks) => tracks,
            None => return,
        };
        let mut ids = self
            .read_cache_value::<Vec<u64>>(FAVORITE_IDS_KEY)
            .await
            .map(HashSet::from_iter)
            .unwrap_or_default();
        ids.extend(tracks.iter().map(|t| t.id));

        debug!(count = tracks.len(), "Favorites restored from cache");
        let mut state = self.state.write().await;
        state.ids = ids;
        state.tracks = tracks;
    }

    /// Adopt the restored session's user at startup.
    ///
    /// Unlike [`handle_user_change`](Self::handle_user_change) this does
    /// not clear anything: the state is still empty and the durable cache
    /// belongs to exactly this user, so it must survive for
    /// [`restore_cached`](Self::restore_cached) to read.
    pub async fn bind_user(&self, user_id: Option<u64>) {
        let mut current = self.current_user.write().await;
        *current = user_id;
    }

    /// React to a change of the authenticated user.
    ///
    /// When the user id differs from the one owning the current state
    /// (including to or from anonymous), all local state and the durable
    /// cache are cleared before anything new is loaded. One user must never
    /// observe another user's favorites, not even briefly.
    pub async fn handle_user_change(&self, user_id: Option<u64>) {
        let mut current = self.current_user.write().await;
        if *current == user_id {
            return;
        }
        debug!(from = ?*current, to = ?user_id, "User changed, clearing favorites");
        *current = user_id;

        {
            let mut state = self.state.write().await;
            *state = FavoritesState::default();
        }
        drop(current);

        self.drain_toggle_locks().await;
        self.remove_cache().await;
        let _ = self
            .event_bus
            .emit(CoreEvent::Favorites(FavoritesEvent::Cleared));
    }

    /// Reset everything. Used by sign-out; never fails.
    pub async fn clear(&self) {
        {
            let mut current = self.current_user.write().await;
            *current = None;
            let mut state = self.state.write().await;
            *state = FavoritesState::default();
        }
        self.drain_toggle_locks().await;
        self.remove_cache().await;
        let _ = self
            .event_bus
            .emit(CoreEvent::Favorites(FavoritesEvent::Cleared));
    }

    /// Drop the per-track toggle locks so the map does not grow without
    /// bound across sessions. In-flight toggles keep their own handle; a
    /// later toggle for the same id simply gets a fresh lock.
    async fn drain_toggle_locks(&self) {
        self.toggle_locks.lock().await.clear();
    }

    async fn read_cache_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.local_store.get(key).await {
            Ok(value) => value?,
            Err(e) => {
                warn!(key, error = %e, "Failed to read favorites cache");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Favorites cache is unparsable, ignoring");
                None
            }
        }
    }

    /// Persist the current set durably. Cache only, so failures are logged
    /// and swallowed.
    async fn persist_cache(&self) {
        let (tracks_json, ids_json) = {
            let state = self.state.read().await;
            let mut ids: Vec<u64> = state.ids.iter().copied().collect();
            ids.sort_unstable();
            (
                serde_json::to_string(&state.tracks),
                serde_json::to_string(&ids),
            )
        };
        match (tracks_json, ids_json) {
            (Ok(tracks), Ok(ids)) => {
                if let Err(e) = self.local_store.set(FAVORITE_TRACKS_KEY, &tracks).await {
                    warn!(error = %e, "Failed to persist favorites cache");
                }
                if let Err(e) = self.local_store.set(FAVORITE_IDS_KEY, &ids).await {
                    warn!(error = %e, "Failed to persist favorites id cache");
                }
            }
            _ => warn!("Failed to serialize favorites cache"),
        }
    }

    async fn remove_cache(&self) {
        for key in [FAVORITE_TRACKS_KEY, FAVORITE_IDS_KEY] {
            if let Err(e) = self.local_store.remove(key).await {
                warn!(key, error = %e, "Failed to remove favorites cache");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
    use bytes::Bytes;
    use core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct MemoryStore {
        data: StdMutex<HashMap<String, String>>,
    }

    impl MemoryStore {
        fn new() -> Self {
            Self {
                data: StdMutex::new(HashMap::new()),
            }
        }

        fn insert(&self, key: &str, value: &str) {
            self.data
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
        }

        fn contains(&self, key: &str) -> bool {
            self.data.lock().unwrap().contains_key(key)
        }
    }

    #[async_trait]
    impl LocalStore for MemoryStore {
        async fn get(&self, key: &str) -> BridgeResult<Option<String>> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }

        async fn set(&self, key: &str, value: &str) -> BridgeResult<()> {
            self.insert(key, value);
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

    struct ScriptedHttpClient {
        responses: StdMutex<VecDeque<HttpResponse>>,
        requests: StdMutex<Vec<HttpRequest>>,
    }

    impl ScriptedHttpClient {
        fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: StdMutex::new(responses.into()),
                requests: StdMutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        fn request(&self, index: usize) -> HttpRequest {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedHttpClient {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().unwrap().push(request);
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("scripted client ran out of responses"))
        }
    }

    fn response(status: u16, body: serde_json::Value) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn track(id: u64) -> Track {
        serde_json::from_value(json!({ "_id": id })).unwrap()
    }

    struct Fixture {
        favorites: Arc<FavoritesSync>,
        session: Arc<SessionManager>,
        client: Arc<ScriptedHttpClient>,
        store: Arc<MemoryStore>,
        event_bus: EventBus,
    }

    fn fixture(responses: Vec<HttpResponse>) -> Fixture {
        let client = Arc::new(ScriptedHttpClient::new(responses));
        let store = Arc::new(MemoryStore::new());
        let connector = Arc::new(CatalogConnector::new(
            client.clone(),
            "https://api.test",
            Duration::from_secs(5),
        ));
        let event_bus = EventBus::new(DEFAULT_EVENT_BUFFER_SIZE);
        let session = Arc::new(SessionManager::new(
            connector.clone(),
            store.clone(),
            event_bus.clone(),
        ));
        let favorites = Arc::new(FavoritesSync::new(
            session.clone(),
            connector,
            store.clone(),
            event_bus.clone(),
        ));
        Fixture {
            favorites,
            session,
            client,
            store,
            event_bus,
        }
    }

    /// Seed a persisted session and restore it, so no network calls are
    /// consumed by authentication.
    async fn sign_in(f: &Fixture, user_id: u64) {
        f.store.insert(
            "user",
            &json!({ "_id": user_id, "email": "a@b.com", "username": "alice" }).to_string(),
        );
        f.store.insert("access_token", "acc-1");
        f.store.insert("refresh_token", "ref-1");
        f.session.restore().await;
        f.favorites.handle_user_change(Some(user_id)).await;
    }

    #[tokio::test]
    async fn test_load_without_session_fails_and_leaves_state_untouched() {
        let f = fixture(vec![]);

        let err = f.favorites.load().await.unwrap_err();

        assert!(matches!(err, FavoritesError::AuthRequired));
        let state = f.favorites.state().await;
        assert!(state.ids.is_empty());
        assert!(!state.loading);
        assert!(!state.loaded);
        assert_eq!(f.client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_load_replaces_state_wholesale() {
        let f = fixture(vec![
            response(200, json!([{ "_id": 1 }, { "_id": 2 }])),
            response(200, json!([{ "_id": 3 }])),
        ]);
        sign_in(&f, 42).await;

        f.favorites.load().await.unwrap();
        let state = f.favorites.state().await;
        assert_eq!(state.ids, HashSet::from([1, 2]));
        assert!(state.loaded);
        assert!(f.store.contains(FAVORITE_TRACKS_KEY));
        assert!(f.store.contains(FAVORITE_IDS_KEY));

        // A second load does not merge, it replaces.
        f.favorites.load().await.unwrap();
        let state = f.favorites.state().await;
        assert_eq!(state.ids, HashSet::from([3]));
        assert_eq!(state.tracks.len(), 1);
    }

    #[tokio::test]
    async fn test_load_failure_keeps_previous_set_and_records_error() {
        let f = fixture(vec![
            response(200, json!([{ "_id": 1 }])),
            response(500, json!({ "message": "backend down" })),
        ]);
        sign_in(&f, 42).await;
        f.favorites.load().await.unwrap();

        let err = f.favorites.load().await.unwrap_err();

        assert!(matches!(err, FavoritesError::LoadFailed(_)));
        let state = f.favorites.state().await;
        assert_eq!(state.ids, HashSet::from([1]));
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("Failed to load favorites: backend down"));
    }

    #[tokio::test]
    async fn test_double_toggle_restores_original_membership() {
        let f = fixture(vec![response(201, json!({})), response(200, json!({}))]);
        sign_in(&f, 42).await;
        let t = track(7);

        assert!(f.favorites.toggle(&t).await.unwrap());
        assert!(f.favorites.is_favorite(7).await);
        assert!(!f.favorites.toggle(&t).await.unwrap());
        assert!(!f.favorites.is_favorite(7).await);

        assert_eq!(f.client.request(0).method, HttpMethod::Post);
        assert_eq!(f.client.request(1).method, HttpMethod::Delete);
        assert!(f
            .client
            .request(0)
            .url
            .ends_with("/catalog/track/7/favorite/"));
    }

    #[tokio::test]
    async fn test_failed_toggle_rolls_back() {
        let f = fixture(vec![response(500, json!({ "message": "boom" }))]);
        sign_in(&f, 42).await;
        let mut events = f.event_bus.subscribe();
        let t = track(7);

        let err = f.favorites.toggle(&t).await.unwrap_err();

        assert!(matches!(
            err,
            FavoritesError::ToggleFailed { ref message } if message == "boom"
        ));
        assert!(!f.favorites.is_favorite(7).await);
        assert!(f.favorites.state().await.tracks.is_empty());

        let event = events.recv().await.unwrap();
        assert!(matches!(
            event,
            CoreEvent::Favorites(FavoritesEvent::ToggleReverted { ref track_id, .. })
                if track_id.as_str() == "7"
        ));
    }

    #[tokio::test]
    async fn test_toggle_without_session_rolls_back_with_auth_required() {
        let f = fixture(vec![]);
        let t = track(7);

        let err = f.favorites.toggle(&t).await.unwrap_err();

        assert!(matches!(err, FavoritesError::AuthRequired));
        assert!(!f.favorites.is_favorite(7).await);
        assert_eq!(f.client.request_count(), 0);
    }

    #[tokio::test]
    async fn test_rapid_double_click_serializes_per_track() {
        let f = fixture(vec![response(201, json!({})), response(200, json!({}))]);
        sign_in(&f, 42).await;
        let t = track(7);

        let (first, second) = tokio::join!(f.favorites.toggle(&t), f.favorites.toggle(&t));

        assert!(first.unwrap());
        assert!(!second.unwrap());
        assert!(!f.favorites.is_favorite(7).await);
        assert_eq!(f.client.request_count(), 2);
    }

    #[tokio::test]
    async fn test_user_switch_clears_state_and_cache() {
        let f = fixture(vec![response(200, json!([{ "_id": 1 }, { "_id": 2 }]))]);
        sign_in(&f, 42).await;
        f.favorites.load().await.unwrap();
        assert!(f.favorites.is_favorite(1).await);

        f.favorites.handle_user_change(Some(99)).await;

        let state = f.favorites.state().await;
        assert!(state.ids.is_empty());
        assert!(state.tracks.is_empty());
        assert!(!state.loaded);
        assert!(!f.store.contains(FAVORITE_TRACKS_KEY));
        assert!(!f.store.contains(FAVORITE_IDS_KEY));
    }

    #[tokio::test]
    async fn test_user_change_to_same_user_is_a_noop() {
        let f = fixture(vec![response(200, json!([{ "_id": 1 }]))]);
        sign_in(&f, 42).await;
        f.favorites.load().await.unwrap();

        f.favorites.handle_user_change(Some(42)).await;

        assert!(f.favorites.is_favorite(1).await);
        assert!(f.favorites.state().await.loaded);
    }

    #[tokio::test]
    async fn test_restore_cached_does_not_mark_loaded() {
        let f = fixture(vec![]);
        f.store.insert(
            FAVORITE_TRACKS_KEY,
            &json!([{ "_id": 5, "name": "Cached" }]).to_string(),
        );
        f.store.insert(FAVORITE_IDS_KEY, "[5]");

        f.favorites.restore_cached().await;

        let state = f.favorites.state().await;
        assert!(state.ids.contains(&5));
        assert_eq!(state.tracks.len(), 1);
        assert!(!state.loaded);
    }

    #[tokio::test]
    async fn test_restore_cached_ignores_unparsable_cache() {
        let f = fixture(vec![]);
        f.store.insert(FAVORITE_TRACKS_KEY, "garbage");

        f.favorites.restore_cached().await;

        assert!(f.favorites.state().await.ids.is_empty());
    }

    #[tokio::test]
    async fn test_clear_resets_everything() {
        let f = fixture(vec![response(200, json!([{ "_id": 1 }]))]);
        sign_in(&f, 42).await;
        f.favorites.load().await.unwrap();

        f.favorites.clear().await;

        let state = f.favorites.state().await;
        assert!(state.ids.is_empty());
        assert!(!state.loaded);
        assert!(!f.store.contains(FAVORITE_TRACKS_KEY));
    }

    #[tokio::test]
    async fn test_toggle_locks_are_drained_on_reset() {
        let f = fixture(vec![
            response(201, json!({})),
            response(201, json!({})),
        ]);
        sign_in(&f, 42).await;

        f.favorites.toggle(&track(7)).await.unwrap();
        assert_eq!(f.favorites.toggle_locks.lock().await.len(), 1);

        f.favorites.clear().await;
        assert!(f.favorites.toggle_locks.lock().await.is_empty());

        sign_in(&f, 43).await;
        f.favorites.toggle(&track(8)).await.unwrap();
        f.favorites.handle_user_change(None).await;
        assert!(f.favorites.toggle_locks.lock().await.is_empty());
    }
}
