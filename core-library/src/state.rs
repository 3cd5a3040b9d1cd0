//! Catalog loading state.

use core_runtime::events::{CoreEvent, EventBus, LibraryEvent};
use provider_catalog::{CatalogConnector, Selection, SelectionSummary, Track};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::fallback::fallback_tracks;

/// Snapshot of the catalog state.
#[derive(Debug, Clone, Default)]
pub struct CatalogSnapshot {
    /// The displayed catalog; either the backend's list or the bundled
    /// placeholder when `fallback_active` is set.
    pub tracks: Vec<Track>,
    /// A catalog load is in flight.
    pub loading: bool,
    /// A load attempt has completed (successfully or via fallback).
    pub loaded: bool,
    /// Last load failure, kept visible alongside the fallback data.
    pub error: Option<String>,
    /// The bundled placeholder replaced a failed load.
    pub fallback_active: bool,
}

/// Loads and holds the public track catalog and curated selections.
pub struct CatalogState {
    connector: Arc<CatalogConnector>,
    event_bus: EventBus,
    state: Arc<RwLock<CatalogSnapshot>>,
}

impl CatalogState {
    pub fn new(connector: Arc<CatalogConnector>, event_bus: EventBus) -> Self {
        Self {
            connector,
            event_bus,
            state: Arc::new(RwLock::new(CatalogSnapshot::default())),
        }
    }

    /// Current state snapshot.
    pub async fn snapshot(&self) -> CatalogSnapshot {
        self.state.read().await.clone()
    }

    /// Load the full catalog.
    ///
    /// Never fails: a transport or backend failure, or a successful response
    /// with zero tracks, substitutes the bundled placeholder list so the
    /// library still renders. A failure additionally stays recorded in state.
    #[instrument(skip(self))]
    pub async fn load_all(&self) {
        {
            let mut state = self.state.write().await;
            state.loading = true;
        }

        match self.connector.all_tracks().await {
            Ok(tracks) if !tracks.is_empty() => {
                let count = tracks.len();
                {
                    let mut state = self.state.write().await;
                    state.tracks = tracks;
                    state.loading = false;
                    state.loaded = true;
                    state.error = None;
                    state.fallback_active = false;
                }
                let _ = self
                    .event_bus
                    .emit(CoreEvent::Library(LibraryEvent::TracksLoaded { count }));
                info!(count, "Catalog loaded");
            }
            // A 200 with zero tracks renders as an unexplained empty
            // library, so it gets the placeholder too, just without a
            // recorded error.
            Ok(_) => {
                warn!("Catalog response was empty, using bundled placeholder");
                self.activate_fallback(None, "Catalog returned no tracks".to_string())
                    .await;
            }
            Err(e) => {
                warn!(error = %e, "Catalog load failed, using bundled placeholder");
                let message = e.to_string();
                self.activate_fallback(Some(message.clone()), message).await;
            }
        }
    }

    async fn activate_fallback(&self, error: Option<String>, message: String) {
        {
            let mut state = self.state.write().await;
            state.tracks = fallback_tracks();
            state.loading = false;
            state.loaded = true;
            state.error = error;
            state.fallback_active = true;
        }
        let _ = self
            .event_bus
            .emit(CoreEvent::Library(LibraryEvent::FallbackActivated {
                message,
            }));
    }

    /// List the curated selections.
    pub async fn load_selections(&self) -> Result<Vec<SelectionSummary>> {
        Ok(self.connector.all_selections().await?)
    }

    /// Assemble a curated selection with its resolved tracks.
    #[instrument(skip(self))]
    pub async fn load_selection(&self, id: u64) -> Result<Selection> {
        let selection = self.connector.selection_by_id(id).await?;
        let _ = self
            .event_bus
            .emit(CoreEvent::Library(LibraryEvent::SelectionLoaded {
                selection_id: selection.id.to_string(),
                name: selection.name.clone(),
                track_count: selection.items.len(),
            }));
        Ok(selection)
    }
}
