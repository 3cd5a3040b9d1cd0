//! # Event Bus System
//!
//! Provides an event-driven architecture for the streaming client core using
//! `tokio::sync::broadcast`. Core modules publish typed events; hosts and
//! other modules subscribe independently.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, AuthEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut subscriber = event_bus.subscribe();
//!
//! let event = CoreEvent::Auth(AuthEvent::LoggedIn {
//!     user_id: "64d0...".to_string(),
//!     email: "user@example.com".to_string(),
//! });
//! event_bus.emit(event).ok();
//! # }
//! ```
//!
//! ## Error Handling
//!
//! The bus is a broadcast channel, so receivers can observe two errors:
//!
//! - `RecvError::Lagged(n)`: the subscriber was too slow and missed `n`
//!   events. Non-fatal; the subscriber keeps receiving new events.
//! - `RecvError::Closed`: all senders dropped, which signals shutdown.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall behind by more than this many events receive
/// `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
/// It wraps domain-specific event types for different modules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication and session events
    Auth(AuthEvent),
    /// Favorites synchronization events
    Favorites(FavoritesEvent),
    /// Catalog and selection events
    Library(LibraryEvent),
    /// Playback queue events
    Playback(PlaybackEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Favorites(e) => e.description(),
            CoreEvent::Library(e) => e.description(),
            CoreEvent::Playback(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Auth(AuthEvent::SessionExpired { .. }) => EventSeverity::Warning,
            CoreEvent::Favorites(FavoritesEvent::ToggleReverted { .. }) => EventSeverity::Warning,
            CoreEvent::Library(LibraryEvent::FallbackActivated { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::LoggedIn { .. }) => EventSeverity::Info,
            CoreEvent::Favorites(FavoritesEvent::Loaded { .. }) => EventSeverity::Info,
            CoreEvent::Library(LibraryEvent::TracksLoaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events related to authentication and session lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// User signed out; session and tokens were cleared.
    LoggedOut,
    /// Authentication flow in progress.
    LoggingIn {
        /// Email of the account being authenticated.
        email: String,
    },
    /// User successfully authenticated.
    LoggedIn {
        /// Backend identifier of the user.
        user_id: String,
        /// Email of the authenticated account.
        email: String,
    },
    /// Access token was refreshed transparently after a 401.
    TokenRefreshed {
        /// The user whose token was refreshed.
        user_id: String,
    },
    /// The refresh token was rejected; re-authentication is required.
    SessionExpired {
        /// The user whose session expired, if a session was active.
        user_id: Option<String>,
    },
    /// Authentication error occurred.
    AuthError {
        /// Human-readable error message.
        message: String,
        /// Whether retrying may succeed (network errors are recoverable).
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::LoggedOut => "User signed out",
            AuthEvent::LoggingIn { .. } => "Authentication in progress",
            AuthEvent::LoggedIn { .. } => "User signed in successfully",
            AuthEvent::TokenRefreshed { .. } => "Access token refreshed",
            AuthEvent::SessionExpired { .. } => "Session expired",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Favorites Events
// ============================================================================

/// Events related to the favorites synchronizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum FavoritesEvent {
    /// Favorites were loaded from the backend for a user.
    Loaded {
        /// The user the favorites belong to.
        user_id: String,
        /// Number of favorite tracks loaded.
        count: usize,
    },
    /// A track was marked as favorite.
    Added {
        /// The track that was favorited.
        track_id: String,
    },
    /// A track was removed from favorites.
    Removed {
        /// The track that was unfavorited.
        track_id: String,
    },
    /// An optimistic toggle failed and the local flag was rolled back.
    ToggleReverted {
        /// The track whose flag was restored.
        track_id: String,
        /// Why the backend write failed.
        message: String,
    },
    /// All favorites state was cleared (sign-out or user switch).
    Cleared,
}

impl FavoritesEvent {
    fn description(&self) -> &str {
        match self {
            FavoritesEvent::Loaded { .. } => "Favorites loaded",
            FavoritesEvent::Added { .. } => "Track added to favorites",
            FavoritesEvent::Removed { .. } => "Track removed from favorites",
            FavoritesEvent::ToggleReverted { .. } => "Favorite toggle rolled back",
            FavoritesEvent::Cleared => "Favorites cleared",
        }
    }
}

// ============================================================================
// Library Events
// ============================================================================

/// Events related to catalog and selection loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LibraryEvent {
    /// The main catalog finished loading from the backend.
    TracksLoaded {
        /// Number of tracks in the catalog.
        count: usize,
    },
    /// The catalog failed to load and the bundled fallback is active.
    FallbackActivated {
        /// The load error that triggered the fallback.
        message: String,
    },
    /// A curated selection was assembled.
    SelectionLoaded {
        /// Backend identifier of the selection.
        selection_id: String,
        /// Display name of the selection.
        name: String,
        /// Number of tracks successfully resolved.
        track_count: usize,
    },
}

impl LibraryEvent {
    fn description(&self) -> &str {
        match self {
            LibraryEvent::TracksLoaded { .. } => "Catalog loaded",
            LibraryEvent::FallbackActivated { .. } => "Catalog fallback activated",
            LibraryEvent::SelectionLoaded { .. } => "Selection loaded",
        }
    }
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events related to the playback queue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// The current track changed (selection, next, or previous).
    TrackChanged {
        /// The track now current.
        track_id: String,
        /// Track title for display.
        title: String,
    },
    /// Playback flag switched to playing.
    Started {
        /// The track being played.
        track_id: String,
    },
    /// Playback flag switched to paused.
    Paused {
        /// The track that was paused.
        track_id: String,
    },
    /// Shuffle mode was toggled.
    ShuffleChanged {
        /// Whether shuffle is now enabled.
        enabled: bool,
    },
    /// Repeat mode was toggled.
    RepeatChanged {
        /// Whether repeat is now enabled.
        enabled: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::TrackChanged { .. } => "Current track changed",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::ShuffleChanged { .. } => "Shuffle mode changed",
            PlaybackEvent::RepeatChanged { .. } => "Repeat mode changed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering
/// capabilities, for hosts that only care about one event category.
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events. Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }

            // Event didn't match filter, continue to next event
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_event_bus_creation() {
        let bus = EventBus::new(10);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_event_bus_subscription() {
        let bus = EventBus::new(10);
        let _sub1 = bus.subscribe();
        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);
    }

    #[tokio::test]
    async fn test_event_emission_no_subscribers() {
        let bus = EventBus::new(10);
        let event = CoreEvent::Auth(AuthEvent::LoggedOut);

        // Should error when no subscribers
        assert!(bus.emit(event).is_err());
    }

    #[tokio::test]
    async fn test_event_emission_with_subscribers() {
        let bus = EventBus::new(10);
        let mut sub = bus.subscribe();

        let event = CoreEvent::Auth(AuthEvent::LoggedIn {
            user_id: "user-1".to_string(),
            email: "user@example.com".to_string(),
        });

        let result = bus.emit(event.clone());
        assert!(result.is_ok());
        assert_eq!(result.unwrap(), 1);

        let received = sub.recv().await.unwrap();
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_receive_same_event() {
        let bus = EventBus::new(10);
        let mut sub1 = bus.subscribe();
        let mut sub2 = bus.subscribe();

        let event = CoreEvent::Favorites(FavoritesEvent::Loaded {
            user_id: "user-1".to_string(),
            count: 12,
        });

        bus.emit(event.clone()).ok();

        let received1 = sub1.recv().await.unwrap();
        let received2 = sub2.recv().await.unwrap();

        assert_eq!(received1, event);
        assert_eq!(received2, event);
    }

    #[tokio::test]
    async fn test_event_stream_with_filter() {
        let bus = EventBus::new(10);
        let mut stream =
            EventStream::new(bus.subscribe()).filter(|event| matches!(event, CoreEvent::Auth(_)));

        // Emit non-auth event (should be filtered out)
        let library_event = CoreEvent::Library(LibraryEvent::TracksLoaded { count: 29 });
        bus.emit(library_event).ok();

        // Emit auth event (should pass through)
        let auth_event = CoreEvent::Auth(AuthEvent::SessionExpired {
            user_id: Some("user-1".to_string()),
        });
        bus.emit(auth_event.clone()).ok();

        let received = stream.recv().await.unwrap();
        assert_eq!(received, auth_event);
    }

    #[tokio::test]
    async fn test_lagged_subscriber() {
        let bus = EventBus::new(2); // Very small buffer
        let mut sub = bus.subscribe();

        for i in 0..5 {
            let event = CoreEvent::Playback(PlaybackEvent::TrackChanged {
                track_id: format!("track-{}", i),
                title: format!("Track {}", i),
            });
            bus.emit(event).ok();
        }

        let result = sub.recv().await;
        assert!(matches!(result, Err(RecvError::Lagged(_))));
    }

    #[tokio::test]
    async fn test_event_severity() {
        let error_event = CoreEvent::Auth(AuthEvent::AuthError {
            message: "Failed".to_string(),
            recoverable: false,
        });
        assert_eq!(error_event.severity(), EventSeverity::Error);

        let warning_event = CoreEvent::Favorites(FavoritesEvent::ToggleReverted {
            track_id: "track-1".to_string(),
            message: "network down".to_string(),
        });
        assert_eq!(warning_event.severity(), EventSeverity::Warning);

        let debug_event = CoreEvent::Playback(PlaybackEvent::ShuffleChanged { enabled: true });
        assert_eq!(debug_event.severity(), EventSeverity::Debug);
    }

    #[tokio::test]
    async fn test_event_description() {
        let event = CoreEvent::Library(LibraryEvent::FallbackActivated {
            message: "timeout".to_string(),
        });
        assert_eq!(event.description(), "Catalog fallback activated");
    }

    #[tokio::test]
    async fn test_event_serialization() {
        let event = CoreEvent::Favorites(FavoritesEvent::ToggleReverted {
            track_id: "track-42".to_string(),
            message: "server error".to_string(),
        });

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("track-42"));

        let deserialized: CoreEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let bus = EventBus::new(10);
        let mut stream = EventStream::new(bus.subscribe());

        assert!(stream.try_recv().is_none());
    }
}
