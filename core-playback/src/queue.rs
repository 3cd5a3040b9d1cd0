//! Queue state and navigation.

use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use provider_catalog::Track;
use rand::seq::SliceRandom;
use tracing::debug;

/// The active playlist plus playback flags.
pub struct PlaybackQueue {
    playlist: Vec<Track>,
    current_index: Option<usize>,
    is_playing: bool,
    shuffle: bool,
    repeat: bool,
    /// Permutation of playlist indices, drawn when shuffle turns on and
    /// kept until the flag flips or the playlist is replaced.
    shuffle_order: Vec<usize>,
    event_bus: EventBus,
}

impl PlaybackQueue {
    pub fn new(event_bus: EventBus) -> Self {
        Self {
            playlist: Vec::new(),
            current_index: None,
            is_playing: false,
            shuffle: false,
            repeat: false,
            shuffle_order: Vec::new(),
            event_bus,
        }
    }

    pub fn playlist(&self) -> &[Track] {
        &self.playlist
    }

    pub fn current_track(&self) -> Option<&Track> {
        self.current_index.and_then(|i| self.playlist.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_shuffle(&self) -> bool {
        self.shuffle
    }

    pub fn is_repeat(&self) -> bool {
        self.repeat
    }

    /// Replace the playlist.
    ///
    /// Clears the current track. An active shuffle draws a fresh
    /// permutation for the new list.
    pub fn set_playlist(&mut self, tracks: Vec<Track>) {
        self.playlist = tracks;
        self.current_index = None;
        if self.shuffle {
            self.reshuffle();
        }
        debug!(count = self.playlist.len(), "Playlist replaced");
    }

    /// Make the given track current, by id lookup in the playlist.
    ///
    /// No-op when the track is not in the playlist.
    pub fn set_current_track(&mut self, track: &Track) {
        if let Some(index) = self.playlist.iter().position(|t| t.id == track.id) {
            self.set_current_index(index);
        }
    }

    /// Make the track at `index` current. No-op when out of bounds.
    pub fn set_current_index(&mut self, index: usize) {
        if index >= self.playlist.len() {
            return;
        }
        self.current_index = Some(index);
        self.emit_track_changed();
    }

    pub fn play(&mut self) {
        let Some(track) = self.current_track() else {
            return;
        };
        let track_id = track.id.to_string();
        self.is_playing = true;
        let _ = self
            .event_bus
            .emit(CoreEvent::Playback(PlaybackEvent::Started { track_id }));
    }

    pub fn pause(&mut self) {
        let Some(track) = self.current_track() else {
            return;
        };
        let track_id = track.id.to_string();
        self.is_playing = false;
        let _ = self
            .event_bus
            .emit(CoreEvent::Playback(PlaybackEvent::Paused { track_id }));
    }

    pub fn toggle_repeat(&mut self) {
        self.repeat = !self.repeat;
        let _ = self
            .event_bus
            .emit(CoreEvent::Playback(PlaybackEvent::RepeatChanged {
                enabled: self.repeat,
            }));
    }

    /// Advance to the next track, wrapping at the end of the order.
    ///
    /// Follows the shuffled permutation when shuffle is on. No-op on an
    /// empty playlist; on a playlist without a current track it starts at
    /// the first track of the active order.
    pub fn next(&mut self) {
        self.step(1);
    }

    /// Step back to the previous track, wrapping at the start.
    pub fn previous(&mut self) {
        self.step(-1);
    }

    fn step(&mut self, direction: isize) {
        if self.playlist.is_empty() {
            return;
        }
        let order = self.active_order();
        let len = order.len() as isize;

        let next_position = match self.current_index {
            None => 0,
            Some(current) => {
                let position = order
                    .iter()
                    .position(|&i| i == current)
                    .unwrap_or(0) as isize;
                (position + direction).rem_euclid(len) as usize
            }
        };

        self.current_index = Some(order[next_position]);
        self.emit_track_changed();
    }

    /// Toggle shuffle.
    ///
    /// Turning it on draws one random permutation of the current playlist;
    /// navigation then walks that permutation until shuffle turns off or
    /// the playlist changes.
    pub fn set_shuffle(&mut self, enabled: bool) {
        if self.shuffle == enabled {
            return;
        }
        self.shuffle = enabled;
        if enabled {
            self.reshuffle();
        } else {
            self.shuffle_order.clear();
        }
        let _ = self
            .event_bus
            .emit(CoreEvent::Playback(PlaybackEvent::ShuffleChanged {
                enabled,
            }));
    }

    fn reshuffle(&mut self) {
        self.shuffle_order = (0..self.playlist.len()).collect();
        self.shuffle_order.shuffle(&mut rand::thread_rng());
    }

    fn active_order(&self) -> Vec<usize> {
        if self.shuffle {
            self.shuffle_order.clone()
        } else {
            (0..self.playlist.len()).collect()
        }
    }

    fn emit_track_changed(&self) {
        if let Some(track) = self.current_track() {
            let _ = self
                .event_bus
                .emit(CoreEvent::Playback(PlaybackEvent::TrackChanged {
                    track_id: track.id.to_string(),
                    title: track.name.clone(),
                }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE;
    use serde_json::json;
    use std::collections::HashSet;

    fn tracks(n: u64) -> Vec<Track> {
        (1..=n)
            .map(|id| serde_json::from_value(json!({ "_id": id })).unwrap())
            .collect()
    }

    fn queue_with(n: u64) -> PlaybackQueue {
        let mut queue = PlaybackQueue::new(EventBus::new(DEFAULT_EVENT_BUFFER_SIZE));
        queue.set_playlist(tracks(n));
        queue
    }

    #[test]
    fn test_next_wraps_back_to_start() {
        let mut queue = queue_with(4);
        queue.set_current_index(0);

        for _ in 0..4 {
            queue.next();
        }

        assert_eq!(queue.current_index(), Some(0));
    }

    #[test]
    fn test_previous_from_first_wraps_to_last() {
        let mut queue = queue_with(4);
        queue.set_current_index(0);

        queue.previous();

        assert_eq!(queue.current_index(), Some(3));
    }

    #[test]
    fn test_navigation_on_empty_playlist_is_a_noop() {
        let mut queue = PlaybackQueue::new(EventBus::new(DEFAULT_EVENT_BUFFER_SIZE));
        queue.next();
        queue.previous();
        assert_eq!(queue.current_index(), None);
    }

    #[test]
    fn test_play_without_current_track_is_a_noop() {
        let mut queue = queue_with(3);
        queue.play();
        assert!(!queue.is_playing());

        queue.set_current_index(1);
        queue.play();
        assert!(queue.is_playing());
        queue.pause();
        assert!(!queue.is_playing());
    }

    #[test]
    fn test_set_current_track_finds_by_id() {
        let mut queue = queue_with(3);
        let track: Track = serde_json::from_value(json!({ "_id": 2 })).unwrap();

        queue.set_current_track(&track);

        assert_eq!(queue.current_index(), Some(1));
    }

    #[test]
    fn test_out_of_bounds_index_is_ignored() {
        let mut queue = queue_with(3);
        queue.set_current_index(7);
        assert_eq!(queue.current_index(), None);
    }

    #[test]
    fn test_shuffle_order_is_a_complete_permutation() {
        let mut queue = queue_with(10);
        queue.set_shuffle(true);

        let seen: HashSet<usize> = queue.shuffle_order.iter().copied().collect();
        assert_eq!(seen, (0..10).collect::<HashSet<_>>());
        assert_eq!(queue.shuffle_order.len(), 10);
    }

    #[test]
    fn test_shuffle_order_is_stable_across_navigation() {
        let mut queue = queue_with(6);
        queue.set_shuffle(true);
        let order = queue.shuffle_order.clone();

        queue.set_current_index(order[0]);
        queue.next();
        queue.next();
        queue.previous();

        assert_eq!(queue.shuffle_order, order);
        assert_eq!(queue.current_index(), Some(order[1]));
    }

    #[test]
    fn test_shuffled_navigation_visits_every_track_once_per_cycle() {
        let mut queue = queue_with(5);
        queue.set_shuffle(true);
        queue.next();

        let mut visited = Vec::new();
        for _ in 0..5 {
            visited.push(queue.current_index().unwrap());
            queue.next();
        }

        let unique: HashSet<usize> = visited.iter().copied().collect();
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_replacing_playlist_redraws_shuffle_order() {
        let mut queue = queue_with(5);
        queue.set_shuffle(true);

        queue.set_playlist(tracks(3));

        assert_eq!(queue.shuffle_order.len(), 3);
        let seen: HashSet<usize> = queue.shuffle_order.iter().copied().collect();
        assert_eq!(seen, (0..3).collect::<HashSet<_>>());
    }

    #[test]
    fn test_disabling_shuffle_restores_linear_order() {
        let mut queue = queue_with(4);
        queue.set_shuffle(true);
        queue.set_shuffle(false);

        queue.set_current_index(1);
        queue.next();

        assert_eq!(queue.current_index(), Some(2));
    }

    #[test]
    fn test_toggle_repeat_flips_the_flag() {
        let mut queue = queue_with(2);
        assert!(!queue.is_repeat());
        queue.toggle_repeat();
        assert!(queue.is_repeat());
        queue.toggle_repeat();
        assert!(!queue.is_repeat());
    }
}
