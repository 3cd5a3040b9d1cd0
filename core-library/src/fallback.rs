//! Bundled placeholder catalog.
//!
//! Shown when the catalog cannot be loaded, so the library renders
//! something explainable instead of an empty page. The failure itself is
//! still recorded in state and logged.

use provider_catalog::Track;

/// The placeholder track list used when the catalog load fails.
pub fn fallback_tracks() -> Vec<Track> {
    vec![Track {
        id: 1,
        name: "Chase".to_string(),
        author: "Alexander Nakarada".to_string(),
        release_date: Some("2005-06-11".to_string()),
        genre: vec!["Хип-хоп".to_string()],
        duration_in_seconds: 128,
        album: Some("Chase".to_string()),
        logo: None,
        track_file:
            "https://webdev-music-003b5b991590.herokuapp.com/media/music_files/Alexander_Nakarada_-_Chase.mp3"
                .to_string(),
        starred_user: Vec::new(),
    }]
}
