//! Display-side search and filtering.
//!
//! Pure functions over a track slice. They produce the displayed list and
//! never touch the authoritative collections, so clearing a filter is just
//! re-rendering from the source slice.

use provider_catalog::Track;

/// Case-insensitive substring search over title and artist.
///
/// An empty or whitespace-only query matches everything.
pub fn search(tracks: &[Track], query: &str) -> Vec<Track> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return tracks.to_vec();
    }
    tracks
        .iter()
        .filter(|t| {
            t.name.to_lowercase().contains(&query) || t.author.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}

/// Tracks carrying the given genre label (exact, case-insensitive).
pub fn filter_by_genre(tracks: &[Track], genre: &str) -> Vec<Track> {
    tracks
        .iter()
        .filter(|t| t.genre.iter().any(|g| g.eq_ignore_ascii_case(genre)))
        .cloned()
        .collect()
}

/// Tracks by the given artist (exact, case-insensitive).
pub fn filter_by_author(tracks: &[Track], author: &str) -> Vec<Track> {
    tracks
        .iter()
        .filter(|t| t.author.eq_ignore_ascii_case(author))
        .cloned()
        .collect()
}

/// Distinct genre labels, sorted, for the filter UI.
pub fn unique_genres(tracks: &[Track]) -> Vec<String> {
    let mut genres: Vec<String> = tracks.iter().flat_map(|t| t.genre.clone()).collect();
    genres.sort();
    genres.dedup();
    genres
}

/// Distinct artists, sorted, for the filter UI.
pub fn unique_authors(tracks: &[Track]) -> Vec<String> {
    let mut authors: Vec<String> = tracks.iter().map(|t| t.author.clone()).collect();
    authors.sort();
    authors.dedup();
    authors
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tracks() -> Vec<Track> {
        serde_json::from_value(json!([
            { "_id": 1, "name": "Chase", "author": "Alexander Nakarada", "genre": ["Rock"] },
            { "_id": 2, "name": "Open Road", "author": "Nico Staf", "genre": ["Rock", "Indie"] },
            { "_id": 3, "name": "quiet night", "author": "Nico Staf", "genre": ["Ambient"] },
        ]))
        .unwrap()
    }

    #[test]
    fn test_search_matches_title_and_author_case_insensitively() {
        let tracks = tracks();
        assert_eq!(search(&tracks, "chase").len(), 1);
        assert_eq!(search(&tracks, "NICO").len(), 2);
        assert_eq!(search(&tracks, "nothing-here").len(), 0);
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let tracks = tracks();
        assert_eq!(search(&tracks, "   ").len(), tracks.len());
    }

    #[test]
    fn test_filter_by_genre_checks_every_label() {
        let tracks = tracks();
        assert_eq!(filter_by_genre(&tracks, "rock").len(), 2);
        assert_eq!(filter_by_genre(&tracks, "Indie").len(), 1);
    }

    #[test]
    fn test_unique_values_are_sorted_and_deduplicated() {
        let tracks = tracks();
        assert_eq!(unique_genres(&tracks), vec!["Ambient", "Indie", "Rock"]);
        assert_eq!(
            unique_authors(&tracks),
            vec!["Alexander Nakarada", "Nico Staf"]
        );
    }

    #[test]
    fn test_filters_do_not_modify_the_source() {
        let tracks = tracks();
        let _ = filter_by_author(&tracks, "Nico Staf");
        assert_eq!(tracks.len(), 3);
    }
}
