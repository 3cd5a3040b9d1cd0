//! Catalog backend wire types
//!
//! Data structures for deserializing backend responses. The backend is
//! lenient about which fields it sends, so every non-identity field has a
//! default and `genre` accepts either a string or an array of strings.

use serde::{Deserialize, Deserializer, Serialize};

/// Sign-in endpoint (POST, email + password)
pub const LOGIN_PATH: &str = "/user/login/";
/// Account creation endpoint (POST, email + password + username)
pub const SIGNUP_PATH: &str = "/user/signup/";
/// Token pair issuance endpoint (POST, email + password)
pub const TOKEN_PATH: &str = "/user/token/";
/// Access token refresh endpoint (POST, refresh token)
pub const TOKEN_REFRESH_PATH: &str = "/user/token/refresh/";
/// Full catalog listing (GET)
pub const ALL_TRACKS_PATH: &str = "/catalog/track/all/";
/// Favorite tracks of the authenticated user (GET, bearer)
pub const FAVORITE_TRACKS_PATH: &str = "/catalog/track/favorite/all/";
/// Curated selection listing (GET)
pub const ALL_SELECTIONS_PATH: &str = "/catalog/selection/all/";

/// Default title shown when the backend omits a track name
pub const UNKNOWN_TITLE: &str = "Unknown title";
/// Default artist shown when the backend omits the author
pub const UNKNOWN_AUTHOR: &str = "Unknown artist";

fn unknown_title() -> String {
    UNKNOWN_TITLE.to_string()
}

fn unknown_author() -> String {
    UNKNOWN_AUTHOR.to_string()
}

/// A single catalog track
///
/// Identity is `id`; records are immutable once fetched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Track {
    /// Backend identifier
    #[serde(rename = "_id")]
    pub id: u64,

    /// Track title
    #[serde(default = "unknown_title")]
    pub name: String,

    /// Performing artist
    #[serde(default = "unknown_author")]
    pub author: String,

    /// Release date as the backend sends it (no fixed format)
    #[serde(default)]
    pub release_date: Option<String>,

    /// Genre labels; the backend sends either a string or an array
    #[serde(default, deserialize_with = "string_or_seq")]
    pub genre: Vec<String>,

    /// Duration in whole seconds
    #[serde(default)]
    pub duration_in_seconds: u32,

    /// Album name
    #[serde(default)]
    pub album: Option<String>,

    /// Cover art URL
    #[serde(default)]
    pub logo: Option<String>,

    /// Streamable audio URL
    #[serde(default)]
    pub track_file: String,

    /// Users who favorited this track
    #[serde(default)]
    pub starred_user: Vec<u64>,
}

/// Accepts `"Rock"` and `["Rock", "Classic"]` alike.
fn string_or_seq<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrSeq {
        One(String),
        Many(Vec<String>),
    }

    Ok(match StringOrSeq::deserialize(deserializer)? {
        StringOrSeq::One(s) => vec![s],
        StringOrSeq::Many(v) => v,
    })
}

/// An authenticated account
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Backend identifier
    #[serde(rename = "_id")]
    pub id: u64,

    /// Account email
    pub email: String,

    /// Display name
    #[serde(default)]
    pub username: String,
}

/// Access/refresh token pair
///
/// The refresh endpoint returns only a new access token, so `refresh` is
/// optional; callers keep the previous refresh token when it is absent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthTokens {
    /// Short-lived access token (JWT)
    pub access: String,

    /// Long-lived refresh token
    #[serde(default)]
    pub refresh: Option<String>,
}

/// A curated selection listing entry
///
/// The listing endpoint returns selections with their track IDs but without
/// resolved track records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionSummary {
    /// Backend identifier
    pub id: u64,
    /// Display name
    pub name: String,
    /// Owner label
    pub owner: String,
    /// Tracks referenced by this selection
    pub track_ids: Vec<u64>,
}

/// A fully assembled selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Backend identifier
    pub id: u64,
    /// Display name
    pub name: String,
    /// Resolved track records (failed fetches are dropped)
    pub items: Vec<Track>,
    /// Owner label
    pub owner: String,
}
