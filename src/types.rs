use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// URL scheme used for media URLs handed back to the host player.
pub const URL_SCHEME: &str = "netease";

/// The six logical operations a query can perform.
///
/// Favourite kinds drive the cascading favourites view (and are the only
/// kinds that run the album cover stage); search kinds report "No match."
/// when nothing is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    FavouriteArtists,
    FavouriteAlbums,
    FavouriteSongs,
    SearchArtists,
    SearchAlbums,
    SearchSongs,
}

impl QueryKind {
    pub fn is_query(&self) -> bool {
        matches!(
            self,
            QueryKind::FavouriteArtists | QueryKind::FavouriteAlbums | QueryKind::FavouriteSongs
        )
    }

    pub fn is_search(&self) -> bool {
        matches!(
            self,
            QueryKind::SearchArtists | QueryKind::SearchAlbums | QueryKind::SearchSongs
        )
    }
}

/// Artist identity threaded through dependent requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Artist {
    pub artist_id: String,
    pub artist: String,
}

/// Album identity threaded through dependent requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Album {
    pub album_id: String,
    pub album: String,
    pub cover_url: String,
}

/// One track as mapped into the host's model.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Song {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub artist: String,
    pub album_id: String,
    pub album: String,
    /// Track length in milliseconds, as reported by the vendor (`dt`).
    pub duration_ms: i64,
    pub track: u32,
    pub disc: u32,
    pub compilation: bool,
    pub cover_url: Option<String>,
    /// Local path of the downloaded cover, once the cover stage saved one.
    pub art_local: Option<PathBuf>,
    /// `netease://<song_id>` media URL resolved later by the stream request.
    pub url: String,
}

impl Song {
    pub fn is_valid(&self) -> bool {
        !self.song_id.is_empty() && !self.title.is_empty()
    }
}

/// Aggregated query result, keyed by song id. Later inserts for the same id
/// overwrite earlier ones (last-write-wins).
pub type SongMap = BTreeMap<String, Song>;

/// Notifications emitted by a running query.
///
/// A query emits zero or more `Status`/`Progress` events and exactly one
/// terminal `Results` event.
#[derive(Debug, Clone)]
pub enum QueryEvent {
    Status {
        query_id: i32,
        text: String,
    },
    Progress {
        query_id: i32,
        percent: u8,
    },
    Results {
        query_id: i32,
        songs: SongMap,
        error: Option<String>,
    },
}

/// Outcome of an authentication attempt.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub success: bool,
    pub error: Option<String>,
}

/// Persisted session state.
///
/// Cookies are stored as a single `;`-joined `name=value` string under one
/// settings key, plus the unix timestamp the session was obtained at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub cookies: String,
    pub obtained_at: u64,
}

/// One lyrics search hit, with the fetched (timestamp-stripped) lyrics text.
#[derive(Debug, Clone, Default)]
pub struct LyricsResult {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub lyrics: String,
    pub score: f64,
}

/// One cover-art search hit.
#[derive(Debug, Clone)]
pub struct CoverSearchResult {
    pub artist: String,
    pub album: String,
    pub image_url: String,
    pub width: u32,
    pub height: u32,
}

/// A resolved stream URL for one song.
#[derive(Debug, Clone)]
pub struct StreamUrl {
    pub url: String,
    pub filetype: String,
    pub sample_rate: i32,
}

#[derive(Tabled)]
pub struct SongTableRow {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
}

#[derive(Tabled)]
pub struct CoverTableRow {
    pub artist: String,
    pub album: String,
    pub size: String,
    pub url: String,
}
