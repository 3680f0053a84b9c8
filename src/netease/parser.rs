//! Stateless decode functions for the vendor JSON shapes.
//!
//! Each function validates the keys it needs before reading them and reports
//! a [`ApiError::Validation`] when the overall shape is wrong; a malformed
//! item inside an array is skipped (with a note) without aborting its
//! siblings. Song pages additionally run a batch normalization pass: track
//! numbers are reassigned sequentially, disc numbers are kept only for
//! multi-disc pages, and a compilation flag on any song propagates to the
//! whole page.

use serde_json::Value;

use crate::{
    netease::ApiError,
    types::{Album, Artist, Song, StreamUrl, URL_SCHEME},
};

/// One page of an artist search reply.
#[derive(Debug, Default)]
pub struct ArtistsPage {
    pub artists: Vec<Artist>,
    /// Vendor-reported total; only meaningful on the offset-0 reply.
    pub total: Option<u32>,
    pub skipped: Vec<String>,
}

/// One page of an album search reply. Each album carries the artist identity
/// the vendor attached to it (falling back to the parent request's artist).
#[derive(Debug, Default)]
pub struct AlbumsPage {
    pub albums: Vec<(Artist, Album)>,
    pub total: Option<u32>,
    pub skipped: Vec<String>,
}

/// One page of an artist's album list. The page has no reported total; the
/// `more` flag drives continuation.
#[derive(Debug, Default)]
pub struct ArtistAlbumsPage {
    pub albums: Vec<(Artist, Album)>,
    pub more: bool,
    pub skipped: Vec<String>,
}

/// One page of decoded songs.
#[derive(Debug, Default)]
pub struct SongsPage {
    pub songs: Vec<Song>,
    /// Number of entries the vendor sent, including ones we skipped.
    pub reported: u32,
    pub total: Option<u32>,
    pub skipped: Vec<String>,
}

fn require_code(root: &Value) -> Result<(), ApiError> {
    match root.get("code").and_then(Value::as_i64) {
        Some(200) => Ok(()),
        Some(code) => Err(ApiError::Validation(format!(
            "Request failed with code {}",
            code
        ))),
        None => Err(ApiError::Validation("Unexpected response code.".to_string())),
    }
}

fn result_object(root: &Value) -> Result<&Value, ApiError> {
    root.get("result")
        .filter(|value| value.is_object())
        .ok_or_else(|| ApiError::Validation("Missing result object.".to_string()))
}

/// Reads an id that may arrive as a JSON number or string.
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(number) => Some(number.to_string()),
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        _ => None,
    }
}

fn count_field(object: &Value, key: &str) -> Option<u32> {
    object.get(key).and_then(Value::as_u64).map(|count| count as u32)
}

pub fn parse_artists_page(root: &Value) -> Result<ArtistsPage, ApiError> {
    require_code(root)?;
    let result = result_object(root)?;

    let artists_value = result
        .get("artists")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Validation("Missing artists array.".to_string()))?;

    let mut page = ArtistsPage {
        total: count_field(result, "artistCount"),
        ..Default::default()
    };

    for entry in artists_value {
        let Some(object) = entry.as_object() else {
            page.skipped.push("artist entry is not an object".to_string());
            continue;
        };
        let id = object.get("id").and_then(id_string);
        let name = object.get("name").and_then(Value::as_str);
        match (id, name) {
            (Some(artist_id), Some(artist)) => page.artists.push(Artist {
                artist_id,
                artist: artist.to_string(),
            }),
            _ => page
                .skipped
                .push("artist entry missing id or name".to_string()),
        }
    }

    Ok(page)
}

fn parse_album_entry(entry: &Value, parent: &Artist) -> Result<(Artist, Album), String> {
    let object = entry
        .as_object()
        .ok_or_else(|| "album entry is not an object".to_string())?;

    let album_id = object
        .get("id")
        .and_then(id_string)
        .ok_or_else(|| "album entry missing id".to_string())?;
    let album = object
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let cover_url = object
        .get("picUrl")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let mut artist = parent.clone();
    if let Some(inner) = entry.get("artist").filter(|value| value.is_object()) {
        if let (Some(artist_id), Some(name)) = (
            inner.get("id").and_then(id_string),
            inner.get("name").and_then(Value::as_str),
        ) {
            artist = Artist {
                artist_id,
                artist: name.to_string(),
            };
        }
    }

    Ok((
        artist,
        Album {
            album_id,
            album,
            cover_url,
        },
    ))
}

pub fn parse_albums_page(root: &Value, parent: &Artist) -> Result<AlbumsPage, ApiError> {
    require_code(root)?;
    let result = result_object(root)?;

    let albums_value = result
        .get("albums")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Validation("Missing albums array in result.".to_string()))?;

    let mut page = AlbumsPage {
        total: count_field(result, "albumCount"),
        ..Default::default()
    };

    for entry in albums_value {
        match parse_album_entry(entry, parent) {
            Ok(pair) => page.albums.push(pair),
            Err(reason) => page.skipped.push(reason),
        }
    }

    Ok(page)
}

pub fn parse_artist_albums_page(root: &Value, parent: &Artist) -> Result<ArtistAlbumsPage, ApiError> {
    require_code(root)?;

    let albums_value = root
        .get("hotAlbums")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Validation("Missing hotAlbums array.".to_string()))?;

    let mut page = ArtistAlbumsPage {
        more: root.get("more").and_then(Value::as_bool).unwrap_or(false),
        ..Default::default()
    };

    for entry in albums_value {
        match parse_album_entry(entry, parent) {
            Ok(pair) => page.albums.push(pair),
            Err(reason) => page.skipped.push(reason),
        }
    }

    Ok(page)
}

/// Decodes one song object, falling back to the parent request's artist and
/// album identity when the song-level sub-objects are absent or incomplete.
pub fn parse_song(object: &Value, parent_artist: &Artist, parent_album: &Album) -> Result<Song, String> {
    let (Some(id), Some(name), Some(duration_ms)) = (
        object.get("id").and_then(id_string),
        object.get("name").and_then(Value::as_str),
        object.get("dt").and_then(Value::as_i64),
    ) else {
        return Err("song missing required fields".to_string());
    };

    let mut artist_id = String::new();
    let mut artist = String::new();
    if let Some(entries) = object.get("ar").and_then(Value::as_array) {
        if let Some(first) = entries.first().filter(|value| value.is_object()) {
            artist_id = first.get("id").and_then(id_string).unwrap_or_default();
            artist = first
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
        }
    }

    let mut album_id = String::new();
    let mut album = String::new();
    let mut cover_url = String::new();
    if let Some(inner) = object.get("al").filter(|value| value.is_object()) {
        album_id = inner.get("id").and_then(id_string).unwrap_or_default();
        album = inner
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        cover_url = inner
            .get("picUrl")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }

    // A song whose own artist disagrees with the album artist marks a
    // various-artists page.
    let compilation =
        !artist.is_empty() && !parent_artist.artist.is_empty() && artist != parent_artist.artist;

    if artist_id.is_empty() || artist.is_empty() {
        artist_id = parent_artist.artist_id.clone();
        artist = parent_artist.artist.clone();
    }
    if album_id.is_empty() || album.is_empty() || cover_url.is_empty() {
        album_id = parent_album.album_id.clone();
        album = parent_album.album.clone();
        cover_url = parent_album.cover_url.clone();
    }

    let disc = object
        .get("cd")
        .map(|value| match value {
            Value::Number(number) => number.as_u64().unwrap_or(0) as u32,
            Value::String(text) => text.trim().parse().unwrap_or(0),
            _ => 0,
        })
        .unwrap_or(0);

    let url = format!("{}://{}", URL_SCHEME, id);

    Ok(Song {
        song_id: id,
        title: name.to_string(),
        artist_id,
        artist,
        album_id,
        album,
        duration_ms,
        track: 0,
        disc,
        compilation,
        cover_url: if cover_url.is_empty() {
            None
        } else {
            Some(cover_url)
        },
        art_local: None,
        url,
    })
}

/// Batch normalization over one decoded page.
///
/// Vendor track numbers are not trusted: tracks are renumbered sequentially
/// from 1 in array order. Disc numbers survive only when some song on the
/// page reports disc >= 2; a compilation flag on any song is applied to all.
pub fn normalize_page(songs: &mut [Song]) {
    let multidisc = songs.iter().any(|song| song.disc >= 2);
    let compilation = songs.iter().any(|song| song.compilation);

    for (index, song) in songs.iter_mut().enumerate() {
        song.track = index as u32 + 1;
        if !multidisc {
            song.disc = 0;
        }
        if compilation {
            song.compilation = true;
        }
    }
}

fn collect_songs(
    entries: &[Value],
    parent_artist: &Artist,
    parent_album: &Album,
    page: &mut SongsPage,
) {
    for entry in entries {
        page.reported += 1;
        match parse_song(entry, parent_artist, parent_album) {
            Ok(song) if song.is_valid() => page.songs.push(song),
            Ok(_) => page.skipped.push("song entry is not valid".to_string()),
            Err(reason) => page.skipped.push(reason),
        }
    }
    normalize_page(&mut page.songs);
}

/// Decodes a song search page (`result.songs`).
pub fn parse_songs_page(
    root: &Value,
    parent_artist: &Artist,
    parent_album: &Album,
) -> Result<SongsPage, ApiError> {
    require_code(root)?;
    let result = result_object(root)?;

    let songs_value = result
        .get("songs")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Validation("Missing songs array.".to_string()))?;

    let mut page = SongsPage {
        total: count_field(result, "songCount"),
        ..Default::default()
    };
    collect_songs(songs_value, parent_artist, parent_album, &mut page);

    Ok(page)
}

/// Decodes an album detail reply (`album` + `songs` at the root).
///
/// The reply's album object fills in identity fields the parent request
/// didn't know yet.
pub fn parse_album_songs_reply(
    root: &Value,
    parent_artist: &Artist,
    parent_album: &Album,
) -> Result<SongsPage, ApiError> {
    require_code(root)?;

    let album_value = root
        .get("album")
        .filter(|value| value.is_object())
        .ok_or_else(|| ApiError::Validation("Missing album object.".to_string()))?;

    let mut album = parent_album.clone();
    if album.album_id.is_empty() {
        album.album_id = album_value.get("id").and_then(id_string).unwrap_or_default();
    }
    if album.album.is_empty() {
        album.album = album_value
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }
    if album.cover_url.is_empty() {
        album.cover_url = album_value
            .get("picUrl")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
    }

    let songs_value = root
        .get("songs")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::Validation("Missing songs array.".to_string()))?;

    let mut page = SongsPage::default();
    collect_songs(songs_value, parent_artist, &album, &mut page);

    Ok(page)
}

/// Decodes a stream URL reply (`data[0]`).
pub fn parse_stream_url(root: &Value) -> Result<StreamUrl, ApiError> {
    require_code(root)?;

    let data = root
        .get("data")
        .and_then(Value::as_array)
        .filter(|entries| !entries.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing stream data array.".to_string()))?;

    let entry = &data[0];
    let url = entry
        .get("url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| ApiError::Validation("Missing stream url.".to_string()))?;

    let sample_rate = entry.get("sr").and_then(Value::as_i64).unwrap_or(-1) as i32;

    let mut filetype = entry
        .get("type")
        .or_else(|| entry.get("encodeType"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase();
    if filetype.is_empty() {
        filetype = url
            .split(['?', '#'])
            .next()
            .and_then(|path| path.rsplit_once('.'))
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
    }
    if filetype.is_empty() {
        filetype = "stream".to_string();
    }

    Ok(StreamUrl {
        url: url.to_string(),
        filetype,
        sample_rate,
    })
}
