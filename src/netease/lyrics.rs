//! Lyrics search provider.
//!
//! A thin two-step flow over the unencrypted API: a cloudsearch for
//! candidate tracks, then one lyric fetch per candidate. Candidates are
//! deduplicated in a map keyed by the numeric track id (last wins), and
//! scored by their position in the search result.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::{
    netease::{ApiError, parse_json_object, transport::Transport},
    types::LyricsResult,
    utils,
};

const SEARCH_PATH: &str = "/api/cloudsearch/pc";
const LYRIC_PATH: &str = "/api/song/lyric";

pub struct LyricsProvider<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> LyricsProvider<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Searches lyrics for an artist/title pair.
    ///
    /// Candidates that fail to decode or have no lyrics are skipped; the
    /// remaining results carry timestamp-stripped lyrics text.
    pub async fn search(&self, artist: &str, title: &str) -> Result<Vec<LyricsResult>, ApiError> {
        let query = vec![
            ("type".to_string(), "1".to_string()),
            ("s".to_string(), format!("{} {}", title, artist)),
        ];

        let result = self.transport.get_api(SEARCH_PATH, &query).await;
        let json = parse_json_object(result)?;

        let songs = json
            .get("result")
            .filter(|value| value.is_object())
            .and_then(|result| result.get("songs"))
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::Validation("Json reply is missing result songs.".to_string()))?;

        let mut candidates: BTreeMap<i64, LyricsResult> = BTreeMap::new();
        for (index, entry) in songs.iter().enumerate() {
            let Some(object) = entry.as_object() else {
                continue;
            };
            let Some(track_id) = object.get("id").and_then(Value::as_i64) else {
                continue;
            };
            let Some(track_title) = object.get("name").and_then(Value::as_str) else {
                continue;
            };

            let track_artist = object
                .get("ar")
                .and_then(Value::as_array)
                .and_then(|entries| entries.first())
                .and_then(|first| first.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default();

            let Some(track_album) = object
                .get("al")
                .filter(|value| value.is_object())
                .and_then(|album| album.get("name"))
                .and_then(Value::as_str)
            else {
                continue;
            };

            let score = 0.1 * (songs.len() - index) as f64;

            // Map keyed by track id, last wins.
            candidates.insert(
                track_id,
                LyricsResult {
                    title: track_title.to_string(),
                    artist: track_artist.to_string(),
                    album: track_album.to_string(),
                    lyrics: String::new(),
                    score,
                },
            );
        }

        let mut results = Vec::new();
        for (track_id, mut candidate) in candidates {
            match self.fetch_lyric(track_id).await {
                Ok(lyric) if !lyric.is_empty() => {
                    candidate.lyrics = utils::lrc_to_plain(&lyric);
                    if !candidate.lyrics.is_empty() {
                        results.push(candidate);
                    }
                }
                _ => {}
            }
        }

        Ok(results)
    }

    async fn fetch_lyric(&self, track_id: i64) -> Result<String, ApiError> {
        let params = vec![
            ("id".to_string(), track_id.to_string()),
            ("tv".to_string(), "-1".to_string()),
            ("lv".to_string(), "-1".to_string()),
            ("rv".to_string(), "-1".to_string()),
            ("kv".to_string(), "-1".to_string()),
            ("_nmclfl".to_string(), "-1".to_string()),
        ];

        let result = self.transport.get_api(LYRIC_PATH, &params).await;
        let json = parse_json_object(result)?;

        let lyric = json
            .get("lrc")
            .filter(|value| value.is_object())
            .and_then(|lrc| lrc.get("lyric"))
            .and_then(Value::as_str)
            .ok_or_else(|| ApiError::Validation("Json lrc object does not contain lyric.".to_string()))?;

        Ok(lyric.to_string())
    }
}
