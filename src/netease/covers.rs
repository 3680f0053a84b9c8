//! Cover-art search provider.
//!
//! Maps a cloudsearch over artist/album/title onto cover results; the
//! vendor serves covers at the requested size, reported here as 800x800.

use std::sync::Arc;

use serde_json::Value;

use crate::{
    netease::{ApiError, parse_json_object, transport::Transport},
    types::CoverSearchResult,
    utils,
};

const SEARCH_PATH: &str = "/api/cloudsearch/pc";
const COVER_SIZE: u32 = 800;

pub struct CoverProvider<T: Transport> {
    transport: Arc<T>,
}

impl<T: Transport> CoverProvider<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    pub async fn search(
        &self,
        artist: &str,
        album: &str,
        title: &str,
    ) -> Result<Vec<CoverSearchResult>, ApiError> {
        let mut parts = Vec::new();
        if !artist.is_empty() {
            parts.push(artist);
        }
        if !album.is_empty() {
            parts.push(album);
        }
        if !title.is_empty() {
            parts.push(title);
        }
        if parts.is_empty() {
            return Ok(Vec::new());
        }

        let query = vec![
            ("type".to_string(), "1".to_string()),
            ("s".to_string(), parts.join(" ")),
        ];

        let result = self.transport.get_api(SEARCH_PATH, &query).await;
        let json = parse_json_object(result)?;

        let songs = json
            .get("result")
            .filter(|value| value.is_object())
            .and_then(|result| result.get("songs"))
            .and_then(Value::as_array)
            .ok_or_else(|| ApiError::Validation("Json reply is missing result songs.".to_string()))?;

        let mut results = Vec::new();
        for entry in songs {
            let Some(object) = entry.as_object() else {
                continue;
            };

            let result_artist = object
                .get("ar")
                .and_then(Value::as_array)
                .and_then(|entries| entries.first())
                .and_then(|first| first.get("name"))
                .and_then(Value::as_str)
                .unwrap_or_default();

            let Some(album_object) = object.get("al").filter(|value| value.is_object()) else {
                continue;
            };
            let (Some(result_album), Some(image_url)) = (
                album_object.get("name").and_then(Value::as_str),
                album_object.get("picUrl").and_then(Value::as_str),
            ) else {
                continue;
            };

            results.push(CoverSearchResult {
                artist: result_artist.to_string(),
                album: utils::album_remove_disc(result_album),
                image_url: image_url.to_string(),
                width: COVER_SIZE,
                height: COVER_SIZE,
            });
        }

        Ok(results)
    }
}
