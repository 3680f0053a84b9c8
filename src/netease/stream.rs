//! Stream URL resolution for a single song.

use std::sync::Arc;

use crate::{
    netease::{parse_json_object, parser, transport::Transport},
    types::StreamUrl,
};

const STREAM_URL_PATH: &str = "/weapi/song/enhance/player/url/v1";

pub struct StreamUrlRequest<T: Transport> {
    transport: Arc<T>,
    authenticated: bool,
    song_id: String,
}

impl<T: Transport> StreamUrlRequest<T> {
    pub fn new(transport: Arc<T>, authenticated: bool, song_id: &str) -> Self {
        Self {
            transport,
            authenticated,
            song_id: song_id.to_string(),
        }
    }

    /// Resolves the stream URL, failing up front when not authenticated.
    pub async fn process(&self) -> Result<StreamUrl, String> {
        if !self.authenticated {
            return Err("Not authenticated with Netease.".to_string());
        }

        let params = vec![
            ("ids".to_string(), format!("[{}]", self.song_id)),
            ("level".to_string(), "exhigh".to_string()),
            ("encodeType".to_string(), "flac".to_string()),
        ];

        let result = self.transport.post_api(STREAM_URL_PATH, &params).await;
        let json = parse_json_object(result).map_err(|e| e.to_string())?;
        parser::parse_stream_url(&json).map_err(|e| e.to_string())
    }
}
