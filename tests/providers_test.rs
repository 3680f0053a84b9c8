use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use ncmcli::netease::covers::CoverProvider;
use ncmcli::netease::lyrics::LyricsProvider;
use ncmcli::netease::transport::Transport;
use ncmcli::netease::{RawReply, TransportResult};

/// GET-only scripted transport for the thin providers.
#[derive(Default)]
struct MockApi {
    responses: Mutex<HashMap<String, Vec<Value>>>,
    queries: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl MockApi {
    fn new() -> Self {
        Self::default()
    }

    fn push(&self, path: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push(body);
    }

    fn queries(&self) -> Vec<(String, Vec<(String, String)>)> {
        self.queries.lock().unwrap().clone()
    }
}

impl Transport for MockApi {
    async fn post_api(&self, path: &str, _params: &[(String, String)]) -> TransportResult {
        Err(format!("unexpected POST to {}", path))
    }

    async fn get_api(&self, path: &str, query: &[(String, String)]) -> TransportResult {
        self.queries
            .lock()
            .unwrap()
            .push((path.to_string(), query.to_vec()));

        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(path) {
            Some(queue) if !queue.is_empty() => Ok(RawReply {
                status: 200,
                mimetype: Some("application/json".to_string()),
                body: queue.remove(0).to_string().into_bytes(),
            }),
            _ => Err(format!("no scripted reply for {}", path)),
        }
    }

    async fn get_bytes(&self, url: &str) -> TransportResult {
        Err(format!("unexpected byte fetch of {}", url))
    }
}

fn lyrics_song(id: i64, title: &str) -> Value {
    json!({
        "id": id,
        "name": title,
        "ar": [{"id": 1, "name": "Artist"}],
        "al": {"id": 2, "name": "Album", "picUrl": "http://cover.example/2.jpg"}
    })
}

#[tokio::test]
async fn lyrics_candidates_dedup_by_id_last_wins() {
    let api = Arc::new(MockApi::new());

    api.push(
        "/api/cloudsearch/pc",
        json!({"code": 200, "result": {"songs": [
            lyrics_song(42, "First Title"),
            lyrics_song(42, "Second Title")
        ]}}),
    );
    // One candidate survives dedup, so exactly one lyric fetch happens.
    api.push(
        "/api/song/lyric",
        json!({"code": 200, "lrc": {"lyric": "[00:01.00] hello\n[00:02.00] world"}}),
    );

    let provider = LyricsProvider::new(Arc::clone(&api));
    let results = provider.search("Artist", "Title").await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Second Title");
    assert_eq!(results[0].lyrics, "hello\nworld");

    let lyric_queries: Vec<_> = api
        .queries()
        .into_iter()
        .filter(|(path, _)| path == "/api/song/lyric")
        .collect();
    assert_eq!(lyric_queries.len(), 1);
    assert!(
        lyric_queries[0]
            .1
            .iter()
            .any(|(name, value)| name == "id" && value == "42")
    );
}

#[tokio::test]
async fn lyrics_without_text_are_dropped() {
    let api = Arc::new(MockApi::new());

    api.push(
        "/api/cloudsearch/pc",
        json!({"code": 200, "result": {"songs": [lyrics_song(7, "Instrumental")]}}),
    );
    api.push("/api/song/lyric", json!({"code": 200, "lrc": {"lyric": ""}}));

    let provider = LyricsProvider::new(Arc::clone(&api));
    let results = provider.search("Artist", "Instrumental").await.unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn cover_search_maps_songs_to_cleaned_albums() {
    let api = Arc::new(MockApi::new());

    api.push(
        "/api/cloudsearch/pc",
        json!({"code": 200, "result": {"songs": [
            {"id": 1, "name": "S",
             "ar": [{"id": 1, "name": "Artist"}],
             "al": {"id": 2, "name": "Album (Disc 2)", "picUrl": "http://cover.example/2.jpg"}},
            {"id": 2, "name": "T", "ar": [], "al": {"id": 3, "name": "Other"}}
        ]}}),
    );

    let provider = CoverProvider::new(Arc::clone(&api));
    let results = provider.search("Artist", "Album", "").await.unwrap();

    // The entry without a picUrl is skipped.
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].album, "Album");
    assert_eq!(results[0].image_url, "http://cover.example/2.jpg");
    assert_eq!((results[0].width, results[0].height), (800, 800));
}

#[tokio::test]
async fn empty_cover_query_short_circuits() {
    let api = Arc::new(MockApi::new());
    let provider = CoverProvider::new(Arc::clone(&api));

    let results = provider.search("", "", "").await.unwrap();
    assert!(results.is_empty());
    assert!(api.queries().is_empty());
}
