use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::mpsc;

use ncmcli::netease::request::{QueryOptions, QueryOrchestrator};
use ncmcli::netease::transport::Transport;
use ncmcli::netease::{RawReply, TransportResult};
use ncmcli::types::{QueryEvent, QueryKind, SongMap};

type Params = Vec<(String, String)>;

/// Scripted transport: replies are queued per path and handed out in order;
/// every POST is logged so tests can assert the exact request sequence.
#[derive(Default)]
struct MockTransport {
    posts: Mutex<Vec<(String, Params)>>,
    responses: Mutex<HashMap<String, Vec<TransportResult>>>,
    byte_responses: Mutex<Vec<TransportResult>>,
    byte_requests: Mutex<Vec<String>>,
}

impl MockTransport {
    fn new() -> Self {
        Self::default()
    }

    fn push_json(&self, path: &str, body: Value) {
        self.responses
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_default()
            .push(Ok(RawReply {
                status: 200,
                mimetype: Some("application/json".to_string()),
                body: body.to_string().into_bytes(),
            }));
    }

    fn push_bytes(&self, reply: TransportResult) {
        self.byte_responses.lock().unwrap().push(reply);
    }

    fn logged_posts(&self) -> Vec<(String, Params)> {
        self.posts.lock().unwrap().clone()
    }

    fn logged_byte_requests(&self) -> Vec<String> {
        self.byte_requests.lock().unwrap().clone()
    }
}

impl Transport for MockTransport {
    async fn post_api(&self, path: &str, params: &[(String, String)]) -> TransportResult {
        self.posts
            .lock()
            .unwrap()
            .push((path.to_string(), params.to_vec()));

        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(path) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => Err(format!("no scripted reply for {}", path)),
        }
    }

    async fn get_api(&self, path: &str, _query: &[(String, String)]) -> TransportResult {
        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(path) {
            Some(queue) if !queue.is_empty() => queue.remove(0),
            _ => Err(format!("no scripted reply for {}", path)),
        }
    }

    async fn get_bytes(&self, url: &str) -> TransportResult {
        self.byte_requests.lock().unwrap().push(url.to_string());
        let mut responses = self.byte_responses.lock().unwrap();
        if responses.is_empty() {
            Err(format!("no scripted bytes for {}", url))
        } else {
            responses.remove(0)
        }
    }
}

fn options(fetch_covers: bool) -> QueryOptions {
    QueryOptions {
        authenticated: true,
        fetch_covers,
        artists_search_limit: 0,
        albums_search_limit: 0,
        songs_search_limit: 50,
        cover_dir: std::env::temp_dir().join("ncmcli-test-covers"),
        cover_size: 800,
    }
}

fn song_json(id: u32) -> Value {
    json!({
        "id": id,
        "name": format!("Song {}", id),
        "dt": 180_000,
        "ar": [{"id": 7, "name": "Artist"}],
        "al": {"id": 3, "name": "Album", "picUrl": "http://cover.example/a.jpg"}
    })
}

/// Runs a query against the mock and returns every emitted event.
async fn run_query(
    transport: Arc<MockTransport>,
    kind: QueryKind,
    text: &str,
    opts: QueryOptions,
) -> Vec<QueryEvent> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut orchestrator = QueryOrchestrator::new(transport, kind, opts, events_tx);
    orchestrator.search(1, text);

    tokio::time::timeout(Duration::from_secs(600), orchestrator.run())
        .await
        .expect("query did not terminate");

    let mut events = Vec::new();
    while let Ok(event) = events_rx.try_recv() {
        events.push(event);
    }
    events
}

fn results_events(events: &[QueryEvent]) -> Vec<(SongMap, Option<String>)> {
    events
        .iter()
        .filter_map(|event| match event {
            QueryEvent::Results { songs, error, .. } => Some((songs.clone(), error.clone())),
            _ => None,
        })
        .collect()
}

fn offset_param(params: &Params) -> Option<String> {
    params
        .iter()
        .find(|(name, _)| name == "offset")
        .map(|(_, value)| value.clone())
}

#[tokio::test(start_paused = true)]
async fn songs_search_pagination_covers_all_offsets() {
    let transport = Arc::new(MockTransport::new());
    let path = "/weapi/cloudsearch/get/web";

    transport.push_json(
        path,
        json!({"code": 200, "result": {"songCount": 25, "songs": (1..=10).map(song_json).collect::<Vec<_>>()}}),
    );
    transport.push_json(
        path,
        json!({"code": 200, "result": {"songs": (11..=20).map(song_json).collect::<Vec<_>>()}}),
    );
    transport.push_json(
        path,
        json!({"code": 200, "result": {"songs": (21..=25).map(song_json).collect::<Vec<_>>()}}),
    );

    let events = run_query(
        Arc::clone(&transport),
        QueryKind::SearchSongs,
        "X",
        options(false),
    )
    .await;

    let posts = transport.logged_posts();
    assert_eq!(posts.len(), 3);
    assert_eq!(offset_param(&posts[0].1), None);
    assert_eq!(offset_param(&posts[1].1), Some("10".to_string()));
    assert_eq!(offset_param(&posts[2].1), Some("20".to_string()));

    let results = results_events(&events);
    assert_eq!(results.len(), 1, "exactly one Results emission");
    let (songs, error) = &results[0];
    assert_eq!(songs.len(), 25);
    assert_eq!(*error, None);
}

#[tokio::test(start_paused = true)]
async fn api_error_yields_empty_results_with_formatted_message() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json("/weapi/search/get", json!({"code": 400, "msg": "invalid"}));

    let events = run_query(
        Arc::clone(&transport),
        QueryKind::FavouriteArtists,
        "",
        options(false),
    )
    .await;

    let results = results_events(&events);
    assert_eq!(results.len(), 1);
    let (songs, error) = &results[0];
    assert!(songs.is_empty());
    assert_eq!(*error, Some("invalid (400)".to_string()));
}

#[tokio::test(start_paused = true)]
async fn favourite_artists_cascade_drains_stage_by_stage() {
    let transport = Arc::new(MockTransport::new());

    transport.push_json(
        "/weapi/search/get",
        json!({"code": 200, "result": {"artistCount": 2, "artists": [
            {"id": 1, "name": "Artist One"},
            {"id": 2, "name": "Artist Two"}
        ]}}),
    );
    transport.push_json(
        "/weapi/artist/albums/1",
        json!({"code": 200, "more": false, "hotAlbums": [
            {"id": 11, "name": "Album One", "picUrl": "http://cover.example/11.jpg",
             "artist": {"id": 1, "name": "Artist One"}}
        ]}),
    );
    transport.push_json(
        "/weapi/artist/albums/2",
        json!({"code": 200, "more": false, "hotAlbums": [
            {"id": 22, "name": "Album Two", "picUrl": "http://cover.example/22.jpg",
             "artist": {"id": 2, "name": "Artist Two"}}
        ]}),
    );
    transport.push_json(
        "/weapi/v1/album/11",
        json!({"code": 200,
               "album": {"id": 11, "name": "Album One", "picUrl": "http://cover.example/11.jpg"},
               "songs": [
                   {"id": 111, "name": "One-1", "dt": 1000},
                   {"id": 112, "name": "One-2", "dt": 2000}
               ]}),
    );
    transport.push_json(
        "/weapi/v1/album/22",
        json!({"code": 200,
               "album": {"id": 22, "name": "Album Two", "picUrl": "http://cover.example/22.jpg"},
               "songs": [
                   {"id": 221, "name": "Two-1", "dt": 3000},
                   {"id": 222, "name": "Two-2", "dt": 4000}
               ]}),
    );

    let events = run_query(
        Arc::clone(&transport),
        QueryKind::FavouriteArtists,
        "",
        options(false),
    )
    .await;

    let results = results_events(&events);
    assert_eq!(results.len(), 1);
    let (songs, error) = &results[0];
    assert_eq!(songs.len(), 4);
    assert_eq!(*error, None);

    // Songs with no own artist/album identity fall back to their parents.
    let song = songs.get("111").expect("song 111 present");
    assert_eq!(song.artist, "Artist One");
    assert_eq!(song.album, "Album One");

    // Album-songs requests only start after every artist-albums page drained.
    let posts = transport.logged_posts();
    let paths: Vec<&str> = posts.iter().map(|(path, _)| path.as_str()).collect();
    let last_artist_albums = paths
        .iter()
        .rposition(|path| path.starts_with("/weapi/artist/albums/"))
        .unwrap();
    let first_album_songs = paths
        .iter()
        .position(|path| path.starts_with("/weapi/v1/album/"))
        .unwrap();
    assert!(last_artist_albums < first_album_songs);
}

#[tokio::test(start_paused = true)]
async fn duplicate_artist_produces_single_artist_albums_request() {
    let transport = Arc::new(MockTransport::new());

    transport.push_json(
        "/weapi/search/get",
        json!({"code": 200, "result": {"artistCount": 2, "artists": [
            {"id": 1, "name": "Artist One"},
            {"id": 1, "name": "Artist One"}
        ]}}),
    );
    // Continuation page at offset 1 comes back empty.
    transport.push_json(
        "/weapi/search/get",
        json!({"code": 200, "result": {"artists": []}}),
    );
    transport.push_json(
        "/weapi/artist/albums/1",
        json!({"code": 200, "more": false, "hotAlbums": []}),
    );

    let events = run_query(
        Arc::clone(&transport),
        QueryKind::FavouriteArtists,
        "",
        options(false),
    )
    .await;

    let posts = transport.logged_posts();
    let artist_albums_posts: Vec<_> = posts
        .iter()
        .filter(|(path, _)| path.starts_with("/weapi/artist/albums/"))
        .collect();
    assert_eq!(artist_albums_posts.len(), 1);
    assert_eq!(artist_albums_posts[0].0, "/weapi/artist/albums/1");

    assert_eq!(results_events(&events).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn artist_albums_continuation_follows_more_flag() {
    let transport = Arc::new(MockTransport::new());

    transport.push_json(
        "/weapi/search/get",
        json!({"code": 200, "result": {"artistCount": 1, "artists": [
            {"id": 1, "name": "Artist One"}
        ]}}),
    );
    transport.push_json(
        "/weapi/artist/albums/1",
        json!({"code": 200, "more": true, "hotAlbums": [
            {"id": 11, "name": "Album One", "picUrl": ""}
        ]}),
    );
    transport.push_json(
        "/weapi/artist/albums/1",
        json!({"code": 200, "more": false, "hotAlbums": [
            {"id": 12, "name": "Album Two", "picUrl": ""}
        ]}),
    );
    transport.push_json(
        "/weapi/v1/album/11",
        json!({"code": 200, "album": {"id": 11}, "songs": [{"id": 111, "name": "S1", "dt": 1000}]}),
    );
    transport.push_json(
        "/weapi/v1/album/12",
        json!({"code": 200, "album": {"id": 12}, "songs": [{"id": 121, "name": "S2", "dt": 1000}]}),
    );

    let events = run_query(
        Arc::clone(&transport),
        QueryKind::FavouriteArtists,
        "",
        options(false),
    )
    .await;

    let posts = transport.logged_posts();
    let artist_albums: Vec<_> = posts
        .iter()
        .filter(|(path, _)| path == "/weapi/artist/albums/1")
        .collect();
    assert_eq!(artist_albums.len(), 2);
    assert_eq!(offset_param(&artist_albums[0].1), Some("0".to_string()));
    assert_eq!(offset_param(&artist_albums[1].1), Some("1".to_string()));

    let results = results_events(&events);
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn empty_search_page_reports_no_match() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(
        "/weapi/cloudsearch/get/web",
        json!({"code": 200, "result": {"songCount": 0, "songs": []}}),
    );

    let events = run_query(
        Arc::clone(&transport),
        QueryKind::SearchSongs,
        "X",
        options(false),
    )
    .await;

    let results = results_events(&events);
    assert_eq!(results.len(), 1);
    let (songs, error) = &results[0];
    assert!(songs.is_empty());
    assert_eq!(*error, Some("No match.".to_string()));
}

#[tokio::test(start_paused = true)]
async fn empty_favourites_page_stays_silent() {
    let transport = Arc::new(MockTransport::new());
    transport.push_json(
        "/weapi/cloudsearch/get/web",
        json!({"code": 200, "result": {"songCount": 0, "songs": []}}),
    );

    let events = run_query(
        Arc::clone(&transport),
        QueryKind::FavouriteSongs,
        "",
        options(false),
    )
    .await;

    let results = results_events(&events);
    assert_eq!(results.len(), 1);
    let (songs, error) = &results[0];
    assert!(songs.is_empty());
    assert_eq!(*error, None);
}

#[tokio::test(start_paused = true)]
async fn cover_failure_degrades_without_losing_songs() {
    let transport = Arc::new(MockTransport::new());

    transport.push_json(
        "/weapi/cloudsearch/get/web",
        json!({"code": 200, "result": {"songCount": 2, "songs": [song_json(1), song_json(2)]}}),
    );
    // The cover reply is not an image.
    transport.push_bytes(Ok(RawReply {
        status: 200,
        mimetype: Some("text/html".to_string()),
        body: b"<html>not an image</html>".to_vec(),
    }));

    let events = run_query(
        Arc::clone(&transport),
        QueryKind::FavouriteSongs,
        "",
        options(true),
    )
    .await;

    // Both songs share one album, so one cover request covers both.
    assert_eq!(transport.logged_byte_requests().len(), 1);

    let results = results_events(&events);
    assert_eq!(results.len(), 1);
    let (songs, error) = &results[0];
    assert_eq!(songs.len(), 2);
    assert!(songs.values().all(|song| song.art_local.is_none()));
    assert!(error.as_deref().unwrap_or_default().contains("Unsupported mimetype"));
}

#[tokio::test(start_paused = true)]
async fn unauthenticated_query_sends_nothing() {
    let transport = Arc::new(MockTransport::new());

    let mut opts = options(false);
    opts.authenticated = false;

    let events = run_query(
        Arc::clone(&transport),
        QueryKind::FavouriteSongs,
        "",
        opts,
    )
    .await;

    assert!(transport.logged_posts().is_empty());
    assert!(results_events(&events).is_empty());
    assert!(events.iter().any(|event| matches!(
        event,
        QueryEvent::Status { text, .. } if text == "Not authenticated."
    )));
}
