//! The per-query request orchestrator.
//!
//! One [`QueryOrchestrator`] drives one logical query from initiation to a
//! single terminal result. A query fans out into cascading dependent
//! requests (artists → artist's albums → album's songs → album covers),
//! bounded by per-kind concurrency caps and paced by a fixed-interval
//! dispatch tick. Every reply funnels through one handler that updates the
//! wave counters and always re-evaluates the global finish predicate, so a
//! query emits exactly one `Results` event no matter which paths its
//! requests took.
//!
//! All state is owned by the orchestrator task: reply callbacks only ever
//! run inside its `select!` loop, so no locks are needed. In-flight
//! requests live in a `JoinSet` and are aborted when the orchestrator is
//! dropped; replies for requests no longer tracked are discarded without
//! side effects.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::{MissedTickBehavior, interval};

use crate::{
    config,
    netease::{ApiError, TransportResult, parse_json_object, parser, transport::Transport},
    types::{Album, Artist, QueryEvent, QueryKind, Song, SongMap},
    utils,
};

const MAX_CONCURRENT_ARTISTS_REQUESTS: u32 = 1;
const MAX_CONCURRENT_ALBUMS_REQUESTS: u32 = 1;
const MAX_CONCURRENT_SONGS_REQUESTS: u32 = 1;
const MAX_CONCURRENT_ARTIST_ALBUMS_REQUESTS: u32 = 1;
const MAX_CONCURRENT_ALBUM_SONGS_REQUESTS: u32 = 1;
const MAX_CONCURRENT_ALBUM_COVER_REQUESTS: u32 = 10;
const FLUSH_REQUESTS_INTERVAL: Duration = Duration::from_millis(200);

/// Tunables for one query, snapshotted from config by the facade.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub authenticated: bool,
    /// Fetch album covers after everything else drained (favourites only).
    pub fetch_covers: bool,
    pub artists_search_limit: u32,
    pub albums_search_limit: u32,
    pub songs_search_limit: u32,
    pub cover_dir: PathBuf,
    pub cover_size: u32,
}

impl QueryOptions {
    pub fn from_config(authenticated: bool, fetch_covers: bool) -> Self {
        Self {
            authenticated,
            fetch_covers,
            artists_search_limit: config::artists_search_limit(),
            albums_search_limit: config::albums_search_limit(),
            songs_search_limit: config::songs_search_limit(),
            cover_dir: config::cover_dir(),
            cover_size: config::cover_size(),
        }
    }
}

/// Request counters for one kind, an explicit little state machine instead
/// of free integers: a request is enqueued, dispatched, then completed;
/// items track page contents for pagination and progress.
#[derive(Debug, Default)]
struct Wave {
    requests_total: u32,
    requests_active: u32,
    requests_received: u32,
    items_total: u32,
    items_received: u32,
}

impl Wave {
    fn enqueued(&mut self) {
        self.requests_total += 1;
    }

    fn dispatched(&mut self) {
        self.requests_active += 1;
    }

    fn completed(&mut self) {
        self.requests_active = self.requests_active.saturating_sub(1);
        self.requests_received += 1;
    }

    /// Drained: nothing queued for this kind and nothing in flight.
    fn drained(&self, queue_empty: bool) -> bool {
        queue_empty && self.requests_active == 0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct PageRequest {
    offset: u32,
    limit: u32,
}

#[derive(Debug, Clone)]
struct ArtistAlbumsRequest {
    artist: Artist,
    offset: u32,
}

#[derive(Debug, Clone)]
struct AlbumSongsRequest {
    artist: Artist,
    album: Album,
    offset: u32,
}

#[derive(Debug, Clone)]
struct AlbumCoverRequest {
    album_id: String,
    url: String,
    dest: PathBuf,
}

struct ReplyEnvelope {
    request_id: u64,
    payload: ReplyPayload,
}

enum ReplyPayload {
    ArtistsPage {
        limit: u32,
        offset: u32,
        result: TransportResult,
    },
    AlbumsPage {
        limit: u32,
        offset: u32,
        result: TransportResult,
    },
    SongsPage {
        limit: u32,
        offset: u32,
        result: TransportResult,
    },
    ArtistAlbums {
        artist: Artist,
        offset: u32,
        result: TransportResult,
    },
    AlbumSongs {
        artist: Artist,
        album: Album,
        offset: u32,
        result: TransportResult,
    },
    AlbumCover {
        album_id: String,
        url: String,
        dest: PathBuf,
        result: TransportResult,
    },
}

/// Drives one query to its terminal result. See the module docs.
pub struct QueryOrchestrator<T: Transport> {
    transport: Arc<T>,
    kind: QueryKind,
    options: QueryOptions,
    events: mpsc::UnboundedSender<QueryEvent>,

    query_id: i32,
    search_text: String,
    finished: bool,
    no_results: bool,
    last_error: Option<String>,

    replies_tx: mpsc::UnboundedSender<ReplyEnvelope>,
    replies_rx: mpsc::UnboundedReceiver<ReplyEnvelope>,
    inflight: JoinSet<()>,
    next_request_id: u64,
    tracked: HashSet<u64>,

    artists_queue: VecDeque<PageRequest>,
    albums_queue: VecDeque<PageRequest>,
    songs_queue: VecDeque<PageRequest>,
    artist_albums_queue: VecDeque<ArtistAlbumsRequest>,
    album_songs_queue: VecDeque<AlbumSongsRequest>,
    covers_queue: VecDeque<AlbumCoverRequest>,

    artists: Wave,
    albums: Wave,
    songs: Wave,
    artist_albums: Wave,
    album_songs: Wave,
    covers: Wave,

    /// Dedup sets: at most one queued/in-flight child request per parent key.
    pending_artist_albums: BTreeMap<String, ArtistAlbumsRequest>,
    pending_album_songs: BTreeMap<String, AlbumSongsRequest>,
    /// album_id → songs waiting for that album's cover.
    covers_waiting: BTreeMap<String, Vec<String>>,

    songs_map: SongMap,
}

impl<T: Transport> QueryOrchestrator<T> {
    pub fn new(
        transport: Arc<T>,
        kind: QueryKind,
        options: QueryOptions,
        events: mpsc::UnboundedSender<QueryEvent>,
    ) -> Self {
        let (replies_tx, replies_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            kind,
            options,
            events,
            query_id: -1,
            search_text: String::new(),
            finished: false,
            no_results: false,
            last_error: None,
            replies_tx,
            replies_rx,
            inflight: JoinSet::new(),
            next_request_id: 0,
            tracked: HashSet::new(),
            artists_queue: VecDeque::new(),
            albums_queue: VecDeque::new(),
            songs_queue: VecDeque::new(),
            artist_albums_queue: VecDeque::new(),
            album_songs_queue: VecDeque::new(),
            covers_queue: VecDeque::new(),
            artists: Wave::default(),
            albums: Wave::default(),
            songs: Wave::default(),
            artist_albums: Wave::default(),
            album_songs: Wave::default(),
            covers: Wave::default(),
            pending_artist_albums: BTreeMap::new(),
            pending_album_songs: BTreeMap::new(),
            covers_waiting: BTreeMap::new(),
            songs_map: SongMap::new(),
        }
    }

    /// Sets the correlation id and free-text query prior to [`Self::run`].
    pub fn search(&mut self, query_id: i32, search_text: &str) {
        self.query_id = query_id;
        self.search_text = search_text.to_string();
    }

    /// Runs the query to completion, emitting events along the way.
    ///
    /// Requires an authenticated session; otherwise a not-authenticated
    /// status is reported and nothing is started (the caller may retry
    /// after authentication completes).
    pub async fn run(mut self) {
        if !self.options.authenticated {
            self.emit_status("Not authenticated.");
            return;
        }

        self.process();

        let mut ticker = interval(FLUSH_REQUESTS_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while !self.finished {
            tokio::select! {
                _ = ticker.tick() => self.flush_requests(),
                reply = self.replies_rx.recv() => {
                    match reply {
                        Some(envelope) => self.handle_reply(envelope),
                        None => break,
                    }
                }
            }
        }
    }

    fn process(&mut self) {
        match self.kind {
            QueryKind::FavouriteArtists => {
                self.emit_status("Receiving artists...");
                self.emit_progress(0);
                self.add_artists_request(0, 0);
            }
            QueryKind::FavouriteAlbums => {
                self.emit_status("Receiving albums...");
                self.emit_progress(0);
                self.add_albums_request(0, 0);
            }
            QueryKind::FavouriteSongs => {
                self.emit_status("Receiving songs...");
                self.emit_progress(0);
                self.add_songs_request(0, 0);
            }
            QueryKind::SearchArtists => {
                self.emit_status("Searching...");
                self.emit_progress(0);
                self.add_artists_request(0, self.options.artists_search_limit);
            }
            QueryKind::SearchAlbums => {
                self.emit_status("Searching...");
                self.emit_progress(0);
                self.add_albums_request(0, self.options.albums_search_limit);
            }
            QueryKind::SearchSongs => {
                self.emit_status("Searching...");
                self.emit_progress(0);
                self.add_songs_request(0, self.options.songs_search_limit);
            }
        }
    }

    // ---- queueing ----

    fn add_artists_request(&mut self, offset: u32, limit: u32) {
        self.artists_queue.push_back(PageRequest { offset, limit });
        self.artists.enqueued();
    }

    fn add_albums_request(&mut self, offset: u32, limit: u32) {
        self.albums_queue.push_back(PageRequest { offset, limit });
        self.albums.enqueued();
    }

    fn add_songs_request(&mut self, offset: u32, limit: u32) {
        self.songs_queue.push_back(PageRequest { offset, limit });
        self.songs.enqueued();
    }

    fn add_artist_albums_request(&mut self, artist: Artist, offset: u32) {
        self.artist_albums_queue
            .push_back(ArtistAlbumsRequest { artist, offset });
        self.artist_albums.enqueued();
    }

    fn add_album_songs_request(&mut self, artist: Artist, album: Album, offset: u32) {
        self.album_songs_queue.push_back(AlbumSongsRequest {
            artist,
            album,
            offset,
        });
        self.album_songs.enqueued();
    }

    fn add_album_cover_request(&mut self, song: &Song) {
        let Some(cover_url) = song.cover_url.clone() else {
            return;
        };

        if let Some(waiting) = self.covers_waiting.get_mut(&song.album_id) {
            waiting.push(song.song_id.clone());
            return;
        }

        let Some(dest) = utils::cover_file_path(&self.options.cover_dir, &song.album_id, &cover_url)
        else {
            return;
        };

        let size = self.options.cover_size;
        let url = format!("{}?param={}y{}", cover_url, size, size);

        self.covers_waiting
            .insert(song.album_id.clone(), vec![song.song_id.clone()]);
        self.covers.enqueued();
        self.covers_queue.push_back(AlbumCoverRequest {
            album_id: song.album_id.clone(),
            url,
            dest,
        });
    }

    // ---- dispatch ----

    /// One tick: flush the first non-empty queue, in fixed priority order,
    /// up to its concurrency cap.
    fn flush_requests(&mut self) {
        if !self.artists_queue.is_empty() {
            self.flush_artists_requests();
            return;
        }
        if !self.albums_queue.is_empty() {
            self.flush_albums_requests();
            return;
        }
        if !self.artist_albums_queue.is_empty() {
            self.flush_artist_albums_requests();
            return;
        }
        if !self.album_songs_queue.is_empty() {
            self.flush_album_songs_requests();
            return;
        }
        if !self.songs_queue.is_empty() {
            self.flush_songs_requests();
            return;
        }
        if !self.covers_queue.is_empty() {
            self.flush_album_cover_requests();
        }
    }

    fn track_next(&mut self) -> u64 {
        self.next_request_id += 1;
        self.tracked.insert(self.next_request_id);
        self.next_request_id
    }

    fn spawn_post(
        &mut self,
        path: String,
        params: Vec<(String, String)>,
        build: impl FnOnce(TransportResult) -> ReplyPayload + Send + 'static,
    ) {
        let request_id = self.track_next();
        let transport = Arc::clone(&self.transport);
        let tx = self.replies_tx.clone();
        self.inflight.spawn(async move {
            let result = transport.post_api(&path, &params).await;
            let _ = tx.send(ReplyEnvelope {
                request_id,
                payload: build(result),
            });
        });
    }

    fn flush_artists_requests(&mut self) {
        while self.artists.requests_active < MAX_CONCURRENT_ARTISTS_REQUESTS {
            let Some(request) = self.artists_queue.pop_front() else {
                break;
            };

            let mut params = vec![
                ("type".to_string(), "100".to_string()),
                ("s".to_string(), self.search_text.clone()),
            ];
            if request.limit > 0 {
                params.push(("limit".to_string(), request.limit.to_string()));
            }
            if request.offset > 0 {
                params.push(("offset".to_string(), request.offset.to_string()));
            }

            self.spawn_post("/weapi/search/get".to_string(), params, move |result| {
                ReplyPayload::ArtistsPage {
                    limit: request.limit,
                    offset: request.offset,
                    result,
                }
            });
            self.artists.dispatched();
        }
    }

    fn flush_albums_requests(&mut self) {
        while self.albums.requests_active < MAX_CONCURRENT_ALBUMS_REQUESTS {
            let Some(request) = self.albums_queue.pop_front() else {
                break;
            };

            let mut params = vec![
                ("type".to_string(), "10".to_string()),
                ("s".to_string(), self.search_text.clone()),
            ];
            if request.limit > 0 {
                params.push(("limit".to_string(), request.limit.to_string()));
            }
            if request.offset > 0 {
                params.push(("offset".to_string(), request.offset.to_string()));
            }

            self.spawn_post("/weapi/search/get".to_string(), params, move |result| {
                ReplyPayload::AlbumsPage {
                    limit: request.limit,
                    offset: request.offset,
                    result,
                }
            });
            self.albums.dispatched();
        }
    }

    fn flush_songs_requests(&mut self) {
        while self.songs.requests_active < MAX_CONCURRENT_SONGS_REQUESTS {
            let Some(request) = self.songs_queue.pop_front() else {
                break;
            };

            let mut params = vec![
                ("type".to_string(), "1".to_string()),
                ("s".to_string(), self.search_text.clone()),
            ];
            if request.limit > 0 {
                params.push(("limit".to_string(), request.limit.to_string()));
            }
            if request.offset > 0 {
                params.push(("offset".to_string(), request.offset.to_string()));
            }

            self.spawn_post(
                "/weapi/cloudsearch/get/web".to_string(),
                params,
                move |result| ReplyPayload::SongsPage {
                    limit: request.limit,
                    offset: request.offset,
                    result,
                },
            );
            self.songs.dispatched();
        }
    }

    fn flush_artist_albums_requests(&mut self) {
        while self.artist_albums.requests_active < MAX_CONCURRENT_ARTIST_ALBUMS_REQUESTS {
            let Some(request) = self.artist_albums_queue.pop_front() else {
                break;
            };

            let params = vec![("offset".to_string(), request.offset.to_string())];
            let path = format!("/weapi/artist/albums/{}", request.artist.artist_id);

            self.spawn_post(path, params, move |result| ReplyPayload::ArtistAlbums {
                artist: request.artist,
                offset: request.offset,
                result,
            });
            self.artist_albums.dispatched();
        }
    }

    fn flush_album_songs_requests(&mut self) {
        while self.album_songs.requests_active < MAX_CONCURRENT_ALBUM_SONGS_REQUESTS {
            let Some(request) = self.album_songs_queue.pop_front() else {
                break;
            };

            let mut params = Vec::new();
            if request.offset > 0 {
                params.push(("offset".to_string(), request.offset.to_string()));
            }
            let path = format!("/weapi/v1/album/{}", request.album.album_id);

            self.spawn_post(path, params, move |result| ReplyPayload::AlbumSongs {
                artist: request.artist,
                album: request.album,
                offset: request.offset,
                result,
            });
            self.album_songs.dispatched();
        }
    }

    fn flush_album_cover_requests(&mut self) {
        while self.covers.requests_active < MAX_CONCURRENT_ALBUM_COVER_REQUESTS {
            let Some(request) = self.covers_queue.pop_front() else {
                break;
            };

            let request_id = self.track_next();
            let transport = Arc::clone(&self.transport);
            let tx = self.replies_tx.clone();
            self.inflight.spawn(async move {
                let result = transport.get_bytes(&request.url).await;
                let _ = tx.send(ReplyEnvelope {
                    request_id,
                    payload: ReplyPayload::AlbumCover {
                        album_id: request.album_id,
                        url: request.url,
                        dest: request.dest,
                        result,
                    },
                });
            });
            self.covers.dispatched();
        }
    }

    // ---- reply funnel ----

    /// Single entry point for every reply. Untracked replies (query already
    /// finished or superseded request) are dropped without side effects;
    /// tracked ones run their kind handler and then the global finish check.
    fn handle_reply(&mut self, envelope: ReplyEnvelope) {
        if !self.tracked.remove(&envelope.request_id) {
            return;
        }

        match envelope.payload {
            ReplyPayload::ArtistsPage {
                limit,
                offset,
                result,
            } => self.on_artists_reply(limit, offset, result),
            ReplyPayload::AlbumsPage {
                limit,
                offset,
                result,
            } => self.on_albums_reply(limit, offset, result),
            ReplyPayload::SongsPage {
                limit,
                offset,
                result,
            } => self.on_songs_reply(limit, offset, result),
            ReplyPayload::ArtistAlbums {
                artist,
                offset,
                result,
            } => self.on_artist_albums_reply(artist, offset, result),
            ReplyPayload::AlbumSongs {
                artist,
                album,
                offset,
                result,
            } => self.on_album_songs_reply(artist, album, offset, result),
            ReplyPayload::AlbumCover {
                album_id,
                url,
                dest,
                result,
            } => self.on_album_cover_reply(album_id, url, dest, result),
        }

        self.finish_check();
    }

    // ---- artists ----

    fn on_artists_reply(&mut self, limit: u32, offset: u32, result: TransportResult) {
        self.artists.completed();
        if self.finished {
            return;
        }
        let received = self.process_artists_page(offset, result);
        self.artists_finish_check(limit, offset, received);
    }

    fn process_artists_page(&mut self, offset: u32, result: TransportResult) -> u32 {
        let json = match parse_json_object(result) {
            Ok(json) => json,
            Err(err) => {
                self.record_error(err);
                return 0;
            }
        };
        let page = match parser::parse_artists_page(&json) {
            Ok(page) => page,
            Err(err) => {
                self.record_error(err);
                return 0;
            }
        };
        for reason in &page.skipped {
            self.record_error(ApiError::Validation(format!("Invalid artist entry: {}", reason)));
        }

        if page.artists.is_empty() && page.skipped.is_empty() {
            if offset == 0 {
                self.no_results = true;
            }
            return 0;
        }

        if offset == 0 {
            self.artists.items_total = page.total.unwrap_or(page.artists.len() as u32);
        }

        let mut received = 0;
        for artist in page.artists {
            if self.pending_artist_albums.contains_key(&artist.artist_id) {
                continue;
            }
            self.pending_artist_albums.insert(
                artist.artist_id.clone(),
                ArtistAlbumsRequest { artist, offset: 0 },
            );
            received += 1;
        }

        self.artists.items_received += received;
        self.emit_progress(utils::progress(
            self.artists.items_received,
            self.artists.items_total,
        ));

        received
    }

    fn artists_finish_check(&mut self, limit: u32, offset: u32, received: u32) {
        if self.finished {
            return;
        }

        if received > 0
            && (limit == 0 || limit > received)
            && offset + received < self.artists.items_total
        {
            self.add_artists_request(offset + received, limit);
        }

        // Artist query is finished: get all albums for all artists.
        if self.artists.drained(self.artists_queue.is_empty()) {
            let pending: Vec<ArtistAlbumsRequest> =
                self.pending_artist_albums.values().cloned().collect();
            self.pending_artist_albums.clear();
            for request in pending {
                self.add_artist_albums_request(request.artist, 0);
            }

            let total = self.artist_albums.requests_total;
            if total > 0 {
                if total == 1 {
                    self.emit_status(&format!("Receiving albums for {} artist...", total));
                } else {
                    self.emit_status(&format!("Receiving albums for {} artists...", total));
                }
                self.emit_progress(0);
            }
        }
    }

    // ---- albums ----

    fn on_albums_reply(&mut self, limit: u32, offset: u32, result: TransportResult) {
        self.albums.completed();
        if self.finished {
            return;
        }
        let received = self.process_albums_page(offset, result);
        self.albums_finish_check(Artist::default(), limit, offset, received, false);
    }

    fn process_albums_page(&mut self, offset: u32, result: TransportResult) -> u32 {
        let json = match parse_json_object(result) {
            Ok(json) => json,
            Err(err) => {
                self.record_error(err);
                return 0;
            }
        };
        let page = match parser::parse_albums_page(&json, &Artist::default()) {
            Ok(page) => page,
            Err(err) => {
                self.record_error(err);
                return 0;
            }
        };
        for reason in &page.skipped {
            self.record_error(ApiError::Validation(format!("Invalid album entry: {}", reason)));
        }

        if offset == 0 {
            self.albums.items_total = page.total.unwrap_or(page.albums.len() as u32);
        }

        let received = page.albums.len() as u32;
        for (artist, album) in page.albums {
            if self.pending_album_songs.contains_key(&album.album_id) {
                continue;
            }
            self.pending_album_songs.insert(
                album.album_id.clone(),
                AlbumSongsRequest {
                    artist,
                    album,
                    offset: 0,
                },
            );
        }

        self.albums.items_received += received;
        self.emit_progress(utils::progress(
            self.albums.items_received,
            self.albums.items_total,
        ));

        received
    }

    fn albums_finish_check(
        &mut self,
        artist: Artist,
        limit: u32,
        offset: u32,
        received: u32,
        more: bool,
    ) {
        if self.finished {
            return;
        }

        if received > 0 && (limit == 0 || limit > received) {
            let offset_next = offset + received;
            match self.kind {
                QueryKind::FavouriteAlbums | QueryKind::SearchAlbums => {
                    if offset_next < self.albums.items_total {
                        let limit_next = if self.kind == QueryKind::SearchAlbums {
                            self.options.albums_search_limit
                        } else {
                            0
                        };
                        self.add_albums_request(offset_next, limit_next);
                    }
                }
                QueryKind::FavouriteArtists | QueryKind::SearchArtists => {
                    // Artist album pages carry no total; the reply's `more`
                    // flag drives continuation.
                    if more {
                        self.add_artist_albums_request(artist, offset_next);
                    }
                }
                _ => {}
            }
        }

        // Artist albums query is finished: get all songs for all albums.
        if self.artists.drained(self.artists_queue.is_empty())
            && self.albums.drained(self.albums_queue.is_empty())
            && self
                .artist_albums
                .drained(self.artist_albums_queue.is_empty())
        {
            let pending: Vec<AlbumSongsRequest> =
                self.pending_album_songs.values().cloned().collect();
            self.pending_album_songs.clear();
            for request in pending {
                self.add_album_songs_request(request.artist, request.album, 0);
            }

            let total = self.album_songs.requests_total;
            if total > 0 {
                if total == 1 {
                    self.emit_status(&format!("Receiving songs for {} album...", total));
                } else {
                    self.emit_status(&format!("Receiving songs for {} albums...", total));
                }
                self.emit_progress(0);
            }
        }

        self.get_album_covers_check();
    }

    fn on_artist_albums_reply(&mut self, artist: Artist, offset: u32, result: TransportResult) {
        self.artist_albums.completed();
        if self.finished {
            return;
        }

        self.emit_progress(utils::progress(
            self.artist_albums.requests_received,
            self.artist_albums.requests_total,
        ));

        let (received, more) = self.process_artist_albums_page(&artist, result);
        self.albums_finish_check(artist, 0, offset, received, more);
    }

    fn process_artist_albums_page(&mut self, artist: &Artist, result: TransportResult) -> (u32, bool) {
        let json = match parse_json_object(result) {
            Ok(json) => json,
            Err(err) => {
                self.record_error(err);
                return (0, false);
            }
        };
        let page = match parser::parse_artist_albums_page(&json, artist) {
            Ok(page) => page,
            Err(err) => {
                self.record_error(err);
                return (0, false);
            }
        };
        for reason in &page.skipped {
            self.record_error(ApiError::Validation(format!("Invalid album entry: {}", reason)));
        }

        let received = page.albums.len() as u32;
        for (artist, album) in page.albums {
            if self.pending_album_songs.contains_key(&album.album_id) {
                continue;
            }
            self.pending_album_songs.insert(
                album.album_id.clone(),
                AlbumSongsRequest {
                    artist,
                    album,
                    offset: 0,
                },
            );
        }

        (received, page.more)
    }

    // ---- songs ----

    fn on_songs_reply(&mut self, limit: u32, offset: u32, result: TransportResult) {
        self.songs.completed();
        if self.finished {
            return;
        }
        let received = self.process_songs_page(offset, result);
        let total = self.songs.items_total;
        self.songs_finish_check(Artist::default(), Album::default(), limit, offset, total, received);
    }

    fn process_songs_page(&mut self, offset: u32, result: TransportResult) -> u32 {
        let json = match parse_json_object(result) {
            Ok(json) => json,
            Err(err) => {
                self.record_error(err);
                return 0;
            }
        };
        let page = match parser::parse_songs_page(&json, &Artist::default(), &Album::default()) {
            Ok(page) => page,
            Err(err) => {
                self.record_error(err);
                return 0;
            }
        };
        for reason in &page.skipped {
            self.record_error(ApiError::Validation(format!("Invalid song entry: {}", reason)));
        }

        if page.reported == 0 {
            self.no_results = true;
            return 0;
        }

        if offset == 0 {
            self.songs.items_total = page.total.unwrap_or(page.reported);
        }

        for song in page.songs {
            self.songs_map.insert(song.song_id.clone(), song);
        }

        self.songs.items_received += page.reported;
        self.emit_progress(utils::progress(
            self.songs.items_received,
            self.songs.items_total,
        ));

        page.reported
    }

    fn on_album_songs_reply(
        &mut self,
        artist: Artist,
        album: Album,
        offset: u32,
        result: TransportResult,
    ) {
        self.album_songs.completed();
        if self.finished {
            return;
        }

        if offset == 0 {
            self.emit_progress(utils::progress(
                self.album_songs.requests_received,
                self.album_songs.requests_total,
            ));
        }

        let (received, page_total) = self.process_album_songs_page(&artist, &album, result);
        self.songs_finish_check(artist, album, 0, offset, page_total, received);
    }

    fn process_album_songs_page(
        &mut self,
        artist: &Artist,
        album: &Album,
        result: TransportResult,
    ) -> (u32, u32) {
        let json = match parse_json_object(result) {
            Ok(json) => json,
            Err(err) => {
                self.record_error(err);
                return (0, 0);
            }
        };
        let page = match parser::parse_album_songs_reply(&json, artist, album) {
            Ok(page) => page,
            Err(err) => {
                self.record_error(err);
                return (0, 0);
            }
        };
        for reason in &page.skipped {
            self.record_error(ApiError::Validation(format!("Invalid song entry: {}", reason)));
        }

        if page.reported == 0 {
            self.no_results = true;
            return (0, 0);
        }

        for song in page.songs {
            self.songs_map.insert(song.song_id.clone(), song);
        }

        (page.reported, page.reported)
    }

    fn songs_finish_check(
        &mut self,
        artist: Artist,
        album: Album,
        limit: u32,
        offset: u32,
        songs_total: u32,
        received: u32,
    ) {
        if self.finished {
            return;
        }

        if received > 0 && (limit == 0 || limit > received) {
            let offset_next = offset + received;
            if offset_next < songs_total {
                match self.kind {
                    QueryKind::FavouriteSongs => self.add_songs_request(offset_next, 0),
                    QueryKind::SearchSongs => {
                        // A non-empty artist/album means this was an
                        // album-songs page inside a songs search.
                        if artist.artist_id.is_empty() && album.album_id.is_empty() {
                            self.add_songs_request(offset_next, self.options.songs_search_limit);
                        } else {
                            self.add_album_songs_request(artist, album, offset_next);
                        }
                    }
                    QueryKind::FavouriteArtists
                    | QueryKind::SearchArtists
                    | QueryKind::FavouriteAlbums
                    | QueryKind::SearchAlbums => {
                        self.add_album_songs_request(artist, album, offset_next);
                    }
                }
            }
        }

        self.get_album_covers_check();
    }

    // ---- album covers ----

    /// The cover stage is the final one: it starts only once strictly every
    /// other queue, counter and dedup set is empty, and only for favourites
    /// queries with cover fetching enabled.
    fn get_album_covers_check(&mut self) {
        if self.finished || !self.options.fetch_covers || !self.kind.is_query() {
            return;
        }

        let queues_empty = self.artists_queue.is_empty()
            && self.albums_queue.is_empty()
            && self.songs_queue.is_empty()
            && self.artist_albums_queue.is_empty()
            && self.album_songs_queue.is_empty()
            && self.covers_queue.is_empty();
        let pending_empty = self.pending_artist_albums.is_empty()
            && self.pending_album_songs.is_empty()
            && self.covers_waiting.is_empty();
        let actives_zero = self.artists.requests_active == 0
            && self.albums.requests_active == 0
            && self.songs.requests_active == 0
            && self.artist_albums.requests_active == 0
            && self.album_songs.requests_active == 0
            && self.covers.requests_active == 0;

        if queues_empty && pending_empty && actives_zero {
            self.get_album_covers();
        }
    }

    fn get_album_covers(&mut self) {
        let songs: Vec<Song> = self.songs_map.values().cloned().collect();
        for song in &songs {
            self.add_album_cover_request(song);
        }

        let total = self.covers.requests_total;
        if total > 0 {
            if total == 1 {
                self.emit_status(&format!("Receiving album cover for {} album...", total));
            } else {
                self.emit_status(&format!("Receiving album covers for {} albums...", total));
            }
            self.emit_progress(0);
        }
    }

    fn on_album_cover_reply(
        &mut self,
        album_id: String,
        url: String,
        dest: PathBuf,
        result: TransportResult,
    ) {
        self.covers.completed();
        if self.finished {
            return;
        }

        self.emit_progress(utils::progress(
            self.covers.requests_received,
            self.covers.requests_total,
        ));

        if !self.covers_waiting.contains_key(&album_id) {
            return;
        }

        // A missing cover is never fatal to the query: every failure path
        // just drops the album from tracking and leaves the art unset.
        let reply = match result {
            Ok(reply) => reply,
            Err(message) => {
                self.record_error(ApiError::Network(message));
                self.covers_waiting.remove(&album_id);
                return;
            }
        };

        if reply.status != 200 {
            self.record_error(ApiError::Http(reply.status));
            self.covers_waiting.remove(&album_id);
            return;
        }

        let mut mimetype = reply
            .mimetype
            .unwrap_or_default()
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if mimetype == "image/jpg" {
            mimetype = "image/jpeg".to_string();
        }
        let Some(format) = image::ImageFormat::from_mime_type(&mimetype) else {
            self.record_error(ApiError::Validation(format!(
                "Unsupported mimetype for image reader {} for {}",
                mimetype, url
            )));
            self.covers_waiting.remove(&album_id);
            return;
        };

        if reply.body.is_empty() {
            self.record_error(ApiError::Validation(format!(
                "Received empty image data for {}",
                url
            )));
            self.covers_waiting.remove(&album_id);
            return;
        }

        let image = match image::load_from_memory_with_format(&reply.body, format) {
            Ok(image) => image,
            Err(_) => {
                self.record_error(ApiError::Validation(format!(
                    "Error decoding image data from {}",
                    url
                )));
                self.covers_waiting.remove(&album_id);
                return;
            }
        };

        if let Some(parent) = dest.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if image.save(&dest).is_err() {
            self.record_error(ApiError::Validation(format!(
                "Error saving image data to {}",
                dest.display()
            )));
            self.covers_waiting.remove(&album_id);
            return;
        }

        if let Some(song_ids) = self.covers_waiting.remove(&album_id) {
            for song_id in song_ids {
                if let Some(song) = self.songs_map.get_mut(&song_id) {
                    song.art_local = Some(dest.clone());
                }
            }
        }
    }

    // ---- termination ----

    /// The sole termination predicate, re-evaluated after every reply: all
    /// six queues empty, all active counters zero, all dedup sets empty.
    fn finish_check(&mut self) {
        if self.finished {
            return;
        }

        let queues_empty = self.artists_queue.is_empty()
            && self.albums_queue.is_empty()
            && self.songs_queue.is_empty()
            && self.artist_albums_queue.is_empty()
            && self.album_songs_queue.is_empty()
            && self.covers_queue.is_empty();
        let pending_empty = self.pending_artist_albums.is_empty()
            && self.pending_album_songs.is_empty()
            && self.covers_waiting.is_empty();
        let actives_zero = self.artists.requests_active == 0
            && self.albums.requests_active == 0
            && self.songs.requests_active == 0
            && self.artist_albums.requests_active == 0
            && self.album_songs.requests_active == 0
            && self.covers.requests_active == 0;

        if !(queues_empty && pending_empty && actives_zero) {
            return;
        }

        self.finished = true;

        let error = if self.no_results && self.songs_map.is_empty() {
            if self.kind.is_search() {
                Some("No match.".to_string())
            } else {
                None
            }
        } else if self.songs_map.is_empty() && self.last_error.is_none() {
            Some("Missing data.".to_string())
        } else {
            self.last_error.clone()
        };

        let songs = std::mem::take(&mut self.songs_map);
        let _ = self.events.send(QueryEvent::Results {
            query_id: self.query_id,
            songs,
            error,
        });
    }

    // ---- signals ----

    fn emit_status(&self, text: &str) {
        let _ = self.events.send(QueryEvent::Status {
            query_id: self.query_id,
            text: text.to_string(),
        });
    }

    fn emit_progress(&self, percent: u8) {
        let _ = self.events.send(QueryEvent::Progress {
            query_id: self.query_id,
            percent,
        });
    }

    /// Records a single-request failure. Only the latest error is kept; the
    /// request's contribution is dropped and the query carries on.
    fn record_error(&mut self, err: ApiError) {
        self.last_error = Some(err.to_string());
    }
}
