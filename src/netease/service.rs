//! Service facade over the NetEase integration.
//!
//! [`NeteaseService`] owns the session and at most one in-flight query per
//! operation kind (artists, albums, songs, search). Starting a new query of
//! a kind aborts and replaces the previous one; results and progress arrive
//! through the returned [`QueryHandle`]'s event receiver.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::{
    management::SessionManager,
    netease::{
        auth,
        request::{QueryOptions, QueryOrchestrator},
        stream,
        transport::HttpTransport,
    },
    types::{AuthResult, QueryEvent, QueryKind, StreamUrl},
};

/// Caller-side handle for one running query.
pub struct QueryHandle {
    pub query_id: i32,
    events: mpsc::UnboundedReceiver<QueryEvent>,
}

impl QueryHandle {
    /// Receives the next event; `None` once the query task is gone.
    pub async fn recv(&mut self) -> Option<QueryEvent> {
        self.events.recv().await
    }
}

pub struct NeteaseService {
    session: SessionManager,
    next_query_id: i32,
    artists_task: Option<JoinHandle<()>>,
    albums_task: Option<JoinHandle<()>>,
    songs_task: Option<JoinHandle<()>>,
    search_task: Option<JoinHandle<()>>,
}

impl NeteaseService {
    /// Creates a service with whatever session is on disk (possibly none).
    pub async fn new() -> Self {
        let session = SessionManager::load()
            .await
            .unwrap_or_else(|_| SessionManager::empty());
        Self {
            session,
            next_query_id: 1,
            artists_task: None,
            albums_task: None,
            songs_task: None,
            search_task: None,
        }
    }

    pub fn authenticated(&self) -> bool {
        self.session.authenticated()
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Registers an anonymous session and persists it.
    pub async fn authenticate(&mut self) -> AuthResult {
        match auth::authenticate().await {
            Ok(cookies) => {
                self.session.set_cookies(cookies);
                if let Err(err) = self.session.persist().await {
                    return AuthResult {
                        success: false,
                        error: Some(err),
                    };
                }
                AuthResult {
                    success: true,
                    error: None,
                }
            }
            Err(err) => AuthResult {
                success: false,
                error: Some(err),
            },
        }
    }

    /// Drops the persisted session.
    pub async fn clear_session(&mut self) -> Result<(), String> {
        self.session.clear().await
    }

    pub fn get_artists(&mut self, fetch_covers: bool) -> QueryHandle {
        self.start(QueryKind::FavouriteArtists, "", fetch_covers)
    }

    pub fn get_albums(&mut self, fetch_covers: bool) -> QueryHandle {
        self.start(QueryKind::FavouriteAlbums, "", fetch_covers)
    }

    pub fn get_songs(&mut self, fetch_covers: bool) -> QueryHandle {
        self.start(QueryKind::FavouriteSongs, "", fetch_covers)
    }

    pub fn search(&mut self, kind: QueryKind, text: &str) -> QueryHandle {
        self.start(kind, text, false)
    }

    /// Resolves the stream URL for one song id.
    pub async fn get_stream_url(&self, song_id: &str) -> Result<StreamUrl, String> {
        let transport = HttpTransport::new(self.session.cookie_pairs());
        stream::StreamUrlRequest::new(Arc::new(transport), self.session.authenticated(), song_id)
            .process()
            .await
    }

    fn start(&mut self, kind: QueryKind, text: &str, fetch_covers: bool) -> QueryHandle {
        let query_id = self.next_query_id;
        self.next_query_id += 1;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let transport = Arc::new(HttpTransport::new(self.session.cookie_pairs()));
        let options = QueryOptions::from_config(self.session.authenticated(), fetch_covers);

        let mut orchestrator = QueryOrchestrator::new(transport, kind, options, events_tx);
        orchestrator.search(query_id, text);
        let task = tokio::spawn(orchestrator.run());

        // One in-flight query per kind: a replaced query is aborted, and its
        // late replies go nowhere.
        let slot = match kind {
            QueryKind::FavouriteArtists => &mut self.artists_task,
            QueryKind::FavouriteAlbums => &mut self.albums_task,
            QueryKind::FavouriteSongs => &mut self.songs_task,
            QueryKind::SearchArtists | QueryKind::SearchAlbums | QueryKind::SearchSongs => {
                &mut self.search_task
            }
        };
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }

        QueryHandle {
            query_id,
            events: events_rx,
        }
    }

    /// Best-effort cancellation of the in-flight query of one kind.
    pub fn cancel(&mut self, kind: QueryKind) {
        let slot = match kind {
            QueryKind::FavouriteArtists => &mut self.artists_task,
            QueryKind::FavouriteAlbums => &mut self.albums_task,
            QueryKind::FavouriteSongs => &mut self.songs_task,
            QueryKind::SearchArtists | QueryKind::SearchAlbums | QueryKind::SearchSongs => {
                &mut self.search_task
            }
        };
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}

impl Drop for NeteaseService {
    fn drop(&mut self) {
        for task in [
            &self.artists_task,
            &self.albums_task,
            &self.songs_task,
            &self.search_task,
        ]
        .into_iter()
        .flatten()
        {
            task.abort();
        }
    }
}
