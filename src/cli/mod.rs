//! # CLI Module
//!
//! The command-line interface layer for ncmcli. Each command is a thin async
//! function that wires the service facade, the management layer and the
//! terminal output together: queries stream their progress through
//! [`crate::types::QueryEvent`]s which are rendered with an indicatif bar,
//! and final results land in tabled tables.
//!
//! ## Commands
//!
//! - [`auth`] - Registers an anonymous session with the vendor API
//! - [`search`] - Searches artists, albums or songs
//! - [`favourites`] - Fetches the cascading favourites view, optionally with
//!   album covers, or lists the cached copy
//! - [`lyrics`] - Searches lyrics for an artist/title pair
//! - [`covers`] - Searches cover art for an artist/album pair
//! - [`url`] - Resolves the stream URL for one song id
//! - [`info`] - Shows session and cache state

mod auth;
mod covers;
mod favourites;
mod info;
mod lyrics;
mod search;
mod url;

pub use auth::auth;
pub use covers::covers;
pub use favourites::favourites;
pub use info::info;
pub use lyrics::lyrics;
pub use search::search;
pub use url::url;

use indicatif::{ProgressBar, ProgressStyle};
use tabled::Table;

use crate::{
    netease::service::QueryHandle,
    types::{QueryEvent, SongMap, SongTableRow},
    utils,
};

/// Consumes a query's events, rendering progress, until the terminal result.
pub(crate) async fn drive_query(handle: &mut QueryHandle) -> (SongMap, Option<String>) {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.blue} {msg} [{bar:40}] {percent}%")
            .unwrap()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );

    loop {
        match handle.recv().await {
            Some(QueryEvent::Status { text, .. }) => pb.set_message(text),
            Some(QueryEvent::Progress { percent, .. }) => pb.set_position(percent as u64),
            Some(QueryEvent::Results { songs, error, .. }) => {
                pb.finish_and_clear();
                return (songs, error);
            }
            None => {
                pb.finish_and_clear();
                return (SongMap::new(), Some("Query aborted.".to_string()));
            }
        }
    }
}

pub(crate) fn print_song_table(songs: &SongMap) {
    let rows: Vec<SongTableRow> = songs
        .values()
        .map(|song| SongTableRow {
            title: song.title.clone(),
            artist: song.artist.clone(),
            album: song.album.clone(),
            duration: utils::format_duration(song.duration_ms),
        })
        .collect();

    let table = Table::new(rows);
    println!("{}", table);
}
