use clap::{
    CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};

use ncmcli::{cli, config, types::QueryKind};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Register an anonymous session with the NetEase API
    Auth,

    /// Search the catalogue
    Search(SearchOptions),

    /// Fetch or list favourite tracks
    Favourites(FavouritesOptions),

    /// Search lyrics for a track
    Lyrics(LyricsOptions),

    /// Search cover art for an album
    Covers(CoversOptions),

    /// Resolve the stream URL for a song id
    Url(UrlOptions),

    /// Show session and cache state
    Info,

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// Search text
    pub text: String,

    /// Search for artists (and cascade into their albums and songs)
    #[clap(long)]
    pub artists: bool,

    /// Search for albums (and cascade into their songs)
    #[clap(long)]
    pub albums: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct FavouritesOptions {
    /// Start from favourite artists
    #[clap(long)]
    pub artists: bool,

    /// Start from favourite albums
    #[clap(long)]
    pub albums: bool,

    /// Download album covers into the cover cache
    #[clap(long)]
    pub covers: bool,

    /// List the cached copy instead of fetching
    #[clap(long)]
    pub cached: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct LyricsOptions {
    /// Artist name
    pub artist: String,

    /// Track title
    pub title: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CoversOptions {
    /// Artist name
    pub artist: String,

    /// Album title
    pub album: String,
}

#[derive(Parser, Debug, Clone)]
pub struct UrlOptions {
    /// NetEase song id
    pub song_id: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    config::load_env().await;

    let cli = Cli::parse();

    match cli.command {
        Command::Auth => cli::auth().await,
        Command::Search(opt) => {
            let kind = if opt.artists {
                QueryKind::SearchArtists
            } else if opt.albums {
                QueryKind::SearchAlbums
            } else {
                QueryKind::SearchSongs
            };
            cli::search(kind, opt.text).await
        }
        Command::Favourites(opt) => {
            let kind = if opt.artists {
                QueryKind::FavouriteArtists
            } else if opt.albums {
                QueryKind::FavouriteAlbums
            } else {
                QueryKind::FavouriteSongs
            };
            cli::favourites(kind, opt.covers, opt.cached).await
        }
        Command::Lyrics(opt) => cli::lyrics(opt.artist, opt.title).await,
        Command::Covers(opt) => cli::covers(opt.artist, opt.album).await,
        Command::Url(opt) => cli::url(opt.song_id).await,
        Command::Info => cli::info().await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
