use crate::{
    cli::{drive_query, print_song_table},
    error, info,
    management::FavouritesManager,
    netease::service::NeteaseService,
    success,
    types::QueryKind,
    warning,
};

fn cache_kind(kind: QueryKind) -> &'static str {
    match kind {
        QueryKind::FavouriteArtists => "artists",
        QueryKind::FavouriteAlbums => "albums",
        _ => "songs",
    }
}

pub async fn favourites(kind: QueryKind, covers: bool, cached: bool) {
    if cached {
        match FavouritesManager::new(cache_kind(kind), None)
            .load_from_cache()
            .await
        {
            Ok(manager) => {
                let songs = manager.get_songs();
                if songs.is_empty() {
                    info!("Favourites cache is empty.");
                } else {
                    print_song_table(&songs);
                    success!("{} cached songs", songs.len());
                }
            }
            Err(e) => {
                warning!(
                    "Failed to load cached favourites: {:?}\nRun ncmcli favourites to fetch them.",
                    e
                );
            }
        }
        return;
    }

    let mut service = NeteaseService::new().await;
    if !service.authenticated() {
        error!("Not authenticated. Please run ncmcli auth");
    }

    let mut handle = match kind {
        QueryKind::FavouriteArtists => service.get_artists(covers),
        QueryKind::FavouriteAlbums => service.get_albums(covers),
        _ => service.get_songs(covers),
    };

    let (songs, query_error) = drive_query(&mut handle).await;

    if songs.is_empty() {
        match query_error {
            Some(message) => info!("{}", message),
            None => info!("No favourites found."),
        }
        return;
    }

    if let Some(message) = query_error {
        warning!("Completed with errors: {}", message);
    }

    if let Err(e) = FavouritesManager::new(cache_kind(kind), Some(songs.clone()))
        .save_to_cache()
        .await
    {
        warning!("Cannot cache favourites: {:?}", e);
    }

    print_song_table(&songs);
    success!("Fetched {} songs", songs.len());
}
