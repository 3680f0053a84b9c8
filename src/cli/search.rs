use crate::{
    cli::{drive_query, print_song_table},
    error, info,
    netease::service::NeteaseService,
    success,
    types::QueryKind,
    warning,
};

pub async fn search(kind: QueryKind, text: String) {
    let mut service = NeteaseService::new().await;
    if !service.authenticated() {
        error!("Not authenticated. Please run ncmcli auth");
    }

    let mut handle = service.search(kind, &text);
    let (songs, query_error) = drive_query(&mut handle).await;

    if songs.is_empty() {
        match query_error {
            Some(message) => info!("{}", message),
            None => info!("No results."),
        }
        return;
    }

    if let Some(message) = query_error {
        warning!("Completed with errors: {}", message);
    }

    print_song_table(&songs);
    success!("Found {} songs", songs.len());
}
