use std::sync::Arc;

use crate::{
    error, info,
    management::SessionManager,
    netease::{lyrics::LyricsProvider, transport::HttpTransport},
    success,
};

pub async fn lyrics(artist: String, title: String) {
    let session = SessionManager::load()
        .await
        .unwrap_or_else(|_| SessionManager::empty());
    let transport = Arc::new(HttpTransport::new(session.cookie_pairs()));
    let provider = LyricsProvider::new(transport);

    info!("Searching lyrics for {} - {}...", artist, title);

    match provider.search(&artist, &title).await {
        Ok(results) if results.is_empty() => info!("No lyrics found."),
        Ok(mut results) => {
            results.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            let best = &results[0];
            success!(
                "Lyrics for {} - {} ({})",
                best.artist,
                best.title,
                best.album
            );
            println!("{}", best.lyrics);
        }
        Err(e) => error!("Lyrics search failed: {}", e),
    }
}
