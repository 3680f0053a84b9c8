use std::sync::Arc;

use tabled::Table;

use crate::{
    error, info,
    management::SessionManager,
    netease::{covers::CoverProvider, transport::HttpTransport},
    success,
    types::CoverTableRow,
};

pub async fn covers(artist: String, album: String) {
    let session = SessionManager::load()
        .await
        .unwrap_or_else(|_| SessionManager::empty());
    let transport = Arc::new(HttpTransport::new(session.cookie_pairs()));
    let provider = CoverProvider::new(transport);

    match provider.search(&artist, &album, "").await {
        Ok(results) if results.is_empty() => info!("No covers found."),
        Ok(results) => {
            let count = results.len();
            let rows: Vec<CoverTableRow> = results
                .into_iter()
                .map(|result| CoverTableRow {
                    artist: result.artist,
                    album: result.album,
                    size: format!("{}x{}", result.width, result.height),
                    url: result.image_url,
                })
                .collect();
            println!("{}", Table::new(rows));
            success!("Found {} covers", count);
        }
        Err(e) => error!("Cover search failed: {}", e),
    }
}
