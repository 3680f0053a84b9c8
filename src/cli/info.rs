use chrono::DateTime;

use crate::{info, management::FavouritesManager, management::SessionManager, success, warning};

pub async fn info() {
    match SessionManager::load().await {
        Ok(session) if session.authenticated() => {
            success!("Authenticated ({} cookies)", session.cookie_pairs().len());
            if session.obtained_at() > 0 {
                if let Some(obtained) = DateTime::from_timestamp(session.obtained_at() as i64, 0) {
                    info!("Session obtained at {}", obtained);
                }
            }
        }
        _ => warning!("Not authenticated. Run ncmcli auth"),
    }

    for kind in ["artists", "albums", "songs"] {
        match FavouritesManager::new(kind, None).load_from_cache().await {
            Ok(manager) => info!("Cached favourite {}: {} songs", kind, manager.get_songs().len()),
            Err(_) => info!("Cached favourite {}: none", kind),
        }
    }
}
