use crate::{error, info, netease::service::NeteaseService, success};

pub async fn url(song_id: String) {
    let service = NeteaseService::new().await;
    if !service.authenticated() {
        error!("Not authenticated. Please run ncmcli auth");
    }

    match service.get_stream_url(&song_id).await {
        Ok(stream) => {
            success!("Resolved stream URL for song {}", song_id);
            println!("{}", stream.url);
            info!(
                "type: {}  sample rate: {}",
                stream.filetype, stream.sample_rate
            );
        }
        Err(e) => error!("Cannot resolve stream URL: {}", e),
    }
}
