use crate::{error, info, netease::service::NeteaseService, success};

pub async fn auth() {
    let mut service = NeteaseService::new().await;

    info!("Registering anonymous session...");
    let result = service.authenticate().await;

    if result.success {
        success!("Session registered successfully");
    } else {
        error!(
            "Authentication failed: {}",
            result.error.unwrap_or_default()
        );
    }
}
