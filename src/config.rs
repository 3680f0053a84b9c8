//! Configuration management for the NetEase Cloud Music CLI.
//!
//! This module handles loading and accessing configuration values from
//! environment variables and `.env` files. It provides a centralized way to
//! manage application configuration including the vendor API hosts, search
//! page limits, and the cover cache location.
//!
//! The configuration system follows a hierarchical approach:
//! 1. Environment variables (highest priority)
//! 2. `.env` file in the local data directory
//! 3. Application defaults (the real vendor endpoints and sane limits)

use dotenv;
use std::{env, path::PathBuf};

/// Loads environment variables from a `.env` file in the local data directory.
///
/// Creates the necessary directory structure if it doesn't exist and loads
/// environment variables from a `.env` file located in the platform-specific
/// local data directory under `ncmcli/.env`. Unlike API credentials for other
/// services, every variable used by this application has a default, so a
/// missing `.env` file is not an error.
///
/// # Directory Structure
///
/// The function looks for the `.env` file in:
/// - Linux: `~/.local/share/ncmcli/.env`
/// - macOS: `~/Library/Application Support/ncmcli/.env`
/// - Windows: `%LOCALAPPDATA%/ncmcli/.env`
pub async fn load_env() {
    let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    path.push("ncmcli/.env");
    if let Some(parent) = path.parent() {
        let _ = async_fs::create_dir_all(parent).await;
    }

    let _ = dotenv::from_path(path);
}

/// Returns the base URL for the unencrypted `/api/` endpoints.
///
/// Used by the authenticator, the lyrics provider and the cover search
/// provider. Overridable with `NETEASE_API_URL` (useful for tests against a
/// local stub).
pub fn netease_apiurl() -> String {
    env::var("NETEASE_API_URL").unwrap_or_else(|_| "https://interface.music.163.com".to_string())
}

/// Returns the base URL for the encrypted `/weapi/` endpoints.
///
/// Every POST carrying a weapi crypto envelope goes to this host.
/// Overridable with `NETEASE_WEB_API_URL`.
pub fn netease_webapiurl() -> String {
    env::var("NETEASE_WEB_API_URL").unwrap_or_else(|_| "https://music.163.com".to_string())
}

/// Page limit for artist search requests (`NETEASE_ARTISTS_SEARCH_LIMIT`).
pub fn artists_search_limit() -> u32 {
    env::var("NETEASE_ARTISTS_SEARCH_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10)
}

/// Page limit for album search requests (`NETEASE_ALBUMS_SEARCH_LIMIT`).
pub fn albums_search_limit() -> u32 {
    env::var("NETEASE_ALBUMS_SEARCH_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10)
}

/// Page limit for song search requests (`NETEASE_SONGS_SEARCH_LIMIT`).
pub fn songs_search_limit() -> u32 {
    env::var("NETEASE_SONGS_SEARCH_LIMIT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10)
}

/// Returns the directory where downloaded album covers are stored.
///
/// Defaults to `ncmcli/covers` in the platform data directory; overridable
/// with `NETEASE_COVER_DIR`.
pub fn cover_dir() -> PathBuf {
    match env::var("NETEASE_COVER_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
            path.push("ncmcli/covers");
            path
        }
    }
}

/// Requested edge size in pixels for fetched album covers
/// (`NETEASE_COVER_SIZE`).
pub fn cover_size() -> u32 {
    env::var("NETEASE_COVER_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(800)
}
