use std::path::{Path, PathBuf};

use rand::Rng;
use regex::Regex;

/// Browser User-Agent strings rotated across outgoing vendor requests.
pub const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (iPhone; CPU iPhone OS 9_1 like Mac OS X) \
     AppleWebKit/601.1.46 (KHTML, like Gecko) Version/9.0 Mobile/13B143 Safari/601.1",
    "Mozilla/5.0 (Linux; Android 6.0; Nexus 5 Build/MRA58N) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/59.0.3071.115 Mobile Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/51.0.2704.103 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_12_5) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/59.0.3071.115 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 10_0 like Mac OS X) \
     AppleWebKit/602.1.38 (KHTML, like Gecko) Version/10.0 Mobile/14A300 Safari/602.1",
];

pub fn random_user_agent() -> &'static str {
    let index = rand::rng().random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Percentage of `count` out of `total`, clamped to 0-100.
pub fn progress(count: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let percent = ((count as f32 / total as f32) * 100.0) as u32;
    percent.min(100) as u8
}

/// Formats a millisecond duration as `m:ss` (or `h:mm:ss` past the hour).
pub fn format_duration(duration_ms: i64) -> String {
    let total_secs = duration_ms / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

/// Strips LRC timing tags (`[mm:ss.xxx]`) from lyrics text and trims each
/// line, keeping empty lines so verse breaks survive.
pub fn lrc_to_plain(lrc_text: &str) -> String {
    let re = Regex::new(r"\[\s*\d{1,2}:\d{2}(?:\.\d{1,3})?\]").unwrap();

    let lines = Regex::new(r"\r\n|\r|\n").unwrap();
    lines
        .split(lrc_text)
        .map(|line| re.replace_all(line, "").trim().to_string())
        .collect::<Vec<String>>()
        .join("\n")
}

/// Removes a trailing disc marker from an album title, e.g.
/// `"Album (Disc 2)"` or `"Album CD1"` become `"Album"`.
pub fn album_remove_disc(album: &str) -> String {
    let re = Regex::new(r"(?i)\s*[(\[]?\s*(disc|cd)\s*\d+\s*[)\]]?\s*$").unwrap();
    re.replace(album, "").trim().to_string()
}

/// Builds the cache path for an album cover downloaded from `url`.
///
/// The file extension is taken from the URL path when it looks like an image
/// extension, defaulting to `jpg`. Returns `None` when the album id or URL is
/// empty, in which case no cover request should be made.
pub fn cover_file_path(cover_dir: &Path, album_id: &str, url: &str) -> Option<PathBuf> {
    if album_id.is_empty() || url.is_empty() {
        return None;
    }

    let path_part = url.split(['?', '#']).next().unwrap_or(url);
    let ext = path_part
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| matches!(ext.as_str(), "jpg" | "jpeg" | "png" | "gif" | "bmp" | "webp"))
        .unwrap_or_else(|| "jpg".to_string());

    Some(cover_dir.join(format!("netease-{}.{}", album_id, ext)))
}
