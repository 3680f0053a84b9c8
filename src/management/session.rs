use std::path::PathBuf;

use chrono::Utc;

use crate::types::SessionData;

/// Owns the persisted session cookies.
///
/// Cookies are stored as a single `;`-joined `name=value` string under one
/// settings key; nothing else survives a restart. The manager is the only
/// writer — everything downstream reads the cookie set.
pub struct SessionManager {
    data: SessionData,
}

impl SessionManager {
    pub fn empty() -> Self {
        Self {
            data: SessionData {
                cookies: String::new(),
                obtained_at: 0,
            },
        }
    }

    pub async fn load() -> Result<Self, String> {
        let path = Self::session_path();
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(|e| e.to_string())?;
        let data: SessionData = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        Ok(Self { data })
    }

    pub async fn persist(&self) -> Result<(), String> {
        let path = Self::session_path();
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(&self.data).map_err(|e| e.to_string())?;
        async_fs::write(Self::session_path(), json)
            .await
            .map_err(|e| e.to_string())
    }

    pub fn authenticated(&self) -> bool {
        !self.data.cookies.is_empty()
    }

    pub fn set_cookies(&mut self, cookies: Vec<(String, String)>) {
        self.data.cookies = cookies
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<String>>()
            .join(";");
        self.data.obtained_at = Utc::now().timestamp() as u64;
    }

    /// The cookie set, re-parsed from the joined settings string.
    pub fn cookie_pairs(&self) -> Vec<(String, String)> {
        self.data
            .cookies
            .split(';')
            .filter_map(|segment| {
                segment
                    .split_once('=')
                    .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
            })
            .collect()
    }

    pub fn csrf(&self) -> Option<String> {
        self.cookie_pairs()
            .into_iter()
            .find(|(name, _)| name == crate::netease::CSRF_COOKIE)
            .map(|(_, value)| value)
    }

    pub fn obtained_at(&self) -> u64 {
        self.data.obtained_at
    }

    pub async fn clear(&mut self) -> Result<(), String> {
        self.data.cookies.clear();
        self.data.obtained_at = 0;
        async_fs::remove_file(Self::session_path())
            .await
            .map_err(|e| e.to_string())
    }

    fn session_path() -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("ncmcli/cache/session.json");
        path
    }
}
