use std::{io::Error, path::PathBuf};

use crate::types::SongMap;

#[derive(Debug)]
pub enum FavouritesError {
    IoError(Error),
    SerdeError(serde_json::Error),
}

impl From<Error> for FavouritesError {
    fn from(err: Error) -> Self {
        FavouritesError::IoError(err)
    }
}

/// Caches the latest favourites result map per operation kind, so listing
/// commands can work offline from the last fetch.
pub struct FavouritesManager {
    kind: String,
    songs: SongMap,
}

impl FavouritesManager {
    pub fn new(kind: &str, songs: Option<SongMap>) -> Self {
        Self {
            kind: kind.to_string(),
            songs: songs.unwrap_or_default(),
        }
    }

    pub async fn load_from_cache(&self) -> Result<Self, FavouritesError> {
        let path = self.get_path();
        let content = async_fs::read_to_string(&path)
            .await
            .map_err(FavouritesError::IoError)?;
        let songs = serde_json::from_str(&content).map_err(FavouritesError::SerdeError)?;
        Ok(Self {
            kind: self.kind.clone(),
            songs,
        })
    }

    pub async fn save_to_cache(&self) -> Result<(), FavouritesError> {
        let path = self.get_path();
        if let Some(parent) = path.parent() {
            async_fs::create_dir_all(parent)
                .await
                .map_err(FavouritesError::IoError)?;
        }

        let json =
            serde_json::to_string_pretty(&self.songs).map_err(FavouritesError::SerdeError)?;
        async_fs::write(&path, json)
            .await
            .map_err(FavouritesError::IoError)
    }

    pub fn get_songs(&self) -> SongMap {
        self.songs.clone()
    }

    fn get_path(&self) -> PathBuf {
        let mut path = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push(format!("ncmcli/favourites/{}.json", self.kind));
        path
    }
}
