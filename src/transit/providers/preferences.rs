//! Favorites and recently viewed entries, persisted to
//! `~/.tripdeck/preferences.json`.
//!
//! Writes use atomic rename (write `.tmp`, then `rename()`) for crash safety.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::transit::{PrefKey, Preferences, SourceError};

pub const MAX_RECENTS: usize = 20;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RecentEntry {
    pub key: PrefKey,
    pub accessed_at: i64,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct PreferencesData {
    #[serde(default)]
    pub favorites: Vec<PrefKey>,
    #[serde(default)]
    pub recents: Vec<RecentEntry>,
}

impl PreferencesData {
    fn is_favorite(&self, key: &PrefKey) -> bool {
        self.favorites.contains(key)
    }

    fn set_favorite(&mut self, key: &PrefKey, value: bool) {
        self.favorites.retain(|k| k != key);
        if value {
            self.favorites.push(key.clone());
        }
    }

    /// Moves `key` to the front of the recents, dropping the oldest past the cap.
    fn touch(&mut self, key: &PrefKey, now: i64) {
        self.recents.retain(|r| &r.key != key);
        self.recents.insert(
            0,
            RecentEntry {
                key: key.clone(),
                accessed_at: now,
            },
        );
        self.recents.truncate(MAX_RECENTS);
    }
}

/// Returns `~/.tripdeck/preferences.json`.
pub fn default_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".tripdeck").join("preferences.json"))
}

fn load(path: &Path) -> io::Result<PreferencesData> {
    if !path.exists() {
        return Ok(PreferencesData::default());
    }
    let json = fs::read_to_string(path)?;
    serde_json::from_str(&json).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

/// Atomically write `data` as JSON to `path` (via `.tmp` + rename).
fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("tmp");
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    fs::write(&tmp_path, json)?;
    fs::rename(&tmp_path, path)?;
    Ok(())
}

struct Inner {
    path: PathBuf,
    data: Mutex<PreferencesData>,
    flags: Mutex<HashMap<PrefKey, watch::Sender<Option<bool>>>>,
}

impl Inner {
    /// Applies `change` to the in-memory data and persists the result.
    /// Memory is only updated once the write has succeeded.
    fn modify(&self, change: impl FnOnce(&mut PreferencesData)) -> io::Result<PreferencesData> {
        let mut data = self.data.lock().unwrap_or_else(PoisonError::into_inner);
        let mut updated = data.clone();
        change(&mut updated);
        atomic_write_json(&self.path, &updated)?;
        *data = updated.clone();
        Ok(updated)
    }

    fn publish(&self, key: &PrefKey, value: bool) {
        let flags = self.flags.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(sender) = flags.get(key) {
            sender.send_replace(Some(value));
        }
    }
}

#[derive(Clone)]
pub struct FilePreferences {
    inner: Arc<Inner>,
}

impl FilePreferences {
    /// Opens the preferences file. A malformed file is logged and replaced
    /// on the next write rather than failing startup.
    pub fn open(path: PathBuf) -> Self {
        let data = match load(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to read preferences {}: {}", path.display(), e);
                PreferencesData::default()
            }
        };
        info!(
            "Preferences at {}: {} favorites, {} recents",
            path.display(),
            data.favorites.len(),
            data.recents.len()
        );
        Self {
            inner: Arc::new(Inner {
                path,
                data: Mutex::new(data),
                flags: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn snapshot(&self) -> PreferencesData {
        self.inner
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Preferences for FilePreferences {
    fn favorite_flag(&self, key: &PrefKey) -> Result<watch::Receiver<Option<bool>>, SourceError> {
        let current = self
            .inner
            .data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_favorite(key);
        let mut flags = self.inner.flags.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = flags
            .entry(key.clone())
            .or_insert_with(|| watch::Sender::new(Some(current)));
        Ok(sender.subscribe())
    }

    async fn set_favorite(&self, key: &PrefKey, value: bool) -> Result<(), SourceError> {
        let inner = self.inner.clone();
        let owned = key.clone();
        tokio::task::spawn_blocking(move || inner.modify(|data| data.set_favorite(&owned, value)))
            .await
            .map_err(|e| SourceError::Io(io::Error::other(e)))??;
        debug!("Favorite {} set to {}", key, value);
        self.inner.publish(key, value);
        Ok(())
    }

    async fn register_access(&self, key: &PrefKey) -> Result<(), SourceError> {
        let inner = self.inner.clone();
        let owned = key.clone();
        let now = Utc::now().timestamp();
        tokio::task::spawn_blocking(move || inner.modify(|data| data.touch(&owned, now)))
            .await
            .map_err(|e| SourceError::Io(io::Error::other(e)))??;
        debug!("Registered access to {}", key);
        Ok(())
    }
}
