//! Key/value storage for client-side session data

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::error::{Error, Result};

/// String key/value store holding JSON documents
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}

fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(Error::SettingsStorage(format!("invalid key '{}'", key)))
    }
}

/// One `{key}.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    dir: PathBuf,
}

impl FileSettingsStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        check_key(key)?;
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::SettingsStorage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::SettingsStorage(format!("failed to create {}: {}", self.dir.display(), e))
        })?;
        tokio::fs::write(&path, value).await.map_err(|e| {
            Error::SettingsStorage(format!("failed to write {}: {}", path.display(), e))
        })?;
        debug!(key, path = %path.display(), "Stored setting");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::SettingsStorage(format!(
                "failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// In-process store, nothing survives the process
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with one entry
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::new();
        if let Ok(mut entries) = store.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
        store
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| Error::SettingsStorage("memory store poisoned".to_string()))
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::new(dir.path().join("local"));

        assert_eq!(store.get("session_settings").await.unwrap(), None);
        store.set("session_settings", "{\"a\":1}").await.unwrap();
        assert_eq!(
            store.get("session_settings").await.unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert!(dir.path().join("local/session_settings.json").exists());

        store.remove("session_settings").await.unwrap();
        store.remove("session_settings").await.unwrap();
        assert_eq!(store.get("session_settings").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileSettingsStore::new(dir.path());
        assert!(matches!(
            store.set("../escape", "x").await,
            Err(Error::SettingsStorage(_))
        ));
        assert!(store.get("").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemorySettingsStore::with_entry("k", "v");
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));
        store.remove("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }
}
