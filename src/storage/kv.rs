//! Key-value persistence
//!
//! The data layer persists everything as strings under a handful of fixed
//! keys. `FileKeyValueStore` keeps one file per key on disk;
//! `MemoryKeyValueStore` keeps them in memory for tests and dry runs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tracing::debug;

use super::file_io::{read_text, write_text_atomic};
use crate::error::{InoutError, InoutResult};

/// Fixed persistence keys
pub mod keys {
    /// The ledger document
    pub const APP_DB: &str = "appDb";
    /// Reserved for e-mail backup preferences
    pub const EMAIL_BACKUP_SETTINGS: &str = "emailBackupSettings";
    /// Scheduler settings
    pub const SCHEDULED_BACKUP_SETTINGS: &str = "scheduledBackupSettings";
    /// Cloud sign-in record
    pub const CLOUD_AUTH: &str = "cloudAuth";
}

/// Asynchronous string storage keyed by name
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `None` when the key was never written
    async fn get(&self, key: &str) -> InoutResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> InoutResult<()>;

    async fn remove(&self, key: &str) -> InoutResult<()>;
}

/// Read and decode a JSON value stored under `key`
pub async fn get_json<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> InoutResult<Option<T>> {
    match store.get(key).await? {
        Some(text) => Ok(Some(serde_json::from_str(&text)?)),
        None => Ok(None),
    }
}

/// Encode `value` as JSON and store it under `key`
pub async fn set_json<T: Serialize + ?Sized>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> InoutResult<()> {
    let text = serde_json::to_string(value)?;
    store.set(key, &text).await
}

/// One file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn slot_path(&self, key: &str) -> InoutResult<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(InoutError::Storage(format!("invalid storage key '{}'", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> InoutResult<Option<String>> {
        let path = self.slot_path(key)?;
        read_text(&path).await
    }

    async fn set(&self, key: &str, value: &str) -> InoutResult<()> {
        let path = self.slot_path(key)?;
        debug!(key, bytes = value.len(), "writing storage slot");
        write_text_atomic(&path, value).await
    }

    async fn remove(&self, key: &str) -> InoutResult<()> {
        let path = self.slot_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InoutError::Storage(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// In-memory store that counts writes
#[derive(Debug, Default)]
pub struct MemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
    sets: AtomicUsize,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `set` calls so far
    pub fn set_count(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }

    /// Synchronous peek, for assertions
    pub fn snapshot(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> InoutResult<Option<String>> {
        Ok(self.snapshot(key))
    }

    async fn set(&self, key: &str, value: &str) -> InoutResult<()> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> InoutResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Stores that misbehave on purpose
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use std::time::Duration;

    /// Sleeps before every operation
    pub struct SlowKeyValueStore {
        pub inner: MemoryKeyValueStore,
        pub delay: Duration,
    }

    #[async_trait]
    impl KeyValueStore for SlowKeyValueStore {
        async fn get(&self, key: &str) -> InoutResult<Option<String>> {
            tokio::time::sleep(self.delay).await;
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> InoutResult<()> {
            tokio::time::sleep(self.delay).await;
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> InoutResult<()> {
            self.inner.remove(key).await
        }
    }

    /// Reads succeed, writes always fail
    #[derive(Default)]
    pub struct ReadOnlyKeyValueStore {
        pub inner: MemoryKeyValueStore,
    }

    #[async_trait]
    impl KeyValueStore for ReadOnlyKeyValueStore {
        async fn get(&self, key: &str) -> InoutResult<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, _key: &str, _value: &str) -> InoutResult<()> {
            Err(InoutError::Storage("disk full".into()))
        }

        async fn remove(&self, _key: &str) -> InoutResult<()> {
            Err(InoutError::Storage("disk full".into()))
        }
    }

    /// Reads always fail, writes land in `inner`
    #[derive(Default)]
    pub struct UnreadableKeyValueStore {
        pub inner: MemoryKeyValueStore,
    }

    #[async_trait]
    impl KeyValueStore for UnreadableKeyValueStore {
        async fn get(&self, _key: &str) -> InoutResult<Option<String>> {
            Err(InoutError::Storage("permission denied".into()))
        }

        async fn set(&self, key: &str, value: &str) -> InoutResult<()> {
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> InoutResult<()> {
            self.inner.remove(key).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path());

        assert_eq!(store.get(keys::APP_DB).await.unwrap(), None);

        store.set(keys::APP_DB, "{\"version\":\"1.0.0\"}").await.unwrap();
        assert_eq!(
            store.get(keys::APP_DB).await.unwrap().as_deref(),
            Some("{\"version\":\"1.0.0\"}")
        );
        assert!(temp_dir.path().join("appDb.json").exists());

        store.remove(keys::APP_DB).await.unwrap();
        assert_eq!(store.get(keys::APP_DB).await.unwrap(), None);
        store.remove(keys::APP_DB).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_keys() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileKeyValueStore::new(temp_dir.path());
        assert!(store.set("../escape", "x").await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_counts_sets() {
        let store = MemoryKeyValueStore::new();
        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.set_count(), 2);
        assert_eq!(store.snapshot("a").as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_json_helpers() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Flag {
            enabled: bool,
        }

        let store = MemoryKeyValueStore::new();
        let missing: Option<Flag> = get_json(&store, "flag").await.unwrap();
        assert!(missing.is_none());

        set_json(&store, "flag", &Flag { enabled: true }).await.unwrap();
        let loaded: Option<Flag> = get_json(&store, "flag").await.unwrap();
        assert_eq!(loaded, Some(Flag { enabled: true }));
    }
}
