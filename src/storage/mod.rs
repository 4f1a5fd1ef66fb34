//! Storage layer for In & Out
//!
//! A key-value store holds a few named string slots; the document store
//! keeps the ledger document in one of them and caches it in memory.

pub mod document;
pub mod file_io;
pub mod kv;

pub use document::{DocumentStats, DocumentStore};
pub use file_io::{read_json_required, read_text, write_json_atomic, write_text_atomic};
pub use kv::{keys, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};

use std::sync::Arc;

use crate::config::{InoutPaths, Settings};
use crate::error::InoutError;

/// Main storage coordinator: the key-value slots plus the document over them
pub struct Storage {
    paths: InoutPaths,
    kv: Arc<dyn KeyValueStore>,
    documents: Arc<DocumentStore>,
}

impl Storage {
    /// Open file-backed storage under the configured data directory
    pub fn open(paths: InoutPaths, settings: &Settings) -> Result<Self, InoutError> {
        paths.ensure_directories()?;
        let kv: Arc<dyn KeyValueStore> = Arc::new(FileKeyValueStore::new(paths.store_dir()));
        Ok(Self::with_kv(paths, kv, settings))
    }

    /// Build storage over an existing key-value store
    pub fn with_kv(paths: InoutPaths, kv: Arc<dyn KeyValueStore>, settings: &Settings) -> Self {
        let documents = Arc::new(DocumentStore::new(Arc::clone(&kv), settings));
        Self {
            paths,
            kv,
            documents,
        }
    }

    pub fn paths(&self) -> &InoutPaths {
        &self.paths
    }

    pub fn kv(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.kv)
    }

    pub fn documents(&self) -> Arc<DocumentStore> {
        Arc::clone(&self.documents)
    }

    /// Whether a document has ever been written
    pub async fn is_initialized(&self) -> Result<bool, InoutError> {
        Ok(self.kv.get(keys::APP_DB).await?.is_some())
    }
}
