//! The document store
//!
//! Owns the in-memory copy of the ledger document and keeps it in step with
//! the `appDb` slot of a key-value store. Every change rewrites the whole
//! document.
//!
//! Reads never fail: a slow or unreadable slot degrades to the built-in
//! default document. Writes do fail, and the caller sees why. A write is
//! also refused while the stored document cannot be read, so the fallback
//! never replaces user data.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use super::kv::{keys, KeyValueStore};
use crate::config::Settings;
use crate::error::{InoutError, InoutResult};
use crate::models::{Collection, Document};

/// Record counts and serialized size of the stored document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub accounts: usize,
    pub categories: usize,
    pub transactions: usize,
    pub budgets: usize,
    pub attachments: usize,
    pub size_bytes: usize,
}

/// Outcome of reading the stored document
enum Loaded {
    Ready(Document),
    /// Defaults standing in for a document that could not be read
    Fallback { doc: Document, error: InoutError },
}

/// Cached, persisted ledger document
pub struct DocumentStore {
    kv: Arc<dyn KeyValueStore>,
    cache: Mutex<Option<Document>>,
    write_lock: tokio::sync::Mutex<()>,
    timeout: Duration,
    currency_code: String,
    period_start_day: u8,
}

impl DocumentStore {
    /// Create a store over `kv` using the deadlines and defaults in `settings`
    pub fn new(kv: Arc<dyn KeyValueStore>, settings: &Settings) -> Self {
        Self {
            kv,
            cache: Mutex::new(None),
            write_lock: tokio::sync::Mutex::new(()),
            timeout: settings.store_timeout(),
            currency_code: settings.currency_code.clone(),
            period_start_day: settings.period_start_day,
        }
    }

    /// The underlying key-value store
    pub fn kv(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.kv)
    }

    /// Cycle start day applied to legacy budgets
    pub fn period_start_day(&self) -> u8 {
        self.period_start_day
    }

    fn cached(&self) -> Option<Document> {
        self.cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_cache(&self, doc: Option<Document>) {
        *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = doc;
    }

    /// The current document
    ///
    /// Served from cache when present. Otherwise read from persistence; an
    /// empty slot gets the default document installed and persisted. A
    /// failed or timed-out read, or unparseable content, yields the default
    /// document without caching it, so the next call tries persistence again.
    pub async fn load(&self) -> Document {
        match self.read().await {
            Loaded::Ready(doc) => doc,
            Loaded::Fallback { doc, .. } => doc,
        }
    }

    async fn read(&self) -> Loaded {
        if let Some(doc) = self.cached() {
            return Loaded::Ready(doc);
        }

        let stored = match timeout(self.timeout, self.kv.get(keys::APP_DB)).await {
            Ok(Ok(stored)) => stored,
            Ok(Err(e)) => {
                warn!(error = %e, "failed to read document, using defaults");
                return self.fallback(InoutError::StoreWrite(format!(
                    "stored document could not be read ({}); refusing to overwrite it",
                    e
                )));
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "document read timed out, using defaults");
                return self.fallback(InoutError::Timeout(format!(
                    "document read exceeded {} ms; refusing to overwrite it",
                    self.timeout.as_millis()
                )));
            }
        };

        let Some(text) = stored else {
            info!("no stored document, installing defaults");
            let doc = self.default_document();
            if let Err(e) = self.persist(&doc).await {
                warn!(error = %e, "failed to persist default document");
            }
            self.set_cache(Some(doc.clone()));
            return Loaded::Ready(doc);
        };

        match Document::parse(&text, self.period_start_day) {
            Ok((doc, upgraded)) => {
                if upgraded > 0 {
                    info!(upgraded, "upgraded legacy budgets");
                    if let Err(e) = self.persist(&doc).await {
                        warn!(error = %e, "failed to persist upgraded budgets");
                    }
                }
                self.set_cache(Some(doc.clone()));
                Loaded::Ready(doc)
            }
            Err(e) => {
                warn!(error = %e, "stored document is unreadable, using defaults");
                self.fallback(InoutError::StoreWrite(format!(
                    "stored document is unreadable ({}); refusing to overwrite it, \
                     run 'inout reset --force' to start over",
                    e
                )))
            }
        }
    }

    fn fallback(&self, error: InoutError) -> Loaded {
        Loaded::Fallback {
            doc: self.default_document(),
            error,
        }
    }

    /// Replace the document and write it through
    ///
    /// The cache only changes once the write has succeeded.
    pub async fn save(&self, doc: Document) -> InoutResult<()> {
        let _guard = self.write_lock.lock().await;
        self.save_unlocked(doc).await
    }

    async fn save_unlocked(&self, doc: Document) -> InoutResult<()> {
        self.persist(&doc).await?;
        self.set_cache(Some(doc));
        Ok(())
    }

    async fn persist(&self, doc: &Document) -> InoutResult<()> {
        let text = doc.to_json()?;
        match timeout(self.timeout, self.kv.set(keys::APP_DB, &text)).await {
            Ok(Ok(())) => {
                debug!(bytes = text.len(), "document saved");
                Ok(())
            }
            Ok(Err(e)) => Err(InoutError::StoreWrite(e.to_string())),
            Err(_) => Err(InoutError::Timeout(format!(
                "document write exceeded {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    /// Load, change and save the document as one step
    ///
    /// Calls are serialized within the process, so two mutations can never
    /// interleave between their load and save. If `f` fails nothing is
    /// written. When the stored document could not be read, the call fails
    /// rather than saving over it.
    pub async fn mutate<F, R>(&self, f: F) -> InoutResult<R>
    where
        F: FnOnce(&mut Document) -> InoutResult<R>,
    {
        let _guard = self.write_lock.lock().await;
        let mut doc = match self.read().await {
            Loaded::Ready(doc) => doc,
            Loaded::Fallback { error, .. } => return Err(error),
        };
        let result = f(&mut doc)?;
        self.save_unlocked(doc).await?;
        Ok(result)
    }

    /// Discard all user data and reinstall the default document
    pub async fn reset(&self) -> InoutResult<Document> {
        let doc = self.default_document();
        self.save(doc.clone()).await?;
        info!("document reset to defaults");
        Ok(doc)
    }

    /// Drop the cache so the next `load` re-reads persistence
    pub fn invalidate_cache(&self) {
        self.set_cache(None);
    }

    pub async fn stats(&self) -> InoutResult<DocumentStats> {
        let doc = self.load().await;
        let size_bytes = doc.to_json()?.len();
        Ok(DocumentStats {
            accounts: doc.count(Collection::Accounts),
            categories: doc.count(Collection::Categories),
            transactions: doc.count(Collection::Transactions),
            budgets: doc.count(Collection::Budgets),
            attachments: doc.count(Collection::Attachments),
            size_bytes,
        })
    }

    /// Whether any account, category, transaction or budget exists
    pub async fn has_data(&self) -> bool {
        self.load().await.has_data()
    }

    fn default_document(&self) -> Document {
        Document::with_defaults(&self.currency_code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, CategoryId, Transaction, TransactionType};
    use crate::storage::kv::test_support::{
        ReadOnlyKeyValueStore, SlowKeyValueStore, UnreadableKeyValueStore,
    };
    use crate::storage::kv::MemoryKeyValueStore;
    use chrono::Utc;

    fn store_over(kv: Arc<dyn KeyValueStore>) -> DocumentStore {
        DocumentStore::new(kv, &Settings::default())
    }

    fn expense(amount: f64) -> Transaction {
        Transaction::new(
            TransactionType::Expense,
            AccountId::from("acc1"),
            Some(CategoryId::from("cat1")),
            amount,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_default_install_is_idempotent() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_over(kv.clone());

        let first = store.load().await;
        let second = store.load().await;

        assert_eq!(first, second);
        assert_eq!(first.accounts.len(), 5);
        assert_eq!(kv.set_count(), 1);
    }

    #[tokio::test]
    async fn test_default_survives_cache_invalidation() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_over(kv.clone());

        let first = store.load().await;
        store.invalidate_cache();
        let reread = store.load().await;

        assert_eq!(first, reread);
        assert_eq!(kv.set_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_falls_back_to_defaults() {
        let kv = Arc::new(SlowKeyValueStore {
            inner: MemoryKeyValueStore::new(),
            delay: Duration::from_secs(10),
        });
        let store = store_over(kv.clone());

        let doc = store.load().await;
        assert_eq!(doc.categories.len(), 16);
        assert_eq!(kv.inner.set_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_write_times_out() {
        let kv = Arc::new(SlowKeyValueStore {
            inner: MemoryKeyValueStore::new(),
            delay: Duration::from_secs(10),
        });
        let store = store_over(kv);

        let err = store.save(Document::empty()).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn test_corrupt_document_falls_back() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(keys::APP_DB, "{not json").await.unwrap();
        let store = store_over(kv.clone());

        let doc = store.load().await;
        assert_eq!(doc.accounts.len(), 5);
        // The unreadable content is left in place
        assert_eq!(kv.snapshot(keys::APP_DB).as_deref(), Some("{not json"));
    }

    #[tokio::test]
    async fn test_unparseable_document_is_not_overwritten() {
        let stored = r#"{"accounts":[{"id":"myacc","name":"Mine","type":"bank","balance":0}],
            "transactions":[{"id":"t1","type":"Expense","amount":5,"accountId":"myacc"}]}"#;
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(keys::APP_DB, stored).await.unwrap();
        let store = store_over(kv.clone());

        let err = store
            .mutate(|doc| {
                doc.transactions.push(expense(3.0));
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, InoutError::StoreWrite(_)));
        assert_eq!(kv.snapshot(keys::APP_DB).as_deref(), Some(stored));
        assert_eq!(kv.set_count(), 1);
    }

    #[tokio::test]
    async fn test_read_error_blocks_writes() {
        let kv = Arc::new(UnreadableKeyValueStore::default());
        let store = store_over(kv.clone());

        assert_eq!(store.load().await.accounts.len(), 5);
        let err = store
            .mutate(|doc| {
                doc.transactions.push(expense(3.0));
                Ok(())
            })
            .await
            .unwrap_err();

        assert!(matches!(err, InoutError::StoreWrite(_)));
        assert_eq!(kv.inner.set_count(), 0);

        // An explicit reset is still allowed
        store.reset().await.unwrap();
        assert_eq!(kv.inner.set_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_read_blocks_writes() {
        let kv = Arc::new(SlowKeyValueStore {
            inner: MemoryKeyValueStore::new(),
            delay: Duration::from_secs(10),
        });
        let store = store_over(kv.clone());

        let err = store.mutate(|_| Ok(())).await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(kv.inner.set_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_write_is_reported() {
        let kv = Arc::new(ReadOnlyKeyValueStore::default());
        let store = store_over(kv);

        let err = store.save(Document::empty()).await.unwrap_err();
        assert!(matches!(err, InoutError::StoreWrite(_)));
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_untouched() {
        let kv = Arc::new(ReadOnlyKeyValueStore::default());
        let store = store_over(kv);

        let before = store.load().await;
        let result = store
            .mutate(|doc| {
                doc.transactions.push(expense(10.0));
                Ok(())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(store.load().await.transactions.len(), before.transactions.len());
    }

    #[tokio::test]
    async fn test_mutate_persists() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_over(kv.clone());

        store
            .mutate(|doc| {
                doc.transactions.push(expense(42.5));
                Ok(())
            })
            .await
            .unwrap();

        let fresh = store_over(kv);
        assert_eq!(fresh.load().await.transactions.len(), 1);
    }

    #[tokio::test]
    async fn test_mutate_error_writes_nothing() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_over(kv.clone());
        store.load().await;

        let result: InoutResult<()> = store
            .mutate(|doc| {
                doc.transactions.push(expense(1.0));
                Err(InoutError::Validation("nope".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(kv.set_count(), 1);
        assert!(store.load().await.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_mutations_are_not_lost() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = Arc::new(store_over(kv));

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .mutate(|doc| {
                        doc.transactions.push(expense(i as f64 + 1.0));
                        Ok(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.load().await.transactions.len(), 20);
    }

    #[tokio::test]
    async fn test_reset_discards_user_data() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_over(kv);
        store
            .mutate(|doc| {
                doc.transactions.push(expense(5.0));
                Ok(())
            })
            .await
            .unwrap();
        assert!(store.has_data().await);

        let doc = store.reset().await.unwrap();
        assert!(doc.transactions.is_empty());
        assert_eq!(doc.accounts.len(), 5);
    }

    #[tokio::test]
    async fn test_legacy_budgets_upgraded_on_load() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(
            keys::APP_DB,
            r#"{"budgets":[{"id":"b1","categoryId":"cat1","month":"2024-02","amount":100}]}"#,
        )
        .await
        .unwrap();
        let store = store_over(kv.clone());

        let doc = store.load().await;
        assert_eq!(doc.budgets[0].period_id, "2024-02-01");

        let persisted = kv.snapshot(keys::APP_DB).unwrap();
        assert!(!persisted.contains("\"month\""));
    }

    #[tokio::test]
    async fn test_stats() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = store_over(kv);
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.accounts, 5);
        assert_eq!(stats.categories, 16);
        assert_eq!(stats.transactions, 0);
        assert!(stats.size_bytes > 0);
    }
}
