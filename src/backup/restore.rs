//! Backup restoration for In & Out
//!
//! Handles restoring the ledger from JSON backups. A restore is a wholesale
//! replace of the user collections and happens only after the entire backup
//! has been checked.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::fs;
use tracing::info;

use crate::error::{InoutError, InoutResult};
use crate::export::{parse_backup, BackupDocument};
use crate::models::Record;
use crate::storage::DocumentStore;

/// Handles restoring from backups
pub struct RestoreManager {
    store: Arc<DocumentStore>,
}

impl RestoreManager {
    /// Create a new RestoreManager
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Restore data from a backup file
    ///
    /// This will overwrite all current accounts, categories, transactions
    /// and budgets with the backup contents.
    pub async fn restore_from_file(&self, backup_path: &Path) -> InoutResult<RestoreResult> {
        let contents = read_backup(backup_path).await?;
        self.restore_from_str(&contents).await
    }

    /// Restore data from backup text
    pub async fn restore_from_str(&self, contents: &str) -> InoutResult<RestoreResult> {
        let backup = self.validate_str(contents)?;
        self.restore_backup(backup).await
    }

    /// Replace the user collections with a decoded backup
    ///
    /// Attachments are cleared since they point at transactions that may no
    /// longer exist. The document version and unmodelled keys are kept.
    pub async fn restore_backup(&self, backup: BackupDocument) -> InoutResult<RestoreResult> {
        let result = RestoreResult {
            backup_date: backup.metadata.backup_date.or(backup.metadata.export_date),
            accounts: backup.accounts.len(),
            categories: backup.categories.len(),
            transactions: backup.transactions.len(),
            budgets: backup.budgets.len(),
        };

        self.store
            .mutate(move |doc| {
                doc.accounts = backup.accounts;
                doc.categories = backup.categories;
                doc.transactions = backup.transactions;
                doc.budgets = backup.budgets;
                doc.attachments.clear();
                Ok(())
            })
            .await?;
        self.store.invalidate_cache();

        info!(records = result.total(), "restored backup");
        Ok(result)
    }

    /// Validate a backup file without restoring it
    pub async fn validate_file(&self, backup_path: &Path) -> InoutResult<BackupDocument> {
        let contents = read_backup(backup_path).await?;
        self.validate_str(&contents)
    }

    /// Decode backup text and check every record in it
    pub fn validate_str(&self, contents: &str) -> InoutResult<BackupDocument> {
        let mut backup = parse_backup(contents, self.store.period_start_day())?;

        check_records(&mut backup.accounts)?;
        check_records(&mut backup.categories)?;
        check_records(&mut backup.transactions)?;
        check_records(&mut backup.budgets)?;

        Ok(backup)
    }
}

async fn read_backup(path: &Path) -> InoutResult<String> {
    fs::read_to_string(path)
        .await
        .map_err(|e| InoutError::Io(format!("Failed to read backup file: {}", e)))
}

fn check_records<R: Record>(records: &mut [R]) -> InoutResult<()> {
    for record in records.iter_mut() {
        record.normalize();
        record.validate().map_err(|reason| {
            InoutError::Validation(format!(
                "invalid {} record {}: {}",
                R::COLLECTION,
                record.id(),
                reason
            ))
        })?;
    }
    Ok(())
}

/// Result of a restore operation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreResult {
    /// Date the backup was taken, if recorded
    pub backup_date: Option<DateTime<Utc>>,
    pub accounts: usize,
    pub categories: usize,
    pub transactions: usize,
    pub budgets: usize,
}

impl RestoreResult {
    pub fn total(&self) -> usize {
        self.accounts + self.categories + self.transactions + self.budgets
    }

    /// Get a summary of what was restored
    pub fn summary(&self) -> String {
        format!(
            "Restored {} accounts, {} categories, {} transactions, {} budgets",
            self.accounts, self.categories, self.transactions, self.budgets
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::models::{
        AccountId, Attachment, AttachmentId, CategoryId, Document, Transaction, TransactionType,
    };
    use crate::storage::MemoryKeyValueStore;
    use serde_json::{json, Value};

    fn store() -> Arc<DocumentStore> {
        Arc::new(DocumentStore::new(
            Arc::new(MemoryKeyValueStore::new()),
            &Settings::default(),
        ))
    }

    fn sample_document() -> Document {
        let mut doc = Document::with_defaults("USD");
        doc.transactions.push(Transaction::new(
            TransactionType::Expense,
            AccountId::from("acc1"),
            Some(CategoryId::from("cat1")),
            42.5,
            Utc::now(),
        ));
        doc
    }

    #[tokio::test]
    async fn test_round_trip() {
        let source = sample_document();
        let text = BackupDocument::backup_of(&source, Utc::now())
            .to_json_pretty()
            .unwrap();

        let target = store();
        let result = RestoreManager::new(Arc::clone(&target))
            .restore_from_str(&text)
            .await
            .unwrap();
        assert_eq!(result.transactions, 1);

        let restored = target.load().await;
        assert_eq!(restored.accounts, source.accounts);
        assert_eq!(restored.categories, source.categories);
        assert_eq!(restored.transactions, source.transactions);
        assert_eq!(restored.budgets, source.budgets);
    }

    #[tokio::test]
    async fn test_missing_budgets_leaves_store_untouched() {
        let target = store();
        target.save(sample_document()).await.unwrap();
        let before = target.load().await;

        let mut value: Value =
            serde_json::to_value(BackupDocument::backup_of(&Document::empty(), Utc::now()))
                .unwrap();
        value.as_object_mut().unwrap().remove("budgets");

        let err = RestoreManager::new(Arc::clone(&target))
            .restore_from_str(&value.to_string())
            .await
            .unwrap_err();
        assert!(err.is_validation());

        target.invalidate_cache();
        assert_eq!(target.load().await, before);
    }

    #[tokio::test]
    async fn test_invalid_record_rejects_whole_backup() {
        let target = store();
        let text = json!({
            "accounts": [],
            "categories": [],
            "transactions": [{
                "id": "t1", "type": "transfer", "accountId": "acc1",
                "accountIdTo": "acc1", "amount": 10, "date": "2024-06-01"
            }],
            "budgets": [],
            "metadata": {}
        })
        .to_string();

        let err = RestoreManager::new(Arc::clone(&target))
            .restore_from_str(&text)
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(target.load().await.transactions.is_empty());
    }

    #[tokio::test]
    async fn test_restore_clears_attachments_and_keeps_extra_keys() {
        let target = store();
        let mut doc = sample_document();
        doc.attachments.push(Attachment {
            id: AttachmentId::new(),
            transaction_id: doc.transactions[0].id.clone(),
            file_name: "receipt.jpg".into(),
            file_path: "/tmp/receipt.jpg".into(),
            file_size: 1024,
            mime_type: "image/jpeg".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        target.save(doc).await.unwrap();

        let text = BackupDocument::backup_of(&sample_document(), Utc::now())
            .to_json_pretty()
            .unwrap();
        RestoreManager::new(Arc::clone(&target))
            .restore_from_str(&text)
            .await
            .unwrap();

        let restored = target.load().await;
        assert!(restored.attachments.is_empty());
        assert!(restored.extra.contains_key("recurringRules"));
    }
}
