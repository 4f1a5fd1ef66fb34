//! Backup manager for In & Out
//!
//! Writes CSV exports and JSON backups of the ledger document into the
//! exports directory, and appends transactions imported from CSV.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use tokio::fs;
use tracing::{info, warn};

use crate::error::{InoutError, InoutResult};
use crate::export::{parse_transactions_csv, transactions_to_csv, BackupDocument, SkippedRow};
use crate::models::TransactionId;
use crate::storage::{write_text_atomic, DocumentStore};

pub const CSV_MIME_TYPE: &str = "text/csv";
pub const JSON_MIME_TYPE: &str = "application/json";

const EXPORT_PREFIX: &str = "transactions_export_";
const BACKUP_PREFIX: &str = "financial_backup_";
const FILE_TIMESTAMP: &str = "%Y%m%d-%H%M%S";

/// A file written to the exports directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub mime_type: &'static str,
}

/// Metadata about a backup file on disk
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    /// Backup filename
    pub file_name: String,
    /// Full path to backup
    pub path: PathBuf,
    /// When the backup was created, from the filename
    pub created_at: DateTime<Utc>,
    /// Size in bytes
    pub size_bytes: u64,
}

/// Outcome of a CSV import that added at least one transaction
#[derive(Debug, Clone, Default)]
pub struct CsvImportReport {
    pub imported: usize,
    pub skipped: Vec<SkippedRow>,
    /// Source ids that collided and were replaced by fresh ones
    pub regenerated_ids: usize,
}

/// Manages exports, backups and CSV imports
pub struct BackupManager {
    store: Arc<DocumentStore>,
    export_dir: PathBuf,
}

impl BackupManager {
    /// Create a new BackupManager
    pub fn new(store: Arc<DocumentStore>, export_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            export_dir: export_dir.into(),
        }
    }

    /// Get export directory path
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    /// Export every transaction as CSV
    ///
    /// Refuses when the ledger holds no records at all.
    pub async fn export_transactions_csv(&self, now: DateTime<Utc>) -> InoutResult<ExportedFile> {
        let doc = self.store.load().await;
        if !doc.has_data() {
            return Err(InoutError::Export("No data available to export".into()));
        }

        let csv = transactions_to_csv(&doc.transactions)?;
        let file_name = format!("{}{}.csv", EXPORT_PREFIX, now.format(FILE_TIMESTAMP));
        let file = self.write_file(file_name, &csv, CSV_MIME_TYPE).await?;

        info!(
            path = %file.path.display(),
            transactions = doc.transactions.len(),
            "exported transactions to CSV"
        );
        Ok(file)
    }

    /// Write a full JSON backup of the user collections
    pub async fn create_backup(&self, now: DateTime<Utc>) -> InoutResult<ExportedFile> {
        let doc = self.store.load().await;
        if !doc.has_data() {
            return Err(InoutError::Export("No data available to export".into()));
        }

        let backup = BackupDocument::backup_of(&doc, now);
        let json = backup.to_json_pretty()?;
        let file_name = format!("{}{}.json", BACKUP_PREFIX, now.format(FILE_TIMESTAMP));
        let file = self.write_file(file_name, &json, JSON_MIME_TYPE).await?;

        info!(
            path = %file.path.display(),
            records = backup.metadata.total_records,
            "backup created"
        );
        Ok(file)
    }

    async fn write_file(
        &self,
        file_name: String,
        contents: &str,
        mime_type: &'static str,
    ) -> InoutResult<ExportedFile> {
        let path = self.export_dir.join(&file_name);
        write_text_atomic(&path, contents)
            .await
            .map_err(|e| InoutError::Export(format!("Failed to write {}: {}", file_name, e)))?;
        Ok(ExportedFile {
            path,
            file_name,
            mime_type,
        })
    }

    /// Append the transactions in a CSV file to the ledger
    ///
    /// Returns `None` when the file holds no valid row. Ids that collide with
    /// an existing transaction, or with an earlier row, are replaced.
    pub async fn import_transactions_csv(
        &self,
        path: &Path,
    ) -> InoutResult<Option<CsvImportReport>> {
        let text = fs::read_to_string(path).await.map_err(|e| {
            InoutError::Import(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let parsed = parse_transactions_csv(text.as_bytes(), Utc::now());
        if parsed.transactions.is_empty() {
            warn!(
                path = %path.display(),
                skipped = parsed.skipped.len(),
                "no valid transactions to import"
            );
            return Ok(None);
        }

        let mut incoming = parsed.transactions;
        let (regenerated_ids, imported) = self
            .store
            .mutate(move |doc| {
                let mut seen: HashSet<TransactionId> =
                    doc.transactions.iter().map(|t| t.id.clone()).collect();
                let mut regenerated = 0;
                for txn in incoming.iter_mut() {
                    if !seen.insert(txn.id.clone()) {
                        txn.id = TransactionId::new();
                        seen.insert(txn.id.clone());
                        regenerated += 1;
                    }
                }
                let count = incoming.len();
                doc.transactions.append(&mut incoming);
                Ok((regenerated, count))
            })
            .await?;

        info!(imported, skipped = parsed.skipped.len(), "imported transactions from CSV");

        Ok(Some(CsvImportReport {
            imported,
            skipped: parsed.skipped,
            regenerated_ids,
        }))
    }

    /// List backup files, newest first
    pub async fn list_backups(&self) -> InoutResult<Vec<BackupInfo>> {
        let mut entries = match fs::read_dir(&self.export_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(InoutError::Io(format!(
                    "Failed to read export directory: {}",
                    e
                )))
            }
        };

        let mut backups = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let Some(created_at) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_backup_file_name)
            else {
                continue;
            };
            let size_bytes = entry.metadata().await.map(|m| m.len()).unwrap_or(0);
            backups.push(BackupInfo {
                file_name: entry.file_name().to_string_lossy().into_owned(),
                path,
                created_at,
                size_bytes,
            });
        }

        backups.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(backups)
    }

    /// Get the most recent backup
    pub async fn latest_backup(&self) -> InoutResult<Option<BackupInfo>> {
        Ok(self.list_backups().await?.into_iter().next())
    }
}

/// Creation time encoded in a `financial_backup_YYYYMMDD-HHMMSS.json` name
fn parse_backup_file_name(name: &str) -> Option<DateTime<Utc>> {
    let stamp = name.strip_prefix(BACKUP_PREFIX)?.strip_suffix(".json")?;
    NaiveDateTime::parse_from_str(stamp, FILE_TIMESTAMP)
        .ok()
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::export::CSV_HEADER;
    use crate::models::Document;
    use crate::storage::MemoryKeyValueStore;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn create_test_manager() -> (BackupManager, Arc<DocumentStore>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(DocumentStore::new(
            Arc::new(MemoryKeyValueStore::new()),
            &Settings::default(),
        ));
        let manager = BackupManager::new(Arc::clone(&store), temp_dir.path().join("exports"));
        (manager, store, temp_dir)
    }

    #[tokio::test]
    async fn test_export_refuses_empty_ledger() {
        let (manager, store, _temp) = create_test_manager();
        store.save(Document::empty()).await.unwrap();

        let err = manager.export_transactions_csv(Utc::now()).await.unwrap_err();
        assert_eq!(err.to_string(), "Export error: No data available to export");
    }

    #[tokio::test]
    async fn test_export_file_name_and_header() {
        let (manager, _store, _temp) = create_test_manager();
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 5, 3).unwrap();

        let file = manager.export_transactions_csv(now).await.unwrap();
        assert_eq!(file.file_name, "transactions_export_20240601-090503.csv");
        assert_eq!(file.mime_type, CSV_MIME_TYPE);

        let contents = std::fs::read_to_string(&file.path).unwrap();
        assert_eq!(contents.lines().next(), Some(CSV_HEADER));
    }

    #[tokio::test]
    async fn test_list_backups_newest_first() {
        let (manager, _store, _temp) = create_test_manager();
        assert!(manager.list_backups().await.unwrap().is_empty());

        let older = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let newer = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        manager.create_backup(older).await.unwrap();
        let latest = manager.create_backup(newer).await.unwrap();
        manager.export_transactions_csv(newer).await.unwrap();

        let backups = manager.list_backups().await.unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(backups[0].created_at, newer);
        assert_eq!(manager.latest_backup().await.unwrap().unwrap().path, latest.path);
    }

    #[tokio::test]
    async fn test_import_appends_and_regenerates_colliding_ids() {
        let (manager, store, temp) = create_test_manager();
        let csv_path = temp.path().join("in.csv");
        std::fs::write(
            &csv_path,
            format!(
                "{}\nt1,2024-06-01,expense,10,USD,cat1,acc1,,\"\",\"\"\nt1,2024-06-02,expense,20,USD,cat1,acc1,,\"\",\"\"\nbad\n",
                CSV_HEADER
            ),
        )
        .unwrap();

        let report = manager
            .import_transactions_csv(&csv_path)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(report.imported, 2);
        assert_eq!(report.regenerated_ids, 1);
        assert_eq!(report.skipped.len(), 1);

        // Importing again appends rather than replacing
        manager.import_transactions_csv(&csv_path).await.unwrap();
        let doc = store.load().await;
        assert_eq!(doc.transactions.len(), 4);
        let ids: HashSet<_> = doc.transactions.iter().map(|t| t.id.clone()).collect();
        assert_eq!(ids.len(), 4);
    }

    #[tokio::test]
    async fn test_import_without_valid_rows() {
        let (manager, store, temp) = create_test_manager();
        let csv_path = temp.path().join("empty.csv");
        std::fs::write(&csv_path, format!("{}\n", CSV_HEADER)).unwrap();

        assert!(manager.import_transactions_csv(&csv_path).await.unwrap().is_none());
        assert!(store.load().await.transactions.is_empty());
    }

    #[test]
    fn test_parse_backup_file_name() {
        let parsed = parse_backup_file_name("financial_backup_20251127-143022.json").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 11, 27, 14, 30, 22).unwrap());
        assert!(parse_backup_file_name("transactions_export_20251127-143022.csv").is_none());
        assert!(parse_backup_file_name("financial_backup_garbage.json").is_none());
    }
}
