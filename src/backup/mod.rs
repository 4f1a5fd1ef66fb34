//! Backup system for In & Out
//!
//! - `BackupManager`: writes CSV exports and JSON backups, imports CSV
//! - `RestoreManager`: validates and restores JSON backups
//! - `BackupScheduler`: runs backups on a daily, weekly or monthly schedule
//!
//! # Example
//!
//! ```rust,ignore
//! use inout::backup::{BackupManager, RestoreManager};
//!
//! let manager = BackupManager::new(storage.documents(), paths.export_dir());
//! let file = manager.create_backup(Utc::now()).await?;
//!
//! // Later, restore from backup
//! let restore = RestoreManager::new(storage.documents());
//! let result = restore.restore_from_file(&file.path).await?;
//! println!("{}", result.summary());
//! ```

mod manager;
mod restore;
pub mod scheduler;

pub use manager::{
    BackupInfo, BackupManager, CsvImportReport, ExportedFile, CSV_MIME_TYPE, JSON_MIME_TYPE,
};
pub use restore::{RestoreManager, RestoreResult};
pub use scheduler::{
    is_backup_due, next_backup_date, AppLifecycle, BackupFrequency, BackupMethod,
    BackupScheduler, ScheduleSettings, ScheduledRun, SchedulerState,
};
