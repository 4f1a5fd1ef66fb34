//! CLI command handlers
//!
//! This module contains the implementation of CLI commands,
//! bridging the clap argument parsing with the service layer.

pub mod account;
pub mod backup;
pub mod budget;
pub mod category;
pub mod cloud;
pub mod export;
pub mod import;
pub mod query;
pub mod report;
pub mod schedule;
pub mod transaction;

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use crate::backup::{BackupManager, BackupScheduler, RestoreManager};
use crate::config::{InoutPaths, Settings};
use crate::error::{InoutError, InoutResult};
use crate::query::LocalQuery;
use crate::services::Ledger;
use crate::storage::{DocumentStore, Storage};
use crate::transport::{
    AuthProvider, BackupTarget, CloudDriveClient, OutboxShareSheet, ShareTransport,
    StoredTokenAuth, TransportOutcome,
};

pub use account::{handle_account_command, AccountCommands};
pub use backup::{handle_backup_command, BackupCommands};
pub use budget::{handle_budget_command, BudgetCommands};
pub use category::{handle_category_command, CategoryCommands};
pub use cloud::{handle_cloud_command, CloudCommands};
pub use export::{handle_export_command, ExportCommands};
pub use import::{handle_import_command, ImportCommands};
pub use query::{handle_query_command, QueryArgs};
pub use report::{handle_report_command, ReportCommands};
pub use schedule::{handle_schedule_command, ScheduleCommands};
pub use transaction::{handle_transaction_command, TransactionCommands};

/// Everything a command needs, opened once per invocation
pub struct Context {
    pub paths: InoutPaths,
    pub settings: Settings,
    pub storage: Storage,
}

impl Context {
    pub fn open(paths: InoutPaths, settings: Settings) -> InoutResult<Self> {
        let storage = Storage::open(paths.clone(), &settings)?;
        Ok(Self {
            paths,
            settings,
            storage,
        })
    }

    pub fn store(&self) -> Arc<DocumentStore> {
        self.storage.documents()
    }

    pub fn ledger(&self) -> Ledger {
        Ledger::new(LocalQuery::new(self.store(), &self.settings))
    }

    pub fn backups(&self) -> BackupManager {
        BackupManager::new(self.store(), self.paths.export_dir())
    }

    pub fn restorer(&self) -> RestoreManager {
        RestoreManager::new(self.store())
    }

    pub fn auth(&self) -> StoredTokenAuth {
        StoredTokenAuth::new(self.storage.kv())
    }

    pub fn cloud(&self) -> InoutResult<CloudDriveClient> {
        let auth: Arc<dyn AuthProvider> = Arc::new(self.auth());
        CloudDriveClient::new(&self.settings.cloud, auth)
    }

    pub fn share(&self) -> ShareTransport {
        let sheet = OutboxShareSheet::new(self.settings.outbox_dir(&self.paths));
        ShareTransport::new(Arc::new(sheet))
    }

    /// A scheduler wired to both transports
    pub fn scheduler(&self) -> InoutResult<BackupScheduler> {
        let cloud = self.cloud()?;
        let auth = Arc::clone(cloud.auth());
        let cloud: Arc<dyn BackupTarget> = Arc::new(cloud);
        let share: Arc<dyn BackupTarget> = Arc::new(self.share());

        Ok(BackupScheduler::new(
            self.storage.kv(),
            Arc::new(self.backups()),
            self.settings.scheduler_poll_interval(),
        )
        .with_share(share)
        .with_cloud(cloud, auth))
    }
}

/// Parse a YYYY-MM-DD argument
pub(crate) fn parse_date(value: &str) -> InoutResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        InoutError::Validation(format!(
            "Invalid date format: '{}'. Use YYYY-MM-DD",
            value
        ))
    })
}

/// Start of the given day in UTC
pub(crate) fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap_or_default())
}

/// Last second of the given day in UTC
pub(crate) fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(23, 59, 59).unwrap_or_default())
}

/// Print a transport outcome; failures become errors
pub(crate) fn report_outcome(what: &str, outcome: TransportOutcome) -> InoutResult<()> {
    match outcome {
        TransportOutcome::Succeeded => {
            println!("{} shared successfully.", what);
            Ok(())
        }
        TransportOutcome::Cancelled => {
            println!("{} was not shared.", what);
            Ok(())
        }
        TransportOutcome::Failed(reason) => Err(InoutError::Transport(reason)),
    }
}
