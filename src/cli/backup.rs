//! Backup CLI commands
//!
//! Implements CLI commands for backup management.

use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;

use crate::backup::{BackupManager, ExportedFile, JSON_MIME_TYPE};
use crate::error::{InoutError, InoutResult};

use super::{report_outcome, Context};

/// Backup subcommands
#[derive(Subcommand)]
pub enum BackupCommands {
    /// Create a new backup
    Create {
        /// Hand the backup to the share outbox afterwards
        #[arg(long)]
        share: bool,
    },

    /// List all available backups
    List {
        /// Show detailed information
        #[arg(short, long)]
        verbose: bool,
    },

    /// Restore from a backup
    Restore {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,

        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Show information about a specific backup
    Info {
        /// Backup filename or path
        backup: String,
    },

    /// Share an existing backup file
    Share {
        /// Backup filename or path (use 'latest' for most recent)
        backup: String,
    },
}

/// Handle a backup command
pub async fn handle_backup_command(ctx: &Context, cmd: BackupCommands) -> InoutResult<()> {
    let manager = ctx.backups();

    match cmd {
        BackupCommands::Create { share } => {
            println!("Creating backup...");
            let file = manager.create_backup(Utc::now()).await?;
            println!("Backup created: {}", file.file_name);
            println!("Location: {}", file.path.display());

            if share {
                report_outcome("Backup", ctx.share().share_backup(&file).await)?;
            }
        }

        BackupCommands::List { verbose } => {
            let backups = manager.list_backups().await?;

            if backups.is_empty() {
                println!("No backups found.");
                println!("Create one with: inout backup create");
                return Ok(());
            }

            println!("Available Backups");
            println!("=================");
            println!();

            for (i, backup) in backups.iter().enumerate() {
                let age = Utc::now().signed_duration_since(backup.created_at);
                if verbose {
                    println!(
                        "{}. {}\n   Created: {}\n   Size: {}\n   Age: {}\n",
                        i + 1,
                        backup.file_name,
                        backup.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        format_size(backup.size_bytes),
                        format_duration(age),
                    );
                } else {
                    println!(
                        "  {}. {} ({} ago, {})",
                        i + 1,
                        backup.file_name,
                        format_duration(age),
                        format_size(backup.size_bytes),
                    );
                }
            }

            println!();
            println!("Total: {} backup(s)", backups.len());
        }

        BackupCommands::Restore { backup, force } => {
            let backup_path = resolve_backup_path(&manager, &backup).await?;

            let restorer = ctx.restorer();
            let validated = restorer.validate_file(&backup_path).await?;

            println!("Backup Information");
            println!("==================");
            println!("File: {}", backup_path.display());
            if let Some(date) = validated
                .metadata
                .backup_date
                .or(validated.metadata.export_date)
            {
                println!("Created: {}", date.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            println!("Records: {}", validated.record_count());
            println!();

            if !force {
                println!("WARNING: This will overwrite ALL current data!");
                println!("To proceed, run again with --force flag:");
                println!("  inout backup restore {} --force", backup);
                return Ok(());
            }

            if ctx.store().has_data().await {
                println!("Creating backup of current data before restore...");
                let pre_restore = manager.create_backup(Utc::now()).await?;
                println!("Pre-restore backup saved: {}", pre_restore.file_name);
                println!();
            }

            println!("Restoring from backup...");
            let result = restorer.restore_backup(validated).await?;

            println!("Restore complete!");
            println!("{}", result.summary());
        }

        BackupCommands::Info { backup } => {
            let backup_path = resolve_backup_path(&manager, &backup).await?;
            let validated = ctx.restorer().validate_file(&backup_path).await?;
            let metadata = tokio::fs::metadata(&backup_path).await?;

            println!("Backup Details");
            println!("==============");
            println!("File: {}", backup_path.display());
            println!("Size: {}", format_size(metadata.len()));
            if let Some(date) = validated.metadata.backup_date {
                println!("Created: {}", date.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            if let Some(version) = &validated.metadata.version {
                println!("Format version: {}", version);
            }
            println!();
            println!("Contents:");
            println!("  Accounts:     {}", validated.accounts.len());
            println!("  Categories:   {}", validated.categories.len());
            println!("  Transactions: {}", validated.transactions.len());
            println!("  Budgets:      {}", validated.budgets.len());
        }

        BackupCommands::Share { backup } => {
            let path = resolve_backup_path(&manager, &backup).await?;
            let file_name = path
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let file = ExportedFile {
                path,
                file_name,
                mime_type: JSON_MIME_TYPE,
            };
            report_outcome("Backup", ctx.share().share_backup(&file).await)?;
        }
    }

    Ok(())
}

/// Resolve a backup path from user input
async fn resolve_backup_path(manager: &BackupManager, backup: &str) -> InoutResult<PathBuf> {
    if backup == "latest" {
        return manager
            .latest_backup()
            .await?
            .map(|b| b.path)
            .ok_or_else(|| InoutError::Validation("No backups available".into()));
    }

    let path = PathBuf::from(backup);
    if path.exists() {
        return Ok(path);
    }

    let in_export_dir = manager.export_dir().join(backup);
    if in_export_dir.exists() {
        return Ok(in_export_dir);
    }

    Err(InoutError::Validation(format!(
        "Backup not found: {}",
        backup
    )))
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_duration(duration: chrono::Duration) -> String {
    let days = duration.num_days();
    if days > 0 {
        return format!("{} day{}", days, if days == 1 { "" } else { "s" });
    }
    let hours = duration.num_hours();
    if hours > 0 {
        return format!("{} hour{}", hours, if hours == 1 { "" } else { "s" });
    }
    let minutes = duration.num_minutes().max(0);
    format!("{} minute{}", minutes, if minutes == 1 { "" } else { "s" })
}
