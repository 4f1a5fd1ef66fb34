//! Export CLI commands

use std::path::PathBuf;

use chrono::Utc;
use clap::Subcommand;
use tokio::fs;

use crate::error::{InoutError, InoutResult};
use crate::export::BackupDocument;

use super::{report_outcome, Context};

/// Export subcommands
#[derive(Subcommand)]
pub enum ExportCommands {
    /// Export all transactions as CSV
    Csv {
        /// Hand the file to the share outbox afterwards
        #[arg(long)]
        share: bool,
    },

    /// Write the full ledger as JSON to a chosen path
    Json {
        /// Output file
        output: PathBuf,
    },
}

/// Handle an export command
pub async fn handle_export_command(ctx: &Context, cmd: ExportCommands) -> InoutResult<()> {
    match cmd {
        ExportCommands::Csv { share } => {
            let file = ctx.backups().export_transactions_csv(Utc::now()).await?;
            println!("Exported transactions to: {}", file.path.display());

            if share {
                let content = fs::read_to_string(&file.path).await?;
                report_outcome("Export", ctx.share().share_export(&file, &content).await)?;
            }
        }

        ExportCommands::Json { output } => {
            let doc = ctx.store().load().await;
            if !doc.has_data() {
                return Err(InoutError::Export("No data available to export".into()));
            }
            let backup = BackupDocument::from_document(&doc, Utc::now());
            fs::write(&output, backup.to_json_pretty()?).await?;
            println!(
                "Exported {} records to: {}",
                backup.metadata.total_records,
                output.display()
            );
        }
    }

    Ok(())
}
