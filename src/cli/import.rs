//! Import CLI commands

use std::path::PathBuf;

use clap::Subcommand;

use crate::error::InoutResult;

use super::Context;

/// Import subcommands
#[derive(Subcommand)]
pub enum ImportCommands {
    /// Append transactions from a CSV export
    Csv {
        /// CSV file path
        file: PathBuf,
        /// List every skipped row
        #[arg(short, long)]
        verbose: bool,
    },
}

/// Handle an import command
pub async fn handle_import_command(ctx: &Context, cmd: ImportCommands) -> InoutResult<()> {
    match cmd {
        ImportCommands::Csv { file, verbose } => {
            let Some(report) = ctx.backups().import_transactions_csv(&file).await? else {
                println!("No valid transactions found in {}", file.display());
                return Ok(());
            };

            println!("Imported {} transactions", report.imported);
            if report.regenerated_ids > 0 {
                println!("  {} duplicate IDs were replaced", report.regenerated_ids);
            }
            if !report.skipped.is_empty() {
                println!("  Skipped {} invalid rows", report.skipped.len());
                if verbose {
                    for row in &report.skipped {
                        println!("    row {}: {}", row.row, row.reason);
                    }
                }
            }
        }
    }

    Ok(())
}
