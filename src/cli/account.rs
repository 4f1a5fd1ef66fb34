//! Account CLI commands
//!
//! Implements CLI commands for account management.

use clap::Subcommand;

use crate::error::{InoutError, InoutResult};
use crate::models::money::format_with_currency;
use crate::models::{Account, AccountType};
use crate::reports::BalanceReport;

use super::Context;

/// Account subcommands
#[derive(Subcommand)]
pub enum AccountCommands {
    /// Create a new account
    Add {
        /// Account name
        name: String,
        /// Account type (bank, cash, card, wallet, other)
        #[arg(short = 't', long, default_value = "bank")]
        account_type: String,
        /// Opening balance (e.g., "1000.00" or "1000")
        #[arg(short, long, default_value = "0")]
        balance: String,
        /// Currency code; defaults to the configured currency
        #[arg(short, long)]
        currency: Option<String>,
    },
    /// List accounts with their balances
    List {
        /// Show archived accounts
        #[arg(short, long)]
        all: bool,
    },
    /// Archive an account
    Archive {
        /// Account name or ID
        account: String,
    },
    /// Delete an account
    Delete {
        /// Account name or ID
        account: String,
    },
}

/// Handle an account command
pub async fn handle_account_command(ctx: &Context, cmd: AccountCommands) -> InoutResult<()> {
    let ledger = ctx.ledger();

    match cmd {
        AccountCommands::Add {
            name,
            account_type,
            balance,
            currency,
        } => {
            let account_type = AccountType::parse(&account_type).ok_or_else(|| {
                InoutError::Validation(format!(
                    "Invalid account type: '{}'. Valid types: bank, cash, card, wallet, other",
                    account_type
                ))
            })?;

            let opening_balance: f64 = balance.trim().parse().map_err(|_| {
                InoutError::Validation(format!(
                    "Invalid balance format: '{}'. Use format like '1000.00' or '1000'",
                    balance
                ))
            })?;

            let currency = currency.unwrap_or_else(|| ctx.settings.currency_code.clone());
            let account = ledger
                .add_account(&name, account_type, opening_balance, &currency)
                .await?;

            println!("Created account: {}", account.name);
            println!("  Type: {}", account.account_type);
            println!(
                "  Opening Balance: {}",
                format_with_currency(account.opening_balance, &account.currency_code)
            );
            println!("  ID: {}", account.id);
        }

        AccountCommands::List { all } => {
            let doc = ctx.store().load().await;
            let report = BalanceReport::generate(&doc, all);
            if report.accounts.is_empty() {
                println!("No accounts found.");
            } else {
                print!("{}", report.format_terminal());
            }
        }

        AccountCommands::Archive { account } => {
            let found = ledger
                .find_account(&account)
                .await?
                .ok_or_else(|| InoutError::not_found("accounts", &account))?;

            let archived: Account = ledger
                .update(found.id.as_str(), serde_json::json!({ "isArchived": true }))
                .await?;
            println!("Archived account: {}", archived.name);
        }

        AccountCommands::Delete { account } => {
            let found = ledger
                .find_account(&account)
                .await?
                .ok_or_else(|| InoutError::not_found("accounts", &account))?;

            ledger.delete::<Account>(found.id.as_str()).await?;
            println!("Deleted account: {}", found.name);
        }
    }

    Ok(())
}
