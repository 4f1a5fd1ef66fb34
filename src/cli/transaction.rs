//! Transaction CLI commands

use chrono::{Months, NaiveDate, Utc};
use clap::Subcommand;

use crate::error::{InoutError, InoutResult};
use crate::models::money::format_amount;
use crate::models::{
    normalize_tags, Account, Category, CategoryKind, Document, Transaction, TransactionType,
};
use crate::query::{ListQuery, SortOrder};

use super::{end_of_day, parse_date, start_of_day, Context};

/// Transaction subcommands
#[derive(Subcommand)]
pub enum TransactionCommands {
    /// Add a new transaction
    Add {
        /// income, expense or transfer
        kind: String,
        /// Amount, always positive (e.g., "42.50")
        amount: String,
        /// Account name or ID
        account: String,
        /// Category name or ID (income and expense)
        #[arg(short, long)]
        category: Option<String>,
        /// Destination account name or ID (transfers)
        #[arg(long)]
        to: Option<String>,
        /// Transaction date (YYYY-MM-DD); defaults to now
        #[arg(short, long)]
        date: Option<String>,
        /// Free-form note
        #[arg(short, long)]
        note: Option<String>,
        /// Tag, may be repeated
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List transactions, newest first
    List {
        /// Filter by type
        #[arg(short = 't', long = "type")]
        kind: Option<String>,
        /// Filter by category name or ID
        #[arg(short, long)]
        category: Option<String>,
        /// Filter by month (YYYY-MM)
        #[arg(short, long, conflicts_with_all = ["from", "to"])]
        month: Option<String>,
        /// Earliest date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// Latest date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Sort ascending by date
        #[arg(long)]
        oldest_first: bool,
        /// Page number, starting at 1
        #[arg(long, default_value = "1")]
        page: usize,
        /// Transactions per page
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show one transaction
    Show {
        /// Transaction ID
        id: String,
    },

    /// Delete a transaction
    Delete {
        /// Transaction ID
        id: String,
    },
}

/// Handle a transaction command
pub async fn handle_transaction_command(
    ctx: &Context,
    cmd: TransactionCommands,
) -> InoutResult<()> {
    let ledger = ctx.ledger();

    match cmd {
        TransactionCommands::Add {
            kind,
            amount,
            account,
            category,
            to,
            date,
            note,
            tags,
        } => {
            let kind = TransactionType::parse(&kind).ok_or_else(|| {
                InoutError::Validation(format!(
                    "Invalid transaction type: '{}'. Use income, expense or transfer",
                    kind
                ))
            })?;
            let amount: f64 = amount
                .trim()
                .parse()
                .map_err(|_| InoutError::Validation(format!("Invalid amount: '{}'", amount)))?;

            let source = ledger
                .find_account(&account)
                .await?
                .ok_or_else(|| InoutError::not_found("accounts", &account))?;

            let date = match date {
                Some(d) => start_of_day(parse_date(&d)?),
                None => Utc::now(),
            };

            let mut txn = match kind {
                TransactionType::Transfer => {
                    let to = to.ok_or_else(|| {
                        InoutError::Validation("A transfer needs --to <account>".into())
                    })?;
                    let destination = ledger
                        .find_account(&to)
                        .await?
                        .ok_or_else(|| InoutError::not_found("accounts", &to))?;
                    Transaction::transfer(source.id.clone(), destination.id, amount, date)
                }
                TransactionType::Income | TransactionType::Expense => {
                    let category = category.ok_or_else(|| {
                        InoutError::Validation(format!("An {} needs --category", kind))
                    })?;
                    let wanted = if kind == TransactionType::Income {
                        CategoryKind::Income
                    } else {
                        CategoryKind::Expense
                    };
                    let found = ledger
                        .find_category(&category, Some(wanted))
                        .await?
                        .ok_or_else(|| InoutError::not_found("categories", &category))?;
                    Transaction::new(kind, source.id.clone(), Some(found.id), amount, date)
                }
            };
            txn.currency_code = source.currency_code.clone();
            txn.note = note;
            txn.tags = normalize_tags(&tags);

            let created = ledger.create(&txn).await?;
            println!("Added {}", created);
            println!("  ID: {}", created.id);
        }

        TransactionCommands::List {
            kind,
            category,
            month,
            from,
            to,
            oldest_first,
            page,
            limit,
        } => {
            let order = if oldest_first {
                SortOrder::Asc
            } else {
                SortOrder::Desc
            };
            let (from, to) = match month {
                Some(month) => {
                    let (first, last) = month_range(&month)?;
                    (Some(first), Some(last))
                }
                None => (
                    from.as_deref().map(parse_date).transpose()?,
                    to.as_deref().map(parse_date).transpose()?,
                ),
            };
            let mut query = ListQuery::default()
                .sorted_by("date", order)
                .paged(page, limit)
                .between(from.map(start_of_day), to.map(end_of_day));
            if let Some(kind) = kind {
                let kind = TransactionType::parse(&kind).ok_or_else(|| {
                    InoutError::Validation(format!("Invalid transaction type: '{}'", kind))
                })?;
                query = query.with_type(kind.as_str());
            }
            if let Some(category) = category {
                let found = ledger
                    .find_category(&category, None)
                    .await?
                    .ok_or_else(|| InoutError::not_found("categories", &category))?;
                query = query.with_category(found.id.as_str());
            }

            let transactions: Vec<Transaction> = ledger.list(query).await?;
            if transactions.is_empty() {
                println!("No transactions found.");
                return Ok(());
            }

            let mut names = Document::empty();
            names.accounts = ledger.list::<Account>(ListQuery::default()).await?;
            names.categories = ledger.list::<Category>(ListQuery::default()).await?;
            for txn in &transactions {
                print_row(&names, txn);
            }
        }

        TransactionCommands::Show { id } => {
            let txn: Transaction = ledger
                .get(&id)
                .await?
                .ok_or_else(|| InoutError::not_found("transactions", &id))?;
            let json = serde_json::to_string_pretty(&txn)?;
            println!("{}", json);
        }

        TransactionCommands::Delete { id } => {
            ledger.delete::<Transaction>(&id).await?;
            println!("Deleted transaction: {}", id);
        }
    }

    Ok(())
}

/// First and last day of a YYYY-MM month
fn month_range(month: &str) -> InoutResult<(NaiveDate, NaiveDate)> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", month.trim()), "%Y-%m-%d")
        .map_err(|_| InoutError::Validation(format!("Invalid month: '{}'. Use YYYY-MM", month)))?;
    let last = first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or_else(|| InoutError::Validation(format!("Invalid month: '{}'", month)))?;
    Ok((first, last))
}

fn print_row(names: &Document, txn: &Transaction) {
    let account = names
        .accounts
        .iter()
        .find(|a| a.id == txn.account_id)
        .map(|a| a.name.as_str())
        .unwrap_or(txn.account_id.as_str());
    let detail = match (&txn.category_id, &txn.account_id_to) {
        (_, Some(to)) => {
            let to_name = names
                .accounts
                .iter()
                .find(|a| &a.id == to)
                .map(|a| a.name.as_str())
                .unwrap_or(to.as_str());
            format!("-> {}", to_name)
        }
        (Some(category), None) => names
            .categories
            .iter()
            .find(|c| &c.id == category)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| category.to_string()),
        (None, None) => String::new(),
    };

    println!(
        "{}  {:<8} {:>12}  {:<20} {:<24} {}",
        txn.date.format("%Y-%m-%d"),
        txn.kind,
        format_amount(txn.amount),
        account,
        detail,
        txn.id
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_range() {
        let (first, last) = month_range("2024-02").unwrap();
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());

        let (_, last) = month_range("2023-12").unwrap();
        assert_eq!(last, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        assert!(month_range("2024-13").is_err());
    }
}
