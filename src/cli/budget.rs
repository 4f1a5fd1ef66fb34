//! Budget CLI commands
//!
//! Budgets are set per category for one budget cycle. A cycle starts on the
//! configured period start day.

use chrono::Utc;
use clap::Subcommand;

use crate::error::{InoutError, InoutResult};
use crate::models::money::format_amount;
use crate::models::{Budget, BudgetCycle, CategoryKind};
use crate::query::ListQuery;

use super::{parse_date, Context};

/// Budget subcommands
#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Set the budget for an expense category
    Set {
        /// Category name or ID
        category: String,
        /// Amount (e.g., "100" or "100.00")
        amount: String,
        /// Any date inside the cycle (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<String>,
    },

    /// List budgets, optionally for one cycle
    List {
        /// Period id such as 2025-01-15
        #[arg(short, long)]
        period: Option<String>,
    },

    /// Remove a budget
    Delete {
        /// Budget ID
        id: String,
    },
}

/// Handle a budget command
pub async fn handle_budget_command(ctx: &Context, cmd: BudgetCommands) -> InoutResult<()> {
    let ledger = ctx.ledger();

    match cmd {
        BudgetCommands::Set {
            category,
            amount,
            date,
        } => {
            let found = ledger
                .find_category(&category, Some(CategoryKind::Expense))
                .await?
                .ok_or_else(|| InoutError::not_found("categories", &category))?;

            let amount: f64 = amount.trim().parse().map_err(|_| {
                InoutError::Validation(format!("Invalid amount: '{}'", amount))
            })?;
            let date = match date {
                Some(d) => parse_date(&d)?,
                None => Utc::now().date_naive(),
            };

            let budget = Budget::for_date(
                found.id.clone(),
                date,
                ctx.settings.period_start_day,
                amount,
            );

            // One budget per category and cycle
            let existing: Vec<Budget> = ledger.list(ListQuery::default()).await?;
            let saved = match existing
                .iter()
                .find(|b| b.category_id == found.id && b.period_id == budget.period_id)
            {
                Some(current) => {
                    ledger
                        .update::<Budget>(current.id.as_str(), serde_json::json!({ "amount": amount }))
                        .await?
                }
                None => ledger.create(&budget).await?,
            };

            let cycle = saved
                .cycle()
                .map(|c| c.to_string())
                .unwrap_or_else(|| saved.period_id.clone());
            println!(
                "Budget for {} set to {} ({})",
                found.name,
                format_amount(saved.amount),
                cycle
            );
        }

        BudgetCommands::List { period } => {
            if let Some(p) = &period {
                if BudgetCycle::from_period_id(p).is_none() {
                    return Err(InoutError::Validation(format!(
                        "Invalid period: '{}'. Use YYYY-MM-DD",
                        p
                    )));
                }
            }
            let budgets: Vec<Budget> = ledger.list(ListQuery::default()).await?;
            let doc = ctx.store().load().await;

            let mut shown = 0;
            for budget in budgets
                .iter()
                .filter(|b| period.as_deref().map_or(true, |p| b.period_id == p))
            {
                let name = doc
                    .categories
                    .iter()
                    .find(|c| c.id == budget.category_id)
                    .map(|c| c.name.as_str())
                    .unwrap_or(budget.category_id.as_str());
                println!(
                    "{:<24} {:>12}  {}  {}",
                    name,
                    format_amount(budget.amount),
                    budget.period_id,
                    budget.id
                );
                shown += 1;
            }
            if shown == 0 {
                println!("No budgets found.");
            }
        }

        BudgetCommands::Delete { id } => {
            ledger.delete::<Budget>(&id).await?;
            println!("Deleted budget: {}", id);
        }
    }

    Ok(())
}
