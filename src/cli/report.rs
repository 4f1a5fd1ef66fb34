//! CLI commands for reports

use chrono::{NaiveDate, Utc};
use clap::Subcommand;
use serde::Serialize;

use crate::error::{InoutError, InoutResult};
use crate::models::money::format_amount;
use crate::models::{BudgetCycle, CategoryKind};
use crate::reports::{BalanceReport, BudgetUsage, CategoryBreakdown, PeriodSummary};

use super::{parse_date, Context};

/// Report subcommands
#[derive(Subcommand, Debug)]
pub enum ReportCommands {
    /// Income, expenses and net for a date range
    Summary {
        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(short, long)]
        end: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Totals per category
    #[command(alias = "spending")]
    Categories {
        /// income or expense
        #[arg(short = 't', long = "type", default_value = "expense")]
        kind: String,
        /// Start date (YYYY-MM-DD)
        #[arg(short, long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(short, long)]
        end: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Spending against each budget in the current cycle
    Budgets {
        /// Any date inside the cycle (YYYY-MM-DD); defaults to today
        #[arg(short, long)]
        date: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Current balance of every account
    Balances {
        /// Include archived accounts
        #[arg(short, long)]
        all: bool,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

/// Resolve a range, defaulting to the budget cycle containing today
fn resolve_range(
    start: Option<String>,
    end: Option<String>,
    period_start_day: u8,
) -> InoutResult<(NaiveDate, NaiveDate)> {
    let today = Utc::now().date_naive();
    let cycle = BudgetCycle::containing(today, period_start_day);

    let start = match start {
        Some(s) => parse_date(&s)?,
        None => cycle.start_date(),
    };
    let end = match end {
        Some(e) => parse_date(&e)?,
        None => cycle.end_date(),
    };
    if start > end {
        return Err(InoutError::Validation(format!(
            "Start date {} is after end date {}",
            start, end
        )));
    }
    Ok((start, end))
}

fn print_json<T: Serialize>(value: &T) -> InoutResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Handle a report command
pub async fn handle_report_command(ctx: &Context, cmd: ReportCommands) -> InoutResult<()> {
    let doc = ctx.store().load().await;
    let start_day = ctx.settings.period_start_day;

    match cmd {
        ReportCommands::Summary { start, end, json } => {
            let (start, end) = resolve_range(start, end, start_day)?;
            let report = PeriodSummary::generate(&doc, start, end);
            if json {
                return print_json(&report);
            }
            print!("{}", report.format_terminal());
        }

        ReportCommands::Categories {
            kind,
            start,
            end,
            json,
        } => {
            let kind = CategoryKind::parse(&kind).ok_or_else(|| {
                InoutError::Validation(format!(
                    "Invalid category type: '{}'. Use income or expense",
                    kind
                ))
            })?;
            let (start, end) = resolve_range(start, end, start_day)?;
            let report = CategoryBreakdown::generate(&doc, kind, start, end);
            if json {
                return print_json(&report);
            }
            println!("{} by category: {} to {}", title_case(kind), start, end);
            println!();
            print!("{}", report.format_terminal());
        }

        ReportCommands::Budgets { date, json } => {
            let date = match date {
                Some(d) => parse_date(&d)?,
                None => Utc::now().date_naive(),
            };
            let usage = BudgetUsage::for_date(&doc, date);
            if json {
                return print_json(&usage);
            }
            if usage.is_empty() {
                println!("No budgets for the cycle containing {}.", date);
                return Ok(());
            }

            println!(
                "{:<24} {:>12} {:>12} {:>12} {:>7}",
                "Category", "Budgeted", "Spent", "Remaining", "%"
            );
            println!("{}", "-".repeat(71));
            for row in &usage {
                println!(
                    "{:<24} {:>12} {:>12} {:>12} {:>6.1}%{}",
                    row.category_name,
                    format_amount(row.budgeted),
                    format_amount(row.spent),
                    format_amount(row.remaining),
                    row.percentage,
                    if row.over_budget { "  OVER" } else { "" }
                );
            }
        }

        ReportCommands::Balances { all, json } => {
            let report = BalanceReport::generate(&doc, all);
            if json {
                return print_json(&report);
            }
            println!("Balances as of {}", Utc::now().date_naive().format("%Y-%m-%d"));
            println!();
            print!("{}", report.format_terminal());
        }
    }

    Ok(())
}

fn title_case(kind: CategoryKind) -> &'static str {
    match kind {
        CategoryKind::Income => "Income",
        CategoryKind::Expense => "Expenses",
    }
}
