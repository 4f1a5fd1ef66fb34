//! Reports module for In & Out
//!
//! Read-only views over the ledger document: period totals, category
//! breakdowns, budget usage and account balances.

pub mod balances;
pub mod summary;

pub use balances::{AccountBalance, BalanceReport, BudgetUsage};
pub use summary::{CategoryBreakdown, CategoryShare, PeriodSummary};
