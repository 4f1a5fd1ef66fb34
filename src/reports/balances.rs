//! Account balances and budget usage

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::money::{format_amount, percentage};
use crate::models::{AccountType, Budget, Document, TransactionType};

/// Current balance of one account
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountBalance {
    pub account_id: String,
    pub name: String,
    pub account_type: AccountType,
    pub currency_code: String,
    pub opening_balance: f64,
    pub balance: f64,
}

/// Balances for every account
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceReport {
    pub accounts: Vec<AccountBalance>,
}

impl BalanceReport {
    /// Replay every transaction over the opening balances
    pub fn generate(doc: &Document, include_archived: bool) -> Self {
        let accounts = doc
            .accounts
            .iter()
            .filter(|a| include_archived || !a.is_archived)
            .map(|account| {
                let movement: f64 = doc
                    .transactions
                    .iter()
                    .map(|t| t.signed_amount_for(&account.id))
                    .sum();
                AccountBalance {
                    account_id: account.id.to_string(),
                    name: account.name.clone(),
                    account_type: account.account_type,
                    currency_code: account.currency_code.clone(),
                    opening_balance: account.opening_balance,
                    balance: account.opening_balance + movement,
                }
            })
            .collect();
        Self { accounts }
    }

    pub fn balance_of(&self, account_id: &str) -> Option<f64> {
        self.accounts
            .iter()
            .find(|a| a.account_id == account_id)
            .map(|a| a.balance)
    }

    /// Format the report for terminal display
    pub fn format_terminal(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{:<24} {:<18} {:>14} {:>5}\n",
            "Account", "Type", "Balance", ""
        ));
        output.push_str(&"-".repeat(64));
        output.push('\n');
        for account in &self.accounts {
            output.push_str(&format!(
                "{:<24} {:<18} {:>14} {:>5}\n",
                account.name,
                account.account_type.label(),
                format_amount(account.balance),
                account.currency_code
            ));
        }
        output
    }
}

/// Spending against one budget
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetUsage {
    pub budget_id: String,
    pub category_id: String,
    pub category_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub budgeted: f64,
    pub spent: f64,
    pub remaining: f64,
    /// 0 when nothing is budgeted
    pub percentage: f64,
    pub over_budget: bool,
}

impl BudgetUsage {
    /// Expenses in the budget's category during its cycle
    ///
    /// Returns `None` for a budget whose period id does not parse.
    pub fn generate(doc: &Document, budget: &Budget) -> Option<Self> {
        let (start_date, end_date) = budget.period_range()?;
        let spent: f64 = doc
            .transactions
            .iter()
            .filter(|t| {
                let day = t.date.date_naive();
                t.kind == TransactionType::Expense
                    && t.category_id.as_ref() == Some(&budget.category_id)
                    && day >= start_date
                    && day <= end_date
            })
            .map(|t| t.amount)
            .sum();

        let category_name = doc
            .categories
            .iter()
            .find(|c| c.id == budget.category_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| budget.category_id.to_string());

        Some(Self {
            budget_id: budget.id.to_string(),
            category_id: budget.category_id.to_string(),
            category_name,
            start_date,
            end_date,
            budgeted: budget.amount,
            spent,
            remaining: budget.amount - spent,
            percentage: percentage(spent, budget.amount),
            over_budget: spent > budget.amount,
        })
    }

    /// Usage for every budget whose cycle contains `date`
    pub fn for_date(doc: &Document, date: NaiveDate) -> Vec<Self> {
        doc.budgets
            .iter()
            .filter(|b| b.cycle().is_some_and(|c| c.contains(date)))
            .filter_map(|b| Self::generate(doc, b))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, CategoryId, Transaction};
    use chrono::{TimeZone, Utc};

    fn at(month: u32, day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_balances_replay_all_kinds() {
        let mut doc = Document::with_defaults("USD");
        let bank = doc.accounts[0].id.clone();
        let cash = doc.accounts[1].id.clone();
        doc.accounts[0].opening_balance = 500.0;

        doc.transactions = vec![
            Transaction::new(TransactionType::Income, bank.clone(), Some(CategoryId::from("c")), 200.0, at(6, 1)),
            Transaction::new(TransactionType::Expense, bank.clone(), Some(CategoryId::from("c")), 50.0, at(6, 2)),
            Transaction::transfer(bank.clone(), cash.clone(), 100.0, at(6, 3)),
        ];

        let report = BalanceReport::generate(&doc, false);
        assert_eq!(report.balance_of(bank.as_str()), Some(550.0));
        assert_eq!(report.balance_of(cash.as_str()), Some(100.0));
        assert_eq!(report.accounts.len(), doc.accounts.len());
    }

    #[test]
    fn test_archived_accounts_hidden() {
        let mut doc = Document::with_defaults("USD");
        doc.accounts[0].is_archived = true;
        let report = BalanceReport::generate(&doc, false);
        assert_eq!(report.accounts.len(), doc.accounts.len() - 1);
        assert_eq!(
            BalanceReport::generate(&doc, true).accounts.len(),
            doc.accounts.len()
        );
    }

    #[test]
    fn test_budget_usage_follows_cycle() {
        let mut doc = Document::empty();
        let food = CategoryId::from("food");
        let budget = Budget::for_date(food.clone(), NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(), 15, 200.0);
        let account = AccountId::from("acc1");

        doc.transactions = vec![
            // Before the cycle starting 2024-06-15
            Transaction::new(TransactionType::Expense, account.clone(), Some(food.clone()), 80.0, at(6, 14)),
            Transaction::new(TransactionType::Expense, account.clone(), Some(food.clone()), 150.0, at(6, 15)),
            Transaction::new(TransactionType::Expense, account.clone(), Some(food.clone()), 100.0, at(7, 14)),
            Transaction::new(TransactionType::Expense, account, Some(CategoryId::from("rent")), 999.0, at(6, 20)),
        ];

        let usage = BudgetUsage::generate(&doc, &budget).unwrap();
        assert_eq!(usage.start_date, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(usage.end_date, NaiveDate::from_ymd_opt(2024, 7, 14).unwrap());
        assert_eq!(usage.spent, 250.0);
        assert_eq!(usage.remaining, -50.0);
        assert_eq!(usage.percentage, 125.0);
        assert!(usage.over_budget);
    }

    #[test]
    fn test_zero_budget_percentage() {
        let doc = Document::empty();
        let budget = Budget::for_date(CategoryId::from("food"), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(), 1, 0.0);
        let usage = BudgetUsage::generate(&doc, &budget).unwrap();
        assert_eq!(usage.percentage, 0.0);
        assert!(!usage.over_budget);
    }
}
