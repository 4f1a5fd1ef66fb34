//! Period summary and category breakdown
//!
//! Both reports cover an inclusive date range and leave transfers out: money
//! moving between the user's own accounts is neither income nor spending.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::models::money::{format_amount, percentage};
use crate::models::{CategoryKind, Document, Transaction, TransactionType};

fn in_range(txn: &Transaction, start: NaiveDate, end: NaiveDate) -> bool {
    let day = txn.date.date_naive();
    day >= start && day <= end
}

/// Income and expense totals for a date range
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub income: f64,
    pub expense: f64,
    pub net: f64,
    /// Income and expense transactions counted
    pub transaction_count: usize,
}

impl PeriodSummary {
    pub fn generate(doc: &Document, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        let mut income = 0.0;
        let mut expense = 0.0;
        let mut transaction_count = 0;

        for txn in doc
            .transactions
            .iter()
            .filter(|t| in_range(t, start_date, end_date))
        {
            match txn.kind {
                TransactionType::Income => income += txn.amount,
                TransactionType::Expense => expense += txn.amount,
                TransactionType::Transfer => continue,
            }
            transaction_count += 1;
        }

        Self {
            start_date,
            end_date,
            income,
            expense,
            net: income - expense,
            transaction_count,
        }
    }

    /// Format the report for terminal display
    pub fn format_terminal(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "Summary: {} to {}\n",
            self.start_date, self.end_date
        ));
        output.push_str(&"=".repeat(40));
        output.push('\n');
        output.push_str(&format!("{:<20} {:>18}\n", "Income", format_amount(self.income)));
        output.push_str(&format!("{:<20} {:>18}\n", "Expenses", format_amount(self.expense)));
        output.push_str(&"-".repeat(40));
        output.push('\n');
        output.push_str(&format!("{:<20} {:>18}\n", "Net", format_amount(self.net)));
        output.push_str(&format!("{:<20} {:>18}\n", "Transactions", self.transaction_count));
        output
    }
}

/// One category's share of the total
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    /// `None` for transactions without a category
    pub category_id: Option<String>,
    pub category_name: String,
    pub amount: f64,
    pub transaction_count: usize,
    pub percentage: f64,
}

/// Totals per category for one kind of transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub kind: CategoryKind,
    pub total: f64,
    /// Largest amount first
    pub rows: Vec<CategoryShare>,
}

impl CategoryBreakdown {
    pub fn generate(
        doc: &Document,
        kind: CategoryKind,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let wanted = match kind {
            CategoryKind::Income => TransactionType::Income,
            CategoryKind::Expense => TransactionType::Expense,
        };

        let names: HashMap<&str, &str> = doc
            .categories
            .iter()
            .map(|c| (c.id.as_str(), c.name.as_str()))
            .collect();

        let mut totals: HashMap<Option<&str>, (f64, usize)> = HashMap::new();
        let mut total = 0.0;
        for txn in doc
            .transactions
            .iter()
            .filter(|t| t.kind == wanted && in_range(t, start_date, end_date))
        {
            let entry = totals
                .entry(txn.category_id.as_ref().map(|c| c.as_str()))
                .or_insert((0.0, 0));
            entry.0 += txn.amount;
            entry.1 += 1;
            total += txn.amount;
        }

        let mut rows: Vec<CategoryShare> = totals
            .into_iter()
            .map(|(id, (amount, count))| CategoryShare {
                category_id: id.map(str::to_string),
                category_name: match id {
                    Some(id) => names.get(id).copied().unwrap_or(id).to_string(),
                    None => "Uncategorized".to_string(),
                },
                amount,
                transaction_count: count,
                percentage: percentage(amount, total),
            })
            .collect();
        rows.sort_by(|a, b| {
            b.amount
                .total_cmp(&a.amount)
                .then_with(|| a.category_name.cmp(&b.category_name))
        });

        Self {
            start_date,
            end_date,
            kind,
            total,
            rows,
        }
    }

    /// Format the report for terminal display
    pub fn format_terminal(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{:<30} {:>12} {:>6} {:>7}\n",
            "Category", "Amount", "Count", "%"
        ));
        output.push_str(&"-".repeat(58));
        output.push('\n');
        for row in &self.rows {
            output.push_str(&format!(
                "{:<30} {:>12} {:>6} {:>6.1}%\n",
                row.category_name,
                format_amount(row.amount),
                row.transaction_count,
                row.percentage
            ));
        }
        output.push_str(&"-".repeat(58));
        output.push('\n');
        output.push_str(&format!("{:<30} {:>12}\n", "TOTAL", format_amount(self.total)));
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccountId, CategoryId};
    use chrono::{TimeZone, Utc};

    fn txn(kind: TransactionType, category: Option<&str>, amount: f64, day: u32) -> Transaction {
        let date = Utc.with_ymd_and_hms(2024, 6, day, 10, 0, 0).unwrap();
        match kind {
            TransactionType::Transfer => {
                Transaction::transfer(AccountId::from("acc1"), AccountId::from("acc2"), amount, date)
            }
            _ => Transaction::new(kind, AccountId::from("acc1"), category.map(CategoryId::from), amount, date),
        }
    }

    fn june() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        )
    }

    fn document() -> Document {
        let mut doc = Document::empty();
        doc.transactions = vec![
            txn(TransactionType::Income, Some("salary"), 1000.0, 1),
            txn(TransactionType::Expense, Some("food"), 150.0, 3),
            txn(TransactionType::Expense, Some("rent"), 600.0, 5),
            txn(TransactionType::Expense, Some("food"), 50.0, 20),
            txn(TransactionType::Transfer, None, 300.0, 10),
        ];
        doc
    }

    #[test]
    fn test_summary_excludes_transfers() {
        let (start, end) = june();
        let summary = PeriodSummary::generate(&document(), start, end);
        assert_eq!(summary.income, 1000.0);
        assert_eq!(summary.expense, 800.0);
        assert_eq!(summary.net, 200.0);
        assert_eq!(summary.transaction_count, 4);
    }

    #[test]
    fn test_summary_respects_range() {
        let start = NaiveDate::from_ymd_opt(2024, 6, 4).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 19).unwrap();
        let summary = PeriodSummary::generate(&document(), start, end);
        assert_eq!(summary.income, 0.0);
        assert_eq!(summary.expense, 600.0);
    }

    #[test]
    fn test_breakdown_sorted_with_percentages() {
        let (start, end) = june();
        let report = CategoryBreakdown::generate(&document(), CategoryKind::Expense, start, end);
        assert_eq!(report.total, 800.0);
        assert_eq!(report.rows[0].category_id.as_deref(), Some("rent"));
        assert_eq!(report.rows[0].percentage, 75.0);
        assert_eq!(report.rows[1].amount, 200.0);
        assert_eq!(report.rows[1].transaction_count, 2);
    }

    #[test]
    fn test_breakdown_empty_total_gives_zero_percent() {
        let (start, end) = june();
        let report = CategoryBreakdown::generate(&Document::empty(), CategoryKind::Expense, start, end);
        assert!(report.rows.is_empty());
        assert_eq!(report.total, 0.0);
        assert!(report.format_terminal().contains("TOTAL"));
    }
}
