//! Budget model and the legacy budget upgrade
//!
//! Budgets are keyed by category and cycle (`periodId`, `YYYY-MM-DD`). Older
//! documents stored a calendar `month` (`YYYY-MM`) instead; those records
//! are rewritten into the canonical shape before they are deserialized, so
//! nothing past the reader ever sees the legacy field.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use super::document::Document;
use super::ids::{BudgetId, CategoryId};
use super::period::{format_period_id, BudgetCycle};
use super::record::{timestamp_now, Collection, Record};

/// A spending limit for one expense category over one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: BudgetId,

    pub category_id: CategoryId,

    /// Cycle start date, `YYYY-MM-DD`
    pub period_id: String,

    /// Cycle start day captured when the budget was created
    pub period_start_day: u8,

    pub amount: f64,

    /// Unspent money carries into the next cycle
    #[serde(default)]
    pub rollover: bool,

    #[serde(default = "timestamp_now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "timestamp_now")]
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    /// Create a budget for the cycle containing `date`
    pub fn for_date(category_id: CategoryId, date: NaiveDate, start_day: u8, amount: f64) -> Self {
        let now = Utc::now();
        Self {
            id: BudgetId::new(),
            category_id,
            period_id: BudgetCycle::containing(date, start_day).period_id(),
            period_start_day: start_day,
            amount,
            rollover: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn cycle(&self) -> Option<BudgetCycle> {
        BudgetCycle::from_period_id(&self.period_id)
    }

    /// Inclusive date range covered by this budget
    pub fn period_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        self.cycle().map(|c| (c.start_date(), c.end_date()))
    }
}

impl Record for Budget {
    const COLLECTION: Collection = Collection::Budgets;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn validate(&self) -> Result<(), String> {
        if self.category_id.as_str().is_empty() {
            return Err("Budget requires a category".into());
        }
        if self.cycle().is_none() {
            return Err(format!("Invalid period id '{}'", self.period_id));
        }
        if !(1..=28).contains(&self.period_start_day) {
            return Err(format!(
                "Period start day must be between 1 and 28 (got {})",
                self.period_start_day
            ));
        }
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(format!("Budget amount must not be negative (got {})", self.amount));
        }
        Ok(())
    }

    fn items(doc: &Document) -> &Vec<Self> {
        &doc.budgets
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.budgets
    }
}

/// Outcome of upgrading one stored budget object
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetUpgrade {
    /// Already canonical
    Unchanged,
    /// Rewritten from the legacy shape
    Upgraded,
    /// Neither `periodId` nor `month`; cannot be kept
    Unusable,
}

fn stored_start_day(obj: &serde_json::Map<String, Value>) -> Option<u8> {
    obj.get("periodStartDay")
        .and_then(Value::as_u64)
        .filter(|d| (1..=28).contains(d))
        .and_then(|d| u8::try_from(d).ok())
}

/// Rewrite one stored budget object into the canonical shape
///
/// A legacy `month` becomes `periodId = YYYY-MM-<day>` where the day is the
/// record's own `periodStartDay` or `fallback_day`.
pub fn upgrade_budget_value(value: &mut Value, fallback_day: u8) -> BudgetUpgrade {
    let Some(obj) = value.as_object_mut() else {
        return BudgetUpgrade::Unusable;
    };

    let has_period_id = obj
        .get("periodId")
        .and_then(Value::as_str)
        .is_some_and(|p| !p.is_empty());

    if has_period_id {
        let mut changed = obj.remove("month").is_some();
        if stored_start_day(obj).is_none() {
            let day = obj
                .get("periodId")
                .and_then(Value::as_str)
                .and_then(BudgetCycle::from_period_id)
                .map(|c| chrono::Datelike::day(&c.start_date()))
                .and_then(|d| u8::try_from(d).ok())
                .filter(|d| (1..=28).contains(d))
                .unwrap_or(fallback_day);
            obj.insert("periodStartDay".into(), Value::from(day));
            changed = true;
        }
        return if changed {
            BudgetUpgrade::Upgraded
        } else {
            BudgetUpgrade::Unchanged
        };
    }

    let month = obj
        .get("month")
        .and_then(Value::as_str)
        .and_then(|m| {
            let (year, month) = m.trim().split_once('-')?;
            Some((year.parse::<i32>().ok()?, month.parse::<u32>().ok()?))
        })
        .filter(|(_, m)| (1..=12).contains(m));

    match month {
        Some((year, month)) => {
            let day = stored_start_day(obj).unwrap_or(fallback_day);
            obj.insert(
                "periodId".into(),
                Value::from(format_period_id(year, month, day)),
            );
            obj.insert("periodStartDay".into(), Value::from(day));
            obj.remove("month");
            BudgetUpgrade::Upgraded
        }
        None => BudgetUpgrade::Unusable,
    }
}

/// Upgrade a stored budget array in place, dropping unusable entries
///
/// Returns how many budgets were rewritten.
pub fn upgrade_budgets(budgets: &mut Vec<Value>, fallback_day: u8) -> usize {
    let mut upgraded = 0;
    budgets.retain_mut(|budget| match upgrade_budget_value(budget, fallback_day) {
        BudgetUpgrade::Unchanged => true,
        BudgetUpgrade::Upgraded => {
            upgraded += 1;
            true
        }
        BudgetUpgrade::Unusable => {
            let budget_id = budget.get("id").and_then(|id| id.as_str()).unwrap_or("?");
            warn!(
                budget_id,
                "dropping budget with neither periodId nor month"
            );
            false
        }
    });
    upgraded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_month_upgrade() {
        let mut value = json!({"id": "b1", "categoryId": "cat1", "month": "2024-03", "amount": 200});
        assert_eq!(upgrade_budget_value(&mut value, 5), BudgetUpgrade::Upgraded);
        assert_eq!(value["periodId"], "2024-03-05");
        assert_eq!(value["periodStartDay"], 5);
        assert!(value.get("month").is_none());

        let budget: Budget = serde_json::from_value(value).unwrap();
        assert_eq!(budget.period_start_day, 5);
    }

    #[test]
    fn test_legacy_upgrade_prefers_stored_start_day() {
        let mut value = json!({"month": "2024-11", "periodStartDay": 15});
        upgrade_budget_value(&mut value, 1);
        assert_eq!(value["periodId"], "2024-11-15");
    }

    #[test]
    fn test_canonical_budget_unchanged() {
        let mut value = json!({"periodId": "2024-03-01", "periodStartDay": 1});
        assert_eq!(upgrade_budget_value(&mut value, 10), BudgetUpgrade::Unchanged);
        assert_eq!(value["periodId"], "2024-03-01");
    }

    #[test]
    fn test_both_fields_keeps_period_id() {
        let mut value = json!({"periodId": "2024-03-10", "periodStartDay": 10, "month": "2024-03"});
        assert_eq!(upgrade_budget_value(&mut value, 1), BudgetUpgrade::Upgraded);
        assert_eq!(value["periodId"], "2024-03-10");
        assert!(value.get("month").is_none());
    }

    #[test]
    fn test_unusable_budgets_dropped() {
        let mut budgets = vec![
            json!({"id": "keep", "periodId": "2024-01-01", "periodStartDay": 1}),
            json!({"id": "legacy", "month": "2024-02"}),
            json!({"id": "broken", "amount": 10}),
        ];
        assert_eq!(upgrade_budgets(&mut budgets, 1), 1);
        assert_eq!(budgets.len(), 2);
        assert!(budgets.iter().all(|b| b["id"] != "broken"));
    }

    #[test]
    fn test_period_range() {
        let budget = Budget::for_date(
            CategoryId::from("cat1"),
            NaiveDate::from_ymd_opt(2024, 6, 20).unwrap(),
            15,
            300.0,
        );
        assert_eq!(budget.period_id, "2024-06-15");
        let (start, end) = budget.period_range().unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 7, 14).unwrap());
        assert!(budget.validate().is_ok());
    }
}
