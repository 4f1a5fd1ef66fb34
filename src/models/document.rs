//! The persisted document holding every collection
//!
//! The whole ledger is one JSON object. Collections the data layer knows
//! about are typed; any other top-level keys are carried through untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::account::{Account, AccountType};
use super::attachment::Attachment;
use super::budget::{upgrade_budgets, Budget};
use super::category::{default_categories, Category};
use super::record::Collection;
use super::transaction::Transaction;
use crate::error::{InoutError, InoutResult};

/// Format version written into new documents
pub const DOCUMENT_VERSION: &str = "1.0.0";

fn default_version() -> String {
    DOCUMENT_VERSION.to_string()
}

/// All application data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub accounts: Vec<Account>,

    #[serde(default)]
    pub categories: Vec<Category>,

    #[serde(default)]
    pub transactions: Vec<Transaction>,

    #[serde(default)]
    pub budgets: Vec<Budget>,

    #[serde(default)]
    pub attachments: Vec<Attachment>,

    #[serde(default = "default_version")]
    pub version: String,

    /// Keys this crate does not model
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    /// A document with no records at all
    pub fn empty() -> Self {
        Self {
            accounts: Vec::new(),
            categories: Vec::new(),
            transactions: Vec::new(),
            budgets: Vec::new(),
            attachments: Vec::new(),
            version: default_version(),
            extra: Map::new(),
        }
    }

    /// The first-run document: starter accounts and categories
    pub fn with_defaults(currency_code: &str) -> Self {
        let accounts = [
            AccountType::Bank,
            AccountType::Cash,
            AccountType::Card,
            AccountType::Wallet,
            AccountType::Other,
        ]
        .into_iter()
        .map(|kind| Account::new(kind.label(), kind, currency_code))
        .collect();

        let mut extra = Map::new();
        extra.insert("recurringRules".into(), Value::Array(Vec::new()));
        extra.insert("transactionTemplates".into(), Value::Array(Vec::new()));

        Self {
            accounts,
            categories: default_categories(),
            extra,
            ..Self::empty()
        }
    }

    /// Read a stored document, upgrading legacy budgets on the way in
    ///
    /// Returns the document and how many budgets were rewritten.
    pub fn from_value(mut value: Value, period_start_day: u8) -> InoutResult<(Self, usize)> {
        let obj = value
            .as_object_mut()
            .ok_or_else(|| InoutError::Validation("document is not a JSON object".into()))?;

        let upgraded = match obj.get_mut("budgets") {
            Some(Value::Array(budgets)) => upgrade_budgets(budgets, period_start_day),
            _ => 0,
        };

        let doc = serde_json::from_value(value)?;
        Ok((doc, upgraded))
    }

    /// Parse stored JSON text
    pub fn parse(text: &str, period_start_day: u8) -> InoutResult<(Self, usize)> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value, period_start_day)
    }

    /// Serialize for persistence
    pub fn to_json(&self) -> InoutResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn count(&self, collection: Collection) -> usize {
        match collection {
            Collection::Accounts => self.accounts.len(),
            Collection::Categories => self.categories.len(),
            Collection::Transactions => self.transactions.len(),
            Collection::Budgets => self.budgets.len(),
            Collection::Attachments => self.attachments.len(),
        }
    }

    /// Records across the four backed-up collections
    pub fn record_count(&self) -> usize {
        self.accounts.len() + self.categories.len() + self.transactions.len() + self.budgets.len()
    }

    /// Whether there is anything worth exporting
    pub fn has_data(&self) -> bool {
        self.record_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CategoryKind;

    #[test]
    fn test_default_document() {
        let doc = Document::with_defaults("EUR");
        assert_eq!(doc.accounts.len(), 5);
        assert_eq!(doc.accounts[0].name, "Bank Account");
        assert!(doc.accounts.iter().all(|a| a.currency_code == "EUR"));
        assert_eq!(doc.categories.len(), 16);
        assert_eq!(
            doc.categories
                .iter()
                .filter(|c| c.kind == CategoryKind::Expense)
                .count(),
            10
        );
        assert!(doc.transactions.is_empty());
        assert_eq!(doc.version, DOCUMENT_VERSION);
    }

    #[test]
    fn test_unknown_keys_survive() {
        let text = r#"{"accounts":[],"categories":[],"transactions":[],"budgets":[],
            "recurringRules":[{"id":"r1"}],"version":"1.0.0"}"#;
        let (doc, _) = Document::parse(text, 1).unwrap();
        assert_eq!(doc.extra["recurringRules"][0]["id"], "r1");

        let out: Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(out["recurringRules"][0]["id"], "r1");
        assert_eq!(out["attachments"], Value::Array(Vec::new()));
    }

    #[test]
    fn test_parse_upgrades_legacy_budgets() {
        let text = r#"{"budgets":[{"id":"b1","categoryId":"cat1","month":"2024-05","amount":50}]}"#;
        let (doc, upgraded) = Document::parse(text, 10).unwrap();
        assert_eq!(upgraded, 1);
        assert_eq!(doc.budgets[0].period_id, "2024-05-10");
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(Document::parse("[1,2,3]", 1).is_err());
    }

    #[test]
    fn test_has_data() {
        assert!(!Document::empty().has_data());
        assert!(Document::with_defaults("USD").has_data());
    }
}
