//! JSON backup format
//!
//! A backup carries the four user collections plus a metadata block. The
//! reader checks the shape before decoding anything, so a malformed file is
//! rejected as a whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{InoutError, InoutResult};
use crate::models::{upgrade_budgets, Account, Budget, Category, Document, Transaction};

/// Version written into backup metadata
pub const BACKUP_FORMAT_VERSION: &str = "1.0.0";

/// Backup metadata block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupMetadata {
    #[serde(default)]
    pub export_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub total_records: usize,

    /// Set on backups, absent on plain exports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_date: Option<DateTime<Utc>>,
}

/// Full-fidelity backup of the user collections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupDocument {
    pub accounts: Vec<Account>,
    pub categories: Vec<Category>,
    pub transactions: Vec<Transaction>,
    pub budgets: Vec<Budget>,
    pub metadata: BackupMetadata,
}

impl BackupDocument {
    /// Snapshot a document for export
    pub fn from_document(doc: &Document, now: DateTime<Utc>) -> Self {
        Self {
            accounts: doc.accounts.clone(),
            categories: doc.categories.clone(),
            transactions: doc.transactions.clone(),
            budgets: doc.budgets.clone(),
            metadata: BackupMetadata {
                export_date: Some(now),
                version: Some(BACKUP_FORMAT_VERSION.to_string()),
                total_records: doc.record_count(),
                backup_date: None,
            },
        }
    }

    /// Snapshot a document as a backup (metadata carries `backupDate`)
    pub fn backup_of(doc: &Document, now: DateTime<Utc>) -> Self {
        let mut backup = Self::from_document(doc, now);
        backup.metadata.backup_date = Some(now);
        backup
    }

    pub fn record_count(&self) -> usize {
        self.accounts.len() + self.categories.len() + self.transactions.len() + self.budgets.len()
    }

    pub fn to_json_pretty(&self) -> InoutResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| InoutError::Export(format!("Failed to serialize backup: {}", e)))
    }
}

/// Check the top-level shape of a backup
///
/// The four collections must be arrays and `metadata` an object. The error
/// names every part that is missing or of the wrong type.
pub fn validate_backup(value: &Value) -> InoutResult<()> {
    let Some(obj) = value.as_object() else {
        return Err(InoutError::Validation(
            "backup is not a JSON object".into(),
        ));
    };

    let mut problems = Vec::new();
    for key in ["accounts", "categories", "transactions", "budgets"] {
        match obj.get(key) {
            Some(Value::Array(_)) => {}
            Some(_) => problems.push(format!("'{}' is not an array", key)),
            None => problems.push(format!("'{}' is missing", key)),
        }
    }
    match obj.get("metadata") {
        Some(Value::Object(_)) => {}
        Some(_) => problems.push("'metadata' is not an object".to_string()),
        None => problems.push("'metadata' is missing".to_string()),
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(InoutError::Validation(format!(
            "invalid backup: {}",
            problems.join(", ")
        )))
    }
}

/// Validate and decode backup text
///
/// Legacy budgets are upgraded using `period_start_day`. Records that do not
/// decode make the whole backup invalid.
pub fn parse_backup(text: &str, period_start_day: u8) -> InoutResult<BackupDocument> {
    let mut value: Value = serde_json::from_str(text)
        .map_err(|e| InoutError::Validation(format!("backup is not valid JSON: {}", e)))?;

    validate_backup(&value)?;

    if let Some(Value::Array(budgets)) = value.get_mut("budgets") {
        upgrade_budgets(budgets, period_start_day);
    }

    serde_json::from_value(value)
        .map_err(|e| InoutError::Validation(format!("invalid backup record: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_backup_shape() {
        let doc = Document::with_defaults("USD");
        let backup = BackupDocument::backup_of(&doc, Utc::now());
        let value: Value = serde_json::from_str(&backup.to_json_pretty().unwrap()).unwrap();

        assert!(validate_backup(&value).is_ok());
        assert_eq!(value["metadata"]["totalRecords"], 21);
        assert_eq!(value["metadata"]["version"], "1.0.0");
        assert!(value["metadata"]["backupDate"].is_string());
        assert!(value.get("attachments").is_none());
    }

    #[test]
    fn test_missing_budgets_rejected() {
        let value = json!({"accounts": [], "categories": [], "transactions": [], "metadata": {}});
        let err = validate_backup(&value).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("'budgets' is missing"));
    }

    #[test]
    fn test_every_problem_reported() {
        let value = json!({"accounts": {}, "categories": [], "transactions": []});
        let message = validate_backup(&value).unwrap_err().to_string();
        assert!(message.contains("'accounts' is not an array"));
        assert!(message.contains("'budgets' is missing"));
        assert!(message.contains("'metadata' is missing"));
    }

    #[test]
    fn test_parse_upgrades_legacy_budgets() {
        let text = json!({
            "accounts": [], "categories": [], "transactions": [],
            "budgets": [{"id": "b1", "categoryId": "c1", "month": "2023-12", "amount": 40}],
            "metadata": {"exportDate": "2024-01-01T00:00:00Z", "version": "1.0.0", "totalRecords": 1}
        })
        .to_string();
        let backup = parse_backup(&text, 20).unwrap();
        assert_eq!(backup.budgets[0].period_id, "2023-12-20");
    }

    #[test]
    fn test_bad_record_rejects_backup() {
        let text = json!({
            "accounts": [{"id": "a1"}], "categories": [], "transactions": [], "budgets": [],
            "metadata": {}
        })
        .to_string();
        assert!(parse_backup(&text, 1).unwrap_err().is_validation());
    }
}
