//! Account model
//!
//! Represents where money lives (cash, bank, wallet, card). The opening
//! balance is a fixed reference point; the running balance is derived by
//! replaying transactions (see `reports::balances`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::document::Document;
use super::ids::AccountId;
use super::record::{timestamp_now, Collection, Record};

/// Type of financial account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Cash,
    #[default]
    Bank,
    Wallet,
    Card,
    Other,
}

impl AccountType {
    /// Parse account type from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "cash" => Some(Self::Cash),
            "bank" => Some(Self::Bank),
            "wallet" => Some(Self::Wallet),
            "card" => Some(Self::Card),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Human label used for starter accounts
    pub fn label(&self) -> &'static str {
        match self {
            Self::Bank => "Bank Account",
            Self::Cash => "Cash",
            Self::Card => "Credit/Debit Card",
            Self::Wallet => "Digital Wallet",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A financial account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,

    pub name: String,

    #[serde(rename = "type")]
    pub account_type: AccountType,

    /// Balance when the account was opened
    #[serde(default)]
    pub opening_balance: f64,

    /// ISO 4217 code
    pub currency_code: String,

    #[serde(default)]
    pub is_archived: bool,

    #[serde(default = "timestamp_now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "timestamp_now")]
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with a zero opening balance
    pub fn new(
        name: impl Into<String>,
        account_type: AccountType,
        currency_code: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: AccountId::new(),
            name: name.into(),
            account_type,
            opening_balance: 0.0,
            currency_code: currency_code.into(),
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Record for Account {
    const COLLECTION: Collection = Collection::Accounts;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Account name cannot be empty".into());
        }
        if self.name.len() > 50 {
            return Err(format!("Account name too long ({} chars, max 50)", self.name.len()));
        }
        if !self.opening_balance.is_finite() {
            return Err("Opening balance must be a finite number".into());
        }
        Ok(())
    }

    fn items(doc: &Document) -> &Vec<Self> {
        &doc.accounts
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.accounts
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.account_type)
    }
}
