//! Transaction model
//!
//! A transaction moves money into (income), out of (expense) or between
//! (transfer) accounts. Transfers name a destination account and never a
//! category; income and expense name a category and never a destination.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::document::Document;
use super::ids::{AccountId, AttachmentId, CategoryId, TransactionId};
use super::period::deserialize_timestamp;
use super::record::{timestamp_now, Collection, Record};

/// Maximum note length in characters
pub const MAX_NOTE_LEN: usize = 200;

/// Maximum number of tags on one transaction
pub const MAX_TAGS: usize = 10;

/// Direction of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    #[default]
    Expense,
    Transfer,
}

impl TransactionType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "income" => Some(Self::Income),
            "expense" => Some(Self::Expense),
            "transfer" => Some(Self::Transfer),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
            Self::Transfer => "transfer",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

/// A single financial transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,

    #[serde(rename = "type")]
    pub kind: TransactionType,

    /// Source account
    pub account_id: AccountId,

    /// Destination account, transfers only
    #[serde(default)]
    pub account_id_to: Option<AccountId>,

    /// Category, income and expense only
    #[serde(default)]
    pub category_id: Option<CategoryId>,

    /// Always positive; the type gives the direction
    pub amount: f64,

    #[serde(default = "default_currency")]
    pub currency_code: String,

    #[serde(
        default = "timestamp_now",
        deserialize_with = "deserialize_timestamp"
    )]
    pub date: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub attachment_ids: Vec<AttachmentId>,

    #[serde(default = "timestamp_now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "timestamp_now")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create an income or expense transaction
    pub fn new(
        kind: TransactionType,
        account_id: AccountId,
        category_id: Option<CategoryId>,
        amount: f64,
        date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            kind,
            account_id,
            account_id_to: None,
            category_id,
            amount,
            currency_code: default_currency(),
            date,
            note: None,
            tags: Vec::new(),
            attachment_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a transfer between two accounts
    pub fn transfer(from: AccountId, to: AccountId, amount: f64, date: DateTime<Utc>) -> Self {
        let mut txn = Self::new(TransactionType::Transfer, from, None, amount, date);
        txn.account_id_to = Some(to);
        txn
    }

    pub fn is_transfer(&self) -> bool {
        self.kind == TransactionType::Transfer
    }

    /// Amount with the sign it has for the given account's balance
    pub fn signed_amount_for(&self, account: &AccountId) -> f64 {
        match self.kind {
            TransactionType::Income if &self.account_id == account => self.amount,
            TransactionType::Expense if &self.account_id == account => -self.amount,
            TransactionType::Transfer => {
                let mut delta = 0.0;
                if &self.account_id == account {
                    delta -= self.amount;
                }
                if self.account_id_to.as_ref() == Some(account) {
                    delta += self.amount;
                }
                delta
            }
            _ => 0.0,
        }
    }

    /// Check the field invariants
    pub fn check(&self) -> Result<(), TransactionValidationError> {
        if !self.amount.is_finite() || self.amount <= 0.0 {
            return Err(TransactionValidationError::NonPositiveAmount(self.amount));
        }
        if self.account_id.as_str().trim().is_empty() {
            return Err(TransactionValidationError::MissingAccount);
        }

        if self.is_transfer() {
            match &self.account_id_to {
                None => return Err(TransactionValidationError::MissingDestination),
                Some(to) if to == &self.account_id => {
                    return Err(TransactionValidationError::SameAccountTransfer)
                }
                Some(_) => {}
            }
            if self.category_id.is_some() {
                return Err(TransactionValidationError::TransferWithCategory);
            }
        } else {
            if self.category_id.is_none() {
                return Err(TransactionValidationError::MissingCategory);
            }
            if self.account_id_to.is_some() {
                return Err(TransactionValidationError::DestinationWithoutTransfer);
            }
        }

        if let Some(note) = &self.note {
            let len = note.chars().count();
            if len > MAX_NOTE_LEN {
                return Err(TransactionValidationError::NoteTooLong(len));
            }
        }
        if self.tags.len() > MAX_TAGS {
            return Err(TransactionValidationError::TooManyTags(self.tags.len()));
        }

        Ok(())
    }
}

/// Lowercase, trim and de-duplicate tags, keeping first occurrences
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

impl Record for Transaction {
    const COLLECTION: Collection = Collection::Transactions;

    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn normalize(&mut self) {
        if self.is_transfer() {
            self.category_id = None;
        } else {
            self.account_id_to = None;
        }
        if self.category_id.as_ref().is_some_and(|c| c.as_str().is_empty()) {
            self.category_id = None;
        }
        if self.account_id_to.as_ref().is_some_and(|a| a.as_str().is_empty()) {
            self.account_id_to = None;
        }
        if self.note.as_ref().is_some_and(|n| n.trim().is_empty()) {
            self.note = None;
        }
        self.tags = normalize_tags(&self.tags);
        self.currency_code = self.currency_code.trim().to_uppercase();
    }

    fn validate(&self) -> Result<(), String> {
        self.check().map_err(|e| e.to_string())
    }

    fn items(doc: &Document) -> &Vec<Self> {
        &doc.transactions
    }

    fn items_mut(doc: &mut Document) -> &mut Vec<Self> {
        &mut doc.transactions
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {:.2} {}",
            self.date.format("%Y-%m-%d"),
            self.kind,
            self.amount,
            self.currency_code
        )
    }
}

/// Validation errors for transactions
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionValidationError {
    NonPositiveAmount(f64),
    MissingAccount,
    MissingDestination,
    SameAccountTransfer,
    TransferWithCategory,
    MissingCategory,
    DestinationWithoutTransfer,
    NoteTooLong(usize),
    TooManyTags(usize),
}

impl fmt::Display for TransactionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveAmount(amount) => {
                write!(f, "Amount must be greater than zero (got {})", amount)
            }
            Self::MissingAccount => write!(f, "Transaction requires an account"),
            Self::MissingDestination => write!(f, "Transfer requires a destination account"),
            Self::SameAccountTransfer => {
                write!(f, "Transfer source and destination must differ")
            }
            Self::TransferWithCategory => write!(f, "Transfers cannot have a category"),
            Self::MissingCategory => write!(f, "Income and expense require a category"),
            Self::DestinationWithoutTransfer => {
                write!(f, "Only transfers can have a destination account")
            }
            Self::NoteTooLong(len) => write!(
                f,
                "Note too long ({} chars, max {})",
                len, MAX_NOTE_LEN
            ),
            Self::TooManyTags(count) => {
                write!(f, "Too many tags ({}, max {})", count, MAX_TAGS)
            }
        }
    }
}

impl std::error::Error for TransactionValidationError {}
