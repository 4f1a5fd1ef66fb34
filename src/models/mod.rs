//! Core data models for In & Out
//!
//! This module contains the records stored in the ledger document:
//! accounts, categories, transactions, budgets and attachments, plus the
//! document itself and the helpers shared between them.

pub mod account;
pub mod attachment;
pub mod budget;
pub mod category;
pub mod document;
pub mod ids;
pub mod money;
pub mod period;
pub mod record;
pub mod transaction;

pub use account::{Account, AccountType};
pub use attachment::Attachment;
pub use budget::{upgrade_budget_value, upgrade_budgets, Budget, BudgetUpgrade};
pub use category::{default_categories, Category, CategoryKind};
pub use document::{Document, DOCUMENT_VERSION};
pub use ids::{AccountId, AttachmentId, BudgetId, CategoryId, TransactionId};
pub use period::{parse_timestamp, BudgetCycle};
pub use record::{Collection, Record};
pub use transaction::{normalize_tags, Transaction, TransactionType, TransactionValidationError};
