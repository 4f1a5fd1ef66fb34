//! Service layer for In & Out
//!
//! The service layer offers typed operations on top of the query layer.

pub mod ledger;

pub use ledger::Ledger;
