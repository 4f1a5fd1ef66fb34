//! In & Out - local-first personal finance ledger
//!
//! This library provides the data layer behind the `inout` command: a single
//! JSON document of accounts, categories, transactions, budgets and
//! attachments, persisted in a key-value store and reached through a
//! REST-style query layer.
//!
//! # Architecture
//!
//! The crate is organized into the following modules:
//!
//! - `config`: Configuration and path management
//! - `error`: Custom error types
//! - `models`: Core data models and the ledger document
//! - `storage`: Key-value slots and the cached document store
//! - `query`: REST-style requests over the document
//! - `services`: Typed access on top of the query layer
//! - `export`: CSV and JSON formats
//! - `backup`: Export, import, restore and scheduled backups
//! - `transport`: Share outbox and cloud drive destinations
//! - `reports`: Summaries, breakdowns, balances and budget usage
//! - `cli`: Command handlers
//!
//! # Example
//!
//! ```rust,ignore
//! use inout::config::{InoutPaths, Settings};
//! use inout::storage::Storage;
//!
//! let paths = InoutPaths::new()?;
//! let settings = Settings::load_or_create(&paths)?;
//! let storage = Storage::open(paths, &settings)?;
//! let doc = storage.documents().load().await;
//! ```

pub mod backup;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod models;
pub mod query;
pub mod reports;
pub mod services;
pub mod storage;
pub mod transport;

pub use error::{InoutError, InoutResult};
