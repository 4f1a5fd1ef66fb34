//! Export formats for In & Out
//!
//! - CSV: transactions only, spreadsheet-compatible, importable
//! - JSON: every user collection plus metadata, used for backup and restore

pub mod csv;
pub mod json;

pub use csv::{
    parse_transactions_csv, transactions_to_csv, write_transactions_csv, ParsedCsv, SkippedRow,
    CSV_HEADER,
};
pub use json::{
    parse_backup, validate_backup, BackupDocument, BackupMetadata, BACKUP_FORMAT_VERSION,
};
