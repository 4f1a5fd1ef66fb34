//! CSV export and import of transactions
//!
//! Export writes one header row and one row per transaction. Note and Tags
//! are always quoted; the other columns are quoted only when they need it.
//! Import is best-effort: rows that cannot become a valid transaction are
//! reported and skipped.

use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use tracing::warn;

use crate::error::{InoutError, InoutResult};
use crate::models::{
    normalize_tags, parse_timestamp, AccountId, CategoryId, Record, Transaction, TransactionId,
    TransactionType,
};

/// Header row of the transaction CSV format
pub const CSV_HEADER: &str = "ID,Date,Type,Amount,Currency,Category,Account,AccountTo,Note,Tags";

/// Rows with fewer fields than this are ignored
const MIN_FIELDS: usize = 4;

/// Escape a string for CSV format
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        quote(s)
    } else {
        s.to_string()
    }
}

/// Quote unconditionally, doubling inner quotes
fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Write transactions as CSV
pub fn write_transactions_csv<W: Write>(
    transactions: &[Transaction],
    writer: &mut W,
) -> InoutResult<()> {
    writeln!(writer, "{}", CSV_HEADER).map_err(|e| InoutError::Export(e.to_string()))?;

    for txn in transactions {
        writeln!(
            writer,
            "{},{},{},{},{},{},{},{},{},{}",
            escape_csv(txn.id.as_str()),
            txn.date.format("%Y-%m-%d"),
            txn.kind,
            txn.amount,
            escape_csv(&txn.currency_code),
            escape_csv(txn.category_id.as_ref().map_or("", |c| c.as_str())),
            escape_csv(txn.account_id.as_str()),
            escape_csv(txn.account_id_to.as_ref().map_or("", |a| a.as_str())),
            quote(txn.note.as_deref().unwrap_or("")),
            quote(&txn.tags.join(",")),
        )
        .map_err(|e| InoutError::Export(e.to_string()))?;
    }

    Ok(())
}

/// Render transactions as a CSV string
pub fn transactions_to_csv(transactions: &[Transaction]) -> InoutResult<String> {
    let mut buf = Vec::new();
    write_transactions_csv(transactions, &mut buf)?;
    String::from_utf8(buf).map_err(|e| InoutError::Export(e.to_string()))
}

/// A CSV row that did not become a transaction
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    /// 1-based data row number (the header is row 0)
    pub row: usize,
    pub reason: String,
}

/// Result of parsing a transaction CSV
#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub transactions: Vec<Transaction>,
    pub skipped: Vec<SkippedRow>,
}

fn field(record: &StringRecord, index: usize) -> Option<&str> {
    record.get(index).map(str::trim).filter(|s| !s.is_empty())
}

/// Build one transaction from a data row
fn parse_row(record: &StringRecord, row: usize, now: DateTime<Utc>) -> Result<Transaction, String> {
    if record.len() < MIN_FIELDS {
        return Err(format!(
            "expected at least {} fields, found {}",
            MIN_FIELDS,
            record.len()
        ));
    }

    let id = field(record, 0)
        .map(TransactionId::from)
        .unwrap_or_else(|| {
            TransactionId::from(format!("imported_{}_{}", now.timestamp_millis(), row))
        });

    let date = match field(record, 1) {
        Some(raw) => parse_timestamp(raw).ok_or_else(|| format!("invalid date '{}'", raw))?,
        None => now,
    };

    let kind = match field(record, 2) {
        Some(raw) => TransactionType::parse(raw).ok_or_else(|| format!("invalid type '{}'", raw))?,
        None => TransactionType::Expense,
    };

    let amount = match field(record, 3) {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| format!("invalid amount '{}'", raw))?,
        None => 0.0,
    };

    let tags = field(record, 9)
        .map(|raw| normalize_tags(raw.split(',')))
        .unwrap_or_default();

    let mut txn = Transaction {
        id,
        kind,
        account_id: AccountId::from(field(record, 6).unwrap_or("")),
        account_id_to: field(record, 7).map(AccountId::from),
        category_id: field(record, 5).map(CategoryId::from),
        amount,
        currency_code: field(record, 4).unwrap_or("USD").to_string(),
        date,
        note: record
            .get(8)
            .filter(|n| !n.trim().is_empty())
            .map(str::to_string),
        tags,
        attachment_ids: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    txn.normalize();
    txn.check().map_err(|e| e.to_string())?;
    Ok(txn)
}

/// Parse transaction rows from CSV, skipping the header
///
/// Quoted fields may contain commas, doubled quotes and line breaks.
pub fn parse_transactions_csv<R: Read>(reader: R, now: DateTime<Utc>) -> ParsedCsv {
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut parsed = ParsedCsv::default();

    for (index, result) in csv_reader.records().enumerate() {
        let row = index + 1;
        let outcome = result
            .map_err(|e| e.to_string())
            .and_then(|record| parse_row(&record, row, now));

        match outcome {
            Ok(txn) => parsed.transactions.push(txn),
            Err(reason) => {
                warn!(row, %reason, "skipping CSV row");
                parsed.skipped.push(SkippedRow { row, reason });
            }
        }
    }

    parsed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(note: Option<&str>, tags: &[&str]) -> Transaction {
        let mut txn = Transaction::new(
            TransactionType::Expense,
            AccountId::from("acc1"),
            Some(CategoryId::from("cat1")),
            42.5,
            Utc.with_ymd_and_hms(2024, 6, 1, 15, 30, 0).unwrap(),
        );
        txn.id = TransactionId::from("t1");
        txn.note = note.map(str::to_string);
        txn.tags = tags.iter().map(|t| t.to_string()).collect();
        txn
    }

    #[test]
    fn test_export_format() {
        let csv = transactions_to_csv(&[sample(Some("lunch"), &["food", "work"])]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(
            lines[1],
            r#"t1,2024-06-01,expense,42.5,USD,cat1,acc1,,"lunch","food,work""#
        );
    }

    #[test]
    fn test_empty_note_and_tags_still_quoted() {
        let csv = transactions_to_csv(&[sample(None, &[])]).unwrap();
        assert!(csv.lines().nth(1).unwrap().ends_with(r#","""#));
        assert!(csv.lines().nth(1).unwrap().ends_with(r#",acc1,,"","""#));
    }

    #[test]
    fn test_quotes_in_note_round_trip() {
        let note = r#"He said "hi", thanks"#;
        let csv = transactions_to_csv(&[sample(Some(note), &[])]).unwrap();
        assert!(csv.contains(r#""He said ""hi"", thanks""#));

        let parsed = parse_transactions_csv(csv.as_bytes(), Utc::now());
        assert_eq!(parsed.transactions.len(), 1);
        assert_eq!(parsed.transactions[0].note.as_deref(), Some(note));
    }

    #[test]
    fn test_round_trip_keeps_type_amount_account() {
        let mut income = sample(None, &["bonus"]);
        income.kind = TransactionType::Income;
        income.amount = 1234.5678;
        let transfer = Transaction::transfer(
            AccountId::from("acc1"),
            AccountId::from("acc2"),
            100.0,
            Utc::now(),
        );
        let originals = vec![sample(Some("a,b"), &["x", "y"]), income, transfer];

        let csv = transactions_to_csv(&originals).unwrap();
        let parsed = parse_transactions_csv(csv.as_bytes(), Utc::now());

        assert!(parsed.skipped.is_empty());
        let tuples = |txns: &[Transaction]| -> Vec<(TransactionType, f64, String)> {
            txns.iter()
                .map(|t| (t.kind, t.amount, t.account_id.to_string()))
                .collect()
        };
        assert_eq!(tuples(&parsed.transactions), tuples(&originals));
        assert_eq!(parsed.transactions[0].tags, vec!["x", "y"]);
    }

    #[test]
    fn test_defaults_for_missing_fields() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let csv = format!("{}\n,,,12,,cat1,acc1\n", CSV_HEADER);
        let parsed = parse_transactions_csv(csv.as_bytes(), now);

        let txn = &parsed.transactions[0];
        assert_eq!(txn.id.as_str(), format!("imported_{}_1", now.timestamp_millis()));
        assert_eq!(txn.kind, TransactionType::Expense);
        assert_eq!(txn.currency_code, "USD");
        assert_eq!(txn.date, now);
        assert!(txn.tags.is_empty());
    }

    #[test]
    fn test_bad_rows_skipped() {
        let csv = format!(
            "{}\nshort,row\nt2,2024-06-01,expense,abc,USD,cat1,acc1,,\"\",\"\"\nt3,2024-06-01,income,5,USD,cat2,acc1,,\"\",\"\"\n\nt4,2024-06-01,expense,-1,USD,cat1,acc1,,\"\",\"\"\n",
            CSV_HEADER
        );
        let parsed = parse_transactions_csv(csv.as_bytes(), Utc::now());
        assert_eq!(parsed.transactions.len(), 1);
        assert_eq!(parsed.transactions[0].id.as_str(), "t3");
        assert_eq!(parsed.skipped.len(), 3);
    }
}
