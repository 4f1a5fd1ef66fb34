//! Budget cycles and timestamp parsing
//!
//! A budget cycle starts on a configurable day of the month (1-28) and runs
//! until the day before the same day of the following month. Cycles are
//! identified by their start date, `YYYY-MM-DD`.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Parse the timestamp shapes found in stored documents and CSV files
///
/// Accepts RFC 3339 (`2024-06-01T00:00:00Z`), a naive date-time
/// (`2024-06-01T08:30:00`, taken as UTC) and a bare date (`2024-06-01`,
/// taken as midnight UTC).
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serde helper accepting any shape `parse_timestamp` understands
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid date '{}'", raw)))
}

/// Format a canonical period id
pub fn format_period_id(year: i32, month: u32, day: u8) -> String {
    format!("{:04}-{:02}-{:02}", year, month, day)
}

/// One budget cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BudgetCycle {
    start: NaiveDate,
}

impl BudgetCycle {
    /// Parse a `YYYY-MM-DD` period id
    pub fn from_period_id(period_id: &str) -> Option<Self> {
        NaiveDate::parse_from_str(period_id.trim(), "%Y-%m-%d")
            .ok()
            .map(|start| Self { start })
    }

    /// The cycle containing `date` for cycles starting on `start_day`
    pub fn containing(date: NaiveDate, start_day: u8) -> Self {
        let day = u32::from(start_day.clamp(1, 28));
        let this_month = date.with_day(day).unwrap_or(date);
        let start = if date.day() >= day {
            this_month
        } else {
            this_month
                .checked_sub_months(Months::new(1))
                .unwrap_or(this_month)
        };
        Self { start }
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start
    }

    /// Last day of the cycle (inclusive)
    pub fn end_date(&self) -> NaiveDate {
        self.start
            .checked_add_months(Months::new(1))
            .and_then(|next| next.checked_sub_days(Days::new(1)))
            .unwrap_or(self.start)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end_date()
    }

    pub fn next(&self) -> Self {
        Self {
            start: self
                .start
                .checked_add_months(Months::new(1))
                .unwrap_or(self.start),
        }
    }

    pub fn period_id(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for BudgetCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%b %d, %Y"),
            self.end_date().format("%b %d, %Y")
        )
    }
}
