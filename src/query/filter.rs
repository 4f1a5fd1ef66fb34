//! Filtering, sorting and paging of JSON records

use std::cmp::Ordering;

use serde_json::Value;

use super::request::{ListQuery, SortOrder};
use crate::models::parse_timestamp;

fn field<'a>(record: &'a Value, key: &str) -> Option<&'a Value> {
    record.get(key).filter(|v| !v.is_null())
}

fn field_str<'a>(record: &'a Value, key: &str) -> Option<&'a str> {
    field(record, key).and_then(Value::as_str)
}

fn matches_month(record: &Value, month: &str) -> bool {
    if let Some(legacy) = field_str(record, "month") {
        return legacy == month;
    }
    field_str(record, "periodId")
        .map(|period| {
            period.len() > month.len()
                && period.starts_with(month)
                && period.as_bytes()[month.len()] == b'-'
        })
        .unwrap_or(false)
}

/// Whether `record` passes every filter in `query`
pub fn matches(record: &Value, query: &ListQuery) -> bool {
    if let Some(wanted) = &query.record_type {
        if field_str(record, "type") != Some(wanted.as_str()) {
            return false;
        }
    }
    if let Some(wanted) = &query.category_id {
        if field_str(record, "categoryId") != Some(wanted.as_str()) {
            return false;
        }
    }
    if let Some(month) = &query.month {
        if !matches_month(record, month) {
            return false;
        }
    }
    if query.date_gte.is_some() || query.date_lte.is_some() {
        let Some(date) = field_str(record, "date").and_then(parse_timestamp) else {
            return false;
        };
        if query.date_gte.is_some_and(|from| date < from) {
            return false;
        }
        if query.date_lte.is_some_and(|to| date > to) {
            return false;
        }
    }
    true
}

/// Order two field values; missing and null sort first
pub fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => {
            // Timestamps with differing fractional digits do not sort as text
            match (parse_timestamp(x), parse_timestamp(y)) {
                (Some(tx), Some(ty)) if x.len() >= 10 && y.len() >= 10 => tx.cmp(&ty),
                _ => x.cmp(y),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

/// Filter, then sort, then take one page
pub fn apply(records: Vec<Value>, query: &ListQuery) -> Vec<Value> {
    let mut selected: Vec<Value> = records
        .into_iter()
        .filter(|r| matches(r, query))
        .collect();

    selected.sort_by(|a, b| {
        let ord = compare_values(field(a, &query.sort), field(b, &query.sort));
        match query.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });

    let page = query.page.max(1);
    let start = (page - 1).saturating_mul(query.limit);
    selected.into_iter().skip(start).take(query.limit).collect()
}
