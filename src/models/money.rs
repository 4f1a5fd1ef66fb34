//! Amount formatting helpers
//!
//! Amounts are stored as `f64` with full precision. Rounding to two decimal
//! places happens only when a value is displayed.

/// Format an amount for display with two decimals
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Format an amount with its currency code, e.g. `-12.50 USD`
pub fn format_with_currency(amount: f64, currency_code: &str) -> String {
    format!("{} {}", format_amount(amount), currency_code)
}

/// `part` as a percentage of `whole`; 0 when `whole` is 0
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole == 0.0 {
        0.0
    } else {
        part / whole * 100.0
    }
}
