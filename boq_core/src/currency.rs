//! # Currency Display
//!
//! Formatting only; nothing here feeds back into a calculation.
//!
//! Rupee amounts use Indian digit grouping (last three digits, then pairs):
//! `12,34,567`. Other currencies use western grouping in threes and are
//! prefixed with their ISO code.
//!
//! ```rust
//! use boq_core::currency::{format_currency, format_report_amount};
//!
//! assert_eq!(format_currency(1234567.4, "INR"), "₹12,34,567");
//! assert_eq!(format_currency(1234567.4, "USD"), "USD 1,234,567");
//! assert_eq!(format_report_amount(1500.0, "INR"), "Rs. 1,500.00");
//! ```

/// Screen format: whole units with symbol, e.g. `₹12,34,567`
pub fn format_currency(value: f64, currency: &str) -> String {
    let (sign, digits) = split_rounded(value, 0);
    let code = currency.trim().to_ascii_uppercase();
    if code == "INR" {
        format!("{sign}₹{}", group_indian(&digits))
    } else {
        format!("{sign}{code} {}", group_western(&digits))
    }
}

/// Printed-report format: two decimals, `Rs.` in place of `₹` (the report
/// fonts are not guaranteed to carry the rupee sign).
pub fn format_report_amount(value: f64, currency: &str) -> String {
    let (sign, text) = split_rounded(value, 2);
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    let code = currency.trim().to_ascii_uppercase();
    if code == "INR" {
        format!("{sign}Rs. {}.{frac}", group_indian(whole))
    } else {
        format!("{sign}{code} {}.{frac}", group_western(whole))
    }
}

/// Quantity with two decimals and western grouping, e.g. `16,353.00`
pub fn format_quantity(value: f64) -> String {
    let (sign, text) = split_rounded(value, 2);
    let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));
    format!("{sign}{}.{frac}", group_western(whole))
}

/// Round to `decimals` places and split off the sign. Negative zero and
/// non-finite values print as zero.
fn split_rounded(value: f64, decimals: usize) -> (&'static str, String) {
    let value = if value.is_finite() { value } else { 0.0 };
    let text = format!("{:.*}", decimals, value.abs());
    let is_zero = text.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    (sign, text)
}

fn group_western(digits: &str) -> String {
    group(digits, 3, 3)
}

fn group_indian(digits: &str) -> String {
    group(digits, 3, 2)
}

/// Insert commas: the rightmost group has `first` digits, the rest `rest`.
fn group(digits: &str, first: usize, rest: usize) -> String {
    if digits.len() <= first {
        return digits.to_string();
    }
    let (head, tail) = digits.split_at(digits.len() - first);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(rest);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    groups.push(tail);
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indian_grouping() {
        assert_eq!(group_indian("1"), "1");
        assert_eq!(group_indian("999"), "999");
        assert_eq!(group_indian("1000"), "1,000");
        assert_eq!(group_indian("100000"), "1,00,000");
        assert_eq!(group_indian("12345678"), "1,23,45,678");
    }

    #[test]
    fn test_western_grouping() {
        assert_eq!(group_western("1000"), "1,000");
        assert_eq!(group_western("1234567"), "1,234,567");
        assert_eq!(group_western("123456"), "123,456");
    }

    #[test]
    fn test_screen_format() {
        assert_eq!(format_currency(0.0, "INR"), "₹0");
        assert_eq!(format_currency(850.0, "inr"), "₹850");
        assert_eq!(format_currency(163530.0, "INR"), "₹1,63,530");
        assert_eq!(format_currency(-2500.6, "INR"), "-₹2,501");
        assert_eq!(format_currency(2500.0, "EUR"), "EUR 2,500");
    }

    #[test]
    fn test_report_format() {
        assert_eq!(format_report_amount(1234567.891, "INR"), "Rs. 12,34,567.89");
        assert_eq!(format_report_amount(72.0, "USD"), "USD 72.00");
        assert_eq!(format_report_amount(-0.001, "INR"), "Rs. 0.00");
    }

    #[test]
    fn test_quantity_format() {
        assert_eq!(format_quantity(16353.0), "16,353.00");
        assert_eq!(format_quantity(2.5), "2.50");
        assert_eq!(format_quantity(f64::NAN), "0.00");
    }
}
