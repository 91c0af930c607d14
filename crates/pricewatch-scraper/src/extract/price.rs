//! Locale-tolerant price parsing.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+]?[0-9][0-9.,\s]*").expect("valid number regex"));

static DECIMAL_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[-+]?[0-9]+(\.[0-9]*)?$").expect("valid decimal regex"));

/// Parses the first number in `text` into an exact decimal.
///
/// Separator rules:
/// - both `,` and `.` present: the rightmost one is the decimal separator,
///   the other groups thousands (`1.234,56` and `1,234.56` are both 1234.56);
/// - a single `,` and no `.`: decimal comma (`1234,56`);
/// - anything else: commas group thousands (`1,234,567`).
///
/// Whitespace inside the number is dropped, so `1 234,56` also parses.
/// Returns `None` when no digits are present or the cleaned text is not a
/// plain decimal literal (e.g. `1.2.3`).
#[must_use]
pub fn normalize_price(text: &str) -> Option<Decimal> {
    let found = NUMBER_RE.find(text)?;
    let compact: String = found
        .as_str()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let cleaned = match (compact.rfind(','), compact.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => compact.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => compact.replace(',', ""),
        (Some(_), None) if compact.matches(',').count() == 1 => compact.replace(',', "."),
        _ => compact.replace(',', ""),
    };

    if !DECIMAL_LITERAL_RE.is_match(&cleaned) {
        return None;
    }

    let literal = cleaned.trim_start_matches('+').trim_end_matches('.');
    Decimal::from_str(literal).ok()
}

/// Plausible range for a price picked up by heuristics rather than by an
/// explicit locator.
#[must_use]
pub fn is_reasonable_price(value: Decimal) -> bool {
    value > Decimal::ZERO && value < Decimal::from(10_000_000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn separator_conventions_agree() {
        for input in ["1.234,56", "1,234.56", "1234.56", "1234,56", "1 234,56"] {
            assert_eq!(normalize_price(input), Some(dec("1234.56")), "input: {input}");
        }
    }

    #[test]
    fn surrounding_text_is_ignored() {
        assert_eq!(normalize_price("Now only $19.99!"), Some(dec("19.99")));
        assert_eq!(normalize_price("EUR 1.299,00 incl. VAT"), Some(dec("1299.00")));
    }

    #[test]
    fn multiple_commas_are_thousands() {
        assert_eq!(normalize_price("1,234,567"), Some(dec("1234567")));
    }

    #[test]
    fn single_comma_is_decimal() {
        assert_eq!(normalize_price("12,5 zł"), Some(dec("12.5")));
    }

    #[test]
    fn no_break_space_groups_thousands() {
        assert_eq!(normalize_price("1\u{a0}299,90 €"), Some(dec("1299.90")));
    }

    #[test]
    fn sign_is_kept() {
        assert_eq!(normalize_price("-5.50"), Some(dec("-5.50")));
        assert_eq!(normalize_price("+5.50"), Some(dec("5.50")));
    }

    #[test]
    fn trailing_dot_is_accepted() {
        assert_eq!(normalize_price("12."), Some(dec("12")));
    }

    #[test]
    fn invalid_literals_yield_none() {
        assert_eq!(normalize_price("1.2.3"), None);
        assert_eq!(normalize_price("Sold out"), None);
        assert_eq!(normalize_price(""), None);
    }

    #[test]
    fn decimal_arithmetic_is_exact() {
        let price = normalize_price("0,10").unwrap() + normalize_price("0.20").unwrap();
        assert_eq!(price, dec("0.30"));
    }

    #[test]
    fn reasonable_price_bounds() {
        assert!(is_reasonable_price(dec("0.01")));
        assert!(is_reasonable_price(dec("9999999.99")));
        assert!(!is_reasonable_price(Decimal::ZERO));
        assert!(!is_reasonable_price(dec("10000000")));
        assert!(!is_reasonable_price(dec("-3")));
    }
}
