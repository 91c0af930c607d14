//! Known currency codes and symbols.
//!
//! The tables are plain data handed to the [`crate::Extractor`]; the process
//! default is built once by [`CurrencyTables::standard`].

use std::collections::HashSet;
use std::sync::LazyLock;

const STANDARD_CODES: [&str; 25] = [
    "USD", "EUR", "GBP", "JPY", "CNY", "INR", "CAD", "AUD", "CHF", "SEK", "NOK", "DKK", "PLN",
    "CZK", "HUF", "RON", "TRY", "BRL", "MXN", "ZAR", "AED", "SAR", "ILS", "KRW", "RUB",
];

const STANDARD_SYMBOLS: [&str; 16] = [
    "R$", "zł", "lei", "€", "£", "$", "¥", "₩", "₹", "₽", "₺", "₴", "₫", "₦", "₪", "₱",
];

static STANDARD: LazyLock<CurrencyTables> =
    LazyLock::new(|| CurrencyTables::new(STANDARD_CODES, STANDARD_SYMBOLS));

/// Three-letter codes plus an ordered symbol list.
///
/// Multi-character symbols are kept ahead of single-character ones so that
/// `R$` is found before `$`.
#[derive(Debug, Clone)]
pub struct CurrencyTables {
    codes: HashSet<String>,
    symbols: Vec<String>,
}

impl CurrencyTables {
    /// Builds tables from arbitrary codes and symbols. Codes are upper-cased;
    /// multi-character symbols are moved ahead of single-character ones,
    /// otherwise keeping the given order.
    pub fn new<C, S>(codes: C, symbols: S) -> Self
    where
        C: IntoIterator,
        C::Item: AsRef<str>,
        S: IntoIterator,
        S::Item: AsRef<str>,
    {
        let codes = codes
            .into_iter()
            .map(|c| c.as_ref().trim().to_ascii_uppercase())
            .filter(|c| !c.is_empty())
            .collect();

        let mut symbols: Vec<String> = symbols
            .into_iter()
            .map(|s| s.as_ref().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
        symbols.sort_by_key(|s| s.chars().count() == 1);

        Self { codes, symbols }
    }

    /// The process-wide default tables.
    #[must_use]
    pub fn standard() -> &'static CurrencyTables {
        &STANDARD
    }

    #[must_use]
    pub fn is_known_code(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    /// Symbols in match priority order.
    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(String::as_str)
    }

    /// Upper-cases `value` when it is a known code, otherwise returns it
    /// trimmed but otherwise untouched.
    #[must_use]
    pub fn canonicalize(&self, value: &str) -> String {
        let trimmed = value.trim();
        let upper = trimmed.to_uppercase();
        if self.is_known_code(&upper) {
            upper
        } else {
            trimmed.to_owned()
        }
    }
}

impl Default for CurrencyTables {
    fn default() -> Self {
        Self::standard().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_tables_put_multi_char_symbols_first() {
        let symbols: Vec<&str> = CurrencyTables::standard().symbols().collect();
        let real = symbols.iter().position(|s| *s == "R$").unwrap();
        let dollar = symbols.iter().position(|s| *s == "$").unwrap();
        assert!(real < dollar);
        assert_eq!(&symbols[..3], &["R$", "zł", "lei"]);
    }

    #[test]
    fn custom_tables_move_multi_char_symbols_first() {
        let tables = CurrencyTables::new(["usd"], ["$", "US$", "€"]);
        let symbols: Vec<&str> = tables.symbols().collect();
        assert_eq!(symbols, vec!["US$", "$", "€"]);
        assert!(tables.is_known_code("USD"));
    }

    #[test]
    fn canonicalize_uppercases_known_codes_only() {
        let tables = CurrencyTables::standard();
        assert_eq!(tables.canonicalize(" eur "), "EUR");
        assert_eq!(tables.canonicalize("€"), "€");
        assert_eq!(tables.canonicalize("Dollars"), "Dollars");
    }
}
