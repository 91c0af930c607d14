//! Currency detection for matched price text and the page around it.

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;
use serde_json::Value;

use super::{meta, structured};
use crate::currency::CurrencyTables;

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z]{3}\b").expect("valid currency code regex"));

/// Finds a currency in free text: the first three-letter word when it is a
/// known code (case-insensitive), else the first listed symbol present.
///
/// Only the first code-shaped word is considered, so `"NEW 5 GBP"` has no
/// currency.
pub(crate) fn detect_in_text(text: &str, tables: &CurrencyTables) -> Option<String> {
    let upper = text.to_uppercase();
    if let Some(code) = CODE_RE
        .find(&upper)
        .map(|m| m.as_str())
        .filter(|code| tables.is_known_code(code))
    {
        return Some(code.to_owned());
    }

    tables
        .symbols()
        .find(|symbol| text.contains(symbol))
        .map(str::to_owned)
}

/// Currency for a successful extraction: the matched text first, then the
/// page's structured data, then its meta tags.
pub(crate) fn detect(
    document: &Html,
    payloads: &[Value],
    raw_text: Option<&str>,
    tables: &CurrencyTables,
) -> Option<String> {
    raw_text
        .and_then(|text| detect_in_text(text, tables))
        .or_else(|| structured::find_currency(payloads, tables))
        .or_else(|| meta::find_currency(document, tables))
}
