//! Layered price extraction.
//!
//! A check runs the configured locator when one is set. Without one, the page
//! is tried against JSON-LD structured data, then price meta tags, then a
//! scored scan of the visible text. The first text found is normalized into a
//! decimal and paired with a detected currency.

mod currency;
mod dom;
mod heuristic;
mod locator;
mod meta;
pub mod path_query;
pub mod price;
mod structured;

use rust_decimal::Decimal;
use scraper::Html;
use serde::Serialize;
use tracing::debug;

use crate::currency::CurrencyTables;
use crate::error::ExtractError;

pub use price::{is_reasonable_price, normalize_price};

/// A user-configured way to find the price on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator<'a> {
    pub query: &'a str,
    /// `css` or `xpath`; anything else fails the check.
    pub kind: &'a str,
}

impl<'a> Locator<'a> {
    #[must_use]
    pub fn new(query: &'a str, kind: &'a str) -> Self {
        Self { query, kind }
    }

    /// Builds a locator from stored item columns; a blank query means none.
    #[must_use]
    pub fn from_item(query: &'a str, kind: &'a str) -> Option<Self> {
        (!query.trim().is_empty()).then(|| Self::new(query, kind))
    }
}

/// Outcome of one price check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractionResult {
    pub success: bool,
    pub price: Option<Decimal>,
    pub raw_text: Option<String>,
    pub error: Option<ExtractError>,
    pub currency: Option<String>,
}

impl ExtractionResult {
    #[must_use]
    pub fn found(price: Decimal, raw_text: String, currency: Option<String>) -> Self {
        Self {
            success: true,
            price: Some(price),
            raw_text: Some(raw_text),
            error: None,
            currency,
        }
    }

    #[must_use]
    pub fn failed(error: ExtractError, raw_text: Option<String>) -> Self {
        Self {
            success: false,
            price: None,
            raw_text,
            error: Some(error),
            currency: None,
        }
    }

    /// User-facing error message, if the check failed.
    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}

/// Runs the extraction tiers against a page.
#[derive(Debug, Clone, Copy)]
pub struct Extractor<'t> {
    tables: &'t CurrencyTables,
}

impl Default for Extractor<'static> {
    fn default() -> Self {
        Self::new(CurrencyTables::standard())
    }
}

impl<'t> Extractor<'t> {
    #[must_use]
    pub fn new(tables: &'t CurrencyTables) -> Self {
        Self { tables }
    }

    #[must_use]
    pub fn tables(&self) -> &'t CurrencyTables {
        self.tables
    }

    /// Extracts a price and currency from an HTML body.
    ///
    /// Never panics on malformed markup; every failure is reported through
    /// [`ExtractionResult::error`].
    #[must_use]
    pub fn extract(&self, html: &str, locator: Option<&Locator<'_>>) -> ExtractionResult {
        let document = Html::parse_document(html);
        let dom = dom::Dom::build(&document);
        let payloads = structured::payloads(&document);

        let raw = match locator.filter(|l| !l.query.trim().is_empty()) {
            Some(locator) => {
                match locator::run(&document, &dom, locator.query, locator.kind) {
                    Ok(Some(text)) => {
                        debug!(query = locator.query, kind = locator.kind, "locator matched");
                        text
                    }
                    Ok(None) => {
                        debug!(query = locator.query, kind = locator.kind, "locator matched nothing");
                        return ExtractionResult::failed(ExtractError::LocatorNoMatch, None);
                    }
                    Err(e) => {
                        debug!(query = locator.query, error = %e, "locator rejected");
                        return ExtractionResult::failed(e, None);
                    }
                }
            }
            None => match self.automatic(&document, &dom, &payloads) {
                Some(text) => text,
                None => return ExtractionResult::failed(ExtractError::NoPriceFound, None),
            },
        };

        let Some(price) = normalize_price(&raw) else {
            debug!(raw_text = %raw, "matched text is not a number");
            return ExtractionResult::failed(ExtractError::UnparsablePrice, Some(raw));
        };

        let currency = currency::detect(&document, &payloads, Some(&raw), self.tables);
        debug!(%price, currency = ?currency, "price extracted");
        ExtractionResult::found(price, raw, currency)
    }

    fn automatic(
        &self,
        document: &Html,
        dom: &dom::Dom<'_>,
        payloads: &[serde_json::Value],
    ) -> Option<String> {
        if let Some(text) = structured::find_price(payloads) {
            debug!(tier = "structured", raw_text = %text, "price text found");
            return Some(text);
        }
        if let Some(text) = meta::find_price(document) {
            debug!(tier = "meta", raw_text = %text, "price text found");
            return Some(text);
        }
        if let Some(text) = heuristic::find_price(dom, self.tables) {
            debug!(tier = "heuristic", raw_text = %text, "price text found");
            return Some(text);
        }
        debug!("no tier produced price text");
        None
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
