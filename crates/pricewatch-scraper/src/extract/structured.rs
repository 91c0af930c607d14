//! JSON-LD (`application/ld+json`) price and currency lookup.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde_json::{Map, Value};

use crate::currency::CurrencyTables;

static LD_JSON_SCRIPT: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("valid ld+json selector")
});

/// Nesting below this depth is not inspected.
pub(crate) const MAX_DEPTH: usize = 50;

const PRICE_KEYS: [&str; 3] = ["price", "lowPrice", "highPrice"];
const OFFER_KEYS: [&str; 3] = ["offers", "mainEntity", "itemOffered"];
const CURRENCY_KEY: &str = "priceCurrency";

/// Parses every JSON-LD script on the page. Scripts that are empty or not
/// valid JSON are skipped.
pub(crate) fn payloads(document: &Html) -> Vec<Value> {
    document
        .select(&LD_JSON_SCRIPT)
        .filter_map(|script| {
            let body: String = script.text().collect();
            let body = body.trim();
            if body.is_empty() {
                return None;
            }
            match serde_json::from_str::<Value>(body) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping malformed ld+json payload");
                    None
                }
            }
        })
        .collect()
}

/// First `price`, `lowPrice` or `highPrice` value across all payloads.
pub(crate) fn find_price(payloads: &[Value]) -> Option<String> {
    payloads.iter().find_map(|payload| {
        walk(payload, |map| {
            PRICE_KEYS
                .iter()
                .find_map(|key| map.get(*key).and_then(scalar_text))
        })
    })
}

/// First `priceCurrency` across all payloads; known codes come back
/// upper-cased, anything else as found.
pub(crate) fn find_currency(payloads: &[Value], tables: &CurrencyTables) -> Option<String> {
    payloads.iter().find_map(|payload| {
        walk(payload, |map| match map.get(CURRENCY_KEY) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(tables.canonicalize(s)),
            _ => None,
        })
    })
}

/// Depth-first, pre-order walk that stops at the first mapping for which
/// `visit` returns a value. Offer-like keys are explored before the rest of a
/// mapping's values; list elements keep their order.
fn walk<'v, F>(root: &'v Value, mut visit: F) -> Option<String>
where
    F: FnMut(&'v Map<String, Value>) -> Option<String>,
{
    let mut stack: Vec<(&'v Value, usize)> = vec![(root, 0)];

    while let Some((node, depth)) = stack.pop() {
        let children: Vec<&'v Value> = match node {
            Value::Object(map) => {
                if let Some(found) = visit(map) {
                    return Some(found);
                }
                OFFER_KEYS
                    .iter()
                    .filter_map(|key| map.get(*key))
                    .chain(
                        map.iter()
                            .filter(|(key, _)| !OFFER_KEYS.contains(&key.as_str()))
                            .map(|(_, value)| value),
                    )
                    .collect()
            }
            Value::Array(items) => items.iter().collect(),
            _ => continue,
        };

        if depth >= MAX_DEPTH {
            tracing::debug!(depth, "ld+json nesting limit reached");
            continue;
        }
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }

    None
}

fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}
