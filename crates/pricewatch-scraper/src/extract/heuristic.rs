//! Last-resort scan for price-looking text when no locator, structured data,
//! or meta tag produced anything.

use std::sync::LazyLock;

use regex::Regex;

use super::currency::detect_in_text;
use super::dom::{Dom, DomNode};
use super::price::{is_reasonable_price, normalize_price};
use crate::currency::CurrencyTables;

const MAX_CANDIDATE_CHARS: usize = 120;
const SHORT_CANDIDATE_CHARS: usize = 32;
const SCAN_SYMBOLS: [char; 5] = ['$', '€', '£', '¥', '₹'];
const HINT_WORDS: [&str; 4] = ["price", "sale", "now", "from"];

static TWO_DECIMALS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+[.,]\d{2}\b").expect("valid two-decimal regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Candidate {
    pub text: String,
    pub score: i32,
}

/// Text nodes worth scoring, in scan order: direct text of elements whose
/// class or id mentions "price", then "amount", then any text holding a
/// common currency symbol.
fn collect_candidates<'a>(dom: &Dom<'a>) -> Vec<&'a str> {
    let mut found = Vec::new();

    for marker in ["price", "amount"] {
        for index in 0..dom.len() {
            let Some(element) = dom.element(index) else {
                continue;
            };
            let tagged = ["class", "id"].iter().any(|attr| {
                element
                    .value()
                    .attr(attr)
                    .is_some_and(|v| v.to_lowercase().contains(marker))
            });
            if !tagged || dom.in_raw_text_element(index) {
                continue;
            }
            found.extend(dom.children(index).iter().filter_map(|&child| {
                match dom.node(child) {
                    DomNode::Text(text) => Some(text),
                    _ => None,
                }
            }));
        }
    }

    for index in 0..dom.len() {
        if let DomNode::Text(text) = dom.node(index) {
            if text.contains(&SCAN_SYMBOLS[..]) && !dom.in_raw_text_element(index) {
                found.push(text);
            }
        }
    }

    found
}

/// Scores a single candidate, or `None` when it cannot be a price.
pub(crate) fn score(text: &str, tables: &CurrencyTables) -> Option<Candidate> {
    let value = text.trim();
    let length = value.chars().count();
    if value.is_empty() || length > MAX_CANDIDATE_CHARS {
        return None;
    }
    if !normalize_price(value).is_some_and(is_reasonable_price) {
        return None;
    }

    let lower = value.to_lowercase();
    let mut score = 0;
    if detect_in_text(value, tables).is_some() {
        score += 3;
    }
    if TWO_DECIMALS_RE.is_match(value) {
        score += 2;
    }
    if HINT_WORDS.iter().any(|word| lower.contains(word)) {
        score += 1;
    }
    if length < SHORT_CANDIDATE_CHARS {
        score += 1;
    }

    Some(Candidate {
        text: value.to_owned(),
        score,
    })
}

/// Best-scoring candidate text; the earliest one wins a tie.
pub(crate) fn find_price(dom: &Dom<'_>, tables: &CurrencyTables) -> Option<String> {
    let mut best: Option<Candidate> = None;
    for candidate in collect_candidates(dom)
        .into_iter()
        .filter_map(|text| score(text, tables))
    {
        if best.as_ref().is_none_or(|b| candidate.score > b.score) {
            best = Some(candidate);
        }
    }
    best.map(|c| {
        tracing::debug!(text = %c.text, score = c.score, "heuristic candidate selected");
        c.text
    })
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::*;

    fn scan(html: &str) -> Option<String> {
        let doc = Html::parse_document(html);
        let dom = Dom::build(&doc);
        find_price(&dom, CurrencyTables::standard())
    }

    #[test]
    fn scoring_rules() {
        let tables = CurrencyTables::standard();
        assert_eq!(score("$19.99", tables).unwrap().score, 6);
        assert_eq!(score("19.99", tables).unwrap().score, 3);
        assert_eq!(score("Sale 20", tables).unwrap().score, 2);
        assert_eq!(score("Price now only 20", tables).unwrap().score, 2);
    }

    #[test]
    fn implausible_candidates_are_rejected() {
        let tables = CurrencyTables::standard();
        assert!(score("   ", tables).is_none());
        assert!(score("0.00", tables).is_none());
        assert!(score("$ 12,000,000", tables).is_none());
        assert!(score("no digits here", tables).is_none());
        assert!(score(&format!("  $99{}", " ".repeat(130)), tables).is_some());
        assert!(score(&format!("$9 {}", "x".repeat(130)), tables).is_none());
    }

    #[test]
    fn highest_score_wins() {
        let html = r#"<body><span class="price">19</span><p>Only $24.99 today</p></body>"#;
        assert_eq!(scan(html).as_deref(), Some("Only $24.99 today"));
    }

    #[test]
    fn ties_go_to_first_candidate_in_scan_order() {
        let html = r#"<body><div class="Product-Price">$10.00</div><div id="price-alt">$12.00</div></body>"#;
        assert_eq!(scan(html).as_deref(), Some("$10.00"));
    }

    #[test]
    fn price_markers_are_scanned_before_symbols() {
        let html = r#"<body><p>$30.00</p><span class="amount">$40.00</span></body>"#;
        assert_eq!(scan(html).as_deref(), Some("$40.00"));
    }

    #[test]
    fn script_text_is_not_a_candidate() {
        let html = r#"<body><script>var p = "$5.00";</script><p>no prices</p></body>"#;
        assert_eq!(scan(html), None);
    }
}
