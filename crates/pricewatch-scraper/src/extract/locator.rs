//! User-supplied locators: CSS selectors (with `::text` / `::attr()`) and
//! path queries.

use std::str::FromStr;
use std::sync::LazyLock;

use pricewatch_core::LocatorKind;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::dom::{first_non_empty_text, Dom};
use super::path_query::PathQuery;
use crate::error::ExtractError;

static ATTR_SUFFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"::attr\(\s*([^)\s]+)\s*\)\s*$").expect("valid attr suffix regex"));

const TEXT_SUFFIX: &str = "::text";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Projection {
    Full,
    Text,
    Attr(String),
}

/// Splits a trailing `::text` / `::attr(name)` off a CSS query.
fn split_projection(query: &str) -> (&str, Projection) {
    let trimmed = query.trim_end();
    if let Some(base) = trimmed.strip_suffix(TEXT_SUFFIX) {
        return (base, Projection::Text);
    }
    if let Some(caps) = ATTR_SUFFIX_RE.captures(trimmed) {
        let whole = caps.get(0).map_or(trimmed.len(), |m| m.start());
        let name = caps.get(1).map_or("", |m| m.as_str()).to_owned();
        return (&trimmed[..whole], Projection::Attr(name));
    }
    (trimmed, Projection::Full)
}

fn project(element: ElementRef<'_>, projection: &Projection) -> Vec<String> {
    match projection {
        Projection::Full => vec![element.text().collect()],
        Projection::Text => element
            .children()
            .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
            .collect(),
        Projection::Attr(name) => element
            .value()
            .attr(name)
            .map(str::to_owned)
            .into_iter()
            .collect(),
    }
}

fn css_once(document: &Html, query: &str) -> Result<Option<String>, ExtractError> {
    let (base, projection) = split_projection(query);
    let selector = Selector::parse(base.trim())
        .map_err(|e| ExtractError::Selector(format!("Invalid CSS selector: {e}")))?;
    Ok(first_non_empty_text(
        document
            .select(&selector)
            .flat_map(|element| project(element, &projection)),
    ))
}

fn css(document: &Html, query: &str) -> Result<Option<String>, ExtractError> {
    if let Some(text) = css_once(document, query)? {
        return Ok(Some(text));
    }
    if query.contains("::") {
        return Ok(None);
    }
    for suffix in [TEXT_SUFFIX, "::attr(content)"] {
        let retry = format!("{}{suffix}", query.trim_end());
        if let Some(text) = css_once(document, &retry)? {
            tracing::debug!(query = %retry, "locator matched on retry");
            return Ok(Some(text));
        }
    }
    Ok(None)
}

fn path(dom: &Dom<'_>, query: &str) -> Result<Option<String>, ExtractError> {
    let compiled = PathQuery::parse(query.trim())
        .map_err(|e| ExtractError::Selector(format!("Invalid XPath selector: {e}")))?;
    Ok(first_non_empty_text(compiled.evaluate(dom)))
}

/// Runs a locator against the page.
///
/// Returns `Ok(None)` when the locator is valid but matches nothing.
///
/// # Errors
///
/// Returns [`ExtractError::Selector`] when the kind is unknown or the query
/// does not parse.
pub(crate) fn run(
    document: &Html,
    dom: &Dom<'_>,
    query: &str,
    kind: &str,
) -> Result<Option<String>, ExtractError> {
    let kind = LocatorKind::from_str(kind)
        .map_err(|_| ExtractError::Selector("Selector type must be css or xpath.".to_owned()))?;
    match kind {
        LocatorKind::Css => css(document, query),
        LocatorKind::Path => path(dom, query),
    }
}
