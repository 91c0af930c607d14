//! Well-known `<meta>` price and currency tags.

use std::sync::LazyLock;

use scraper::{Html, Selector};

use super::dom::first_non_empty_text;
use crate::currency::CurrencyTables;

/// Price tags, most standard first.
const PRICE_SELECTORS: [&str; 5] = [
    r#"meta[property="product:price:amount"]"#,
    r#"meta[property="og:price:amount"]"#,
    r#"meta[property="og:price:standard_amount"]"#,
    r#"meta[name="twitter:data1"]"#,
    r#"meta[itemprop="price"]"#,
];

const CURRENCY_SELECTORS: [&str; 3] = [
    r#"meta[property="product:price:currency"]"#,
    r#"meta[property="og:price:currency"]"#,
    r#"meta[itemprop="priceCurrency"]"#,
];

static PRICE_TAGS: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&PRICE_SELECTORS));
static CURRENCY_TAGS: LazyLock<Vec<Selector>> = LazyLock::new(|| compile(&CURRENCY_SELECTORS));

fn compile(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .map(|s| Selector::parse(s).expect("valid meta selector"))
        .collect()
}

fn first_content(document: &Html, selectors: &[Selector]) -> Option<String> {
    selectors.iter().find_map(|selector| {
        first_non_empty_text(
            document
                .select(selector)
                .filter_map(|el| el.value().attr("content")),
        )
    })
}

/// Content of the first non-empty price tag, in list order.
pub(crate) fn find_price(document: &Html) -> Option<String> {
    first_content(document, &PRICE_TAGS)
}

/// Content of the first non-empty currency tag; known codes are upper-cased.
pub(crate) fn find_currency(document: &Html, tables: &CurrencyTables) -> Option<String> {
    first_content(document, &CURRENCY_TAGS).map(|value| tables.canonicalize(&value))
}
