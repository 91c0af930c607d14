//! Best-effort item names for newly added pages.

use std::sync::LazyLock;

use reqwest::Url;
use scraper::{Html, Selector};

const MAX_NAME_CHARS: usize = 180;

static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).expect("valid og:title selector"));
static TWITTER_TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"meta[name="twitter:title"]"#).expect("valid twitter:title selector")
});
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid h1 selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid title selector"));

fn clean(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(MAX_NAME_CHARS).collect())
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .find_map(clean)
}

/// Picks a display name from the page: `og:title`, `twitter:title`, the
/// direct text of an `<h1>`, then `<title>`. Falls back to
/// `"Item from <host>"`, or `None` when `url` has no host.
#[must_use]
pub fn detect_name_in_html(html: &str, url: &str) -> Option<String> {
    let document = Html::parse_document(html);

    meta_content(&document, &OG_TITLE)
        .or_else(|| meta_content(&document, &TWITTER_TITLE))
        .or_else(|| {
            document.select(&H1).find_map(|h1| {
                h1.children()
                    .filter_map(|child| child.value().as_text().map(|t| t.to_string()))
                    .find_map(|text| clean(&text))
            })
        })
        .or_else(|| {
            document
                .select(&TITLE)
                .find_map(|title| clean(&title.text().collect::<String>()))
        })
        .or_else(|| fallback_name(url))
}

fn fallback_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(match parsed.port() {
        Some(port) => format!("Item from {host}:{port}"),
        None => format!("Item from {host}"),
    })
}
