//! URL validation and host extraction for the page client.

use reqwest::Url;

use crate::error::ScraperError;

/// Parses `url` and checks that it is an absolute http(s) URL with a host.
///
/// # Errors
///
/// Returns [`ScraperError::InvalidUrl`] describing the first problem found.
pub fn page_url(url: &str) -> Result<Url, ScraperError> {
    let invalid = |reason: String| ScraperError::InvalidUrl {
        url: url.to_owned(),
        reason,
    };

    let parsed = Url::parse(url.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme \"{}\"", parsed.scheme())));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_owned()));
    }
    Ok(parsed)
}

/// Hostname of `url` for log fields and messages.
///
/// Falls back to the full URL string if parsing fails.
#[must_use]
pub fn host_label(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
