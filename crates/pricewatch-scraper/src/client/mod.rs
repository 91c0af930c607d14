//! HTTP client for fetching product pages.

mod origin;

use std::time::Duration;

use reqwest::Client;

use crate::error::{ExtractError, ScraperError};
use crate::extract::{ExtractionResult, Extractor, Locator};
use crate::name::detect_name_in_html;

pub use origin::{host_label, page_url};

/// Default request timeout for page fetches.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Fetches product pages and runs the extraction tiers on them.
///
/// Non-2xx responses are typed errors. Requests are not retried: a failed
/// check is recorded and the next scheduled run tries again.
#[derive(Debug, Clone)]
pub struct PageClient {
    client: Client,
}

impl PageClient {
    /// Creates a `PageClient` with the given timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed (e.g., invalid TLS config).
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, ScraperError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    /// Downloads `url` and returns the response body.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::InvalidUrl`] if `url` is not an absolute http(s) URL.
    /// - [`ScraperError::UnexpectedStatus`] on any non-2xx status.
    /// - [`ScraperError::Http`] on a network, TLS, or timeout failure.
    pub async fn fetch(&self, url: &str) -> Result<String, ScraperError> {
        let target = page_url(url)?;

        let response = self
            .client
            .get(target)
            .header(reqwest::header::ACCEPT, ACCEPT_HTML)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_owned(),
            });
        }

        let body = response.text().await?;
        tracing::debug!(host = %host_label(url), bytes = body.len(), "page fetched");
        Ok(body)
    }

    /// Fetches `url` and extracts its price. A fetch failure is reported as
    /// [`ExtractError::Fetch`] without running any tier.
    pub async fn check(
        &self,
        url: &str,
        locator: Option<&Locator<'_>>,
        extractor: &Extractor<'_>,
    ) -> ExtractionResult {
        match self.fetch(url).await {
            Ok(html) => extractor.extract(&html, locator),
            Err(e) => {
                tracing::warn!(url, error = %e, "page fetch failed");
                ExtractionResult::failed(ExtractError::from(e), None)
            }
        }
    }

    /// Fetches `url` and picks a display name for it. Returns `None` when the
    /// page cannot be fetched.
    pub async fn detect_name(&self, url: &str) -> Option<String> {
        match self.fetch(url).await {
            Ok(html) => detect_name_in_html(&html, url),
            Err(e) => {
                tracing::debug!(url, error = %e, "name detection fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
