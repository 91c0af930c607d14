//! Database-free commands: `extract` and `detect-name`.

use std::path::Path;

use anyhow::Context;
use pricewatch_core::app_config::DEFAULT_USER_AGENT;
use pricewatch_core::AppConfig;
use pricewatch_scraper::client::DEFAULT_TIMEOUT_SECS;
use pricewatch_scraper::{ExtractionResult, Extractor, Locator, PageClient};

/// Builds a page client from the loaded config, or from defaults when no
/// config is available (these commands do not need `DATABASE_URL`).
pub(crate) fn page_client(config: Option<&AppConfig>) -> anyhow::Result<PageClient> {
    match config {
        Some(config) => crate::check::build_page_client(config),
        None => PageClient::new(DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT)
            .context("failed to build page client"),
    }
}

/// Where `extract` reads its HTML from.
#[derive(Debug)]
pub(crate) enum Source<'a> {
    Url(&'a str),
    File(&'a Path),
}

pub(crate) async fn extract(
    config: Option<&AppConfig>,
    source: Source<'_>,
    locator: Option<&str>,
    locator_kind: &str,
) -> anyhow::Result<ExtractionResult> {
    let extractor = Extractor::default();
    let locator = locator.and_then(|query| Locator::from_item(query, locator_kind));

    let result = match source {
        Source::Url(url) => {
            page_client(config)?
                .check(url, locator.as_ref(), &extractor)
                .await
        }
        Source::File(path) => {
            let html = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read {}", path.display()))?;
            extractor.extract(&html, locator.as_ref())
        }
    };
    Ok(result)
}

pub(crate) async fn run_extract(
    config: Option<&AppConfig>,
    source: Source<'_>,
    locator: Option<&str>,
    locator_kind: &str,
) -> anyhow::Result<()> {
    let result = extract(config, source, locator, locator_kind).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

pub(crate) async fn run_detect_name(config: Option<&AppConfig>, url: &str) -> anyhow::Result<()> {
    match page_client(config)?.detect_name(url).await {
        Some(name) => {
            println!("{name}");
            Ok(())
        }
        None => anyhow::bail!("could not fetch {url} to detect a name"),
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[tokio::test]
    async fn extract_reads_local_file() {
        let path = std::env::temp_dir().join(format!("pricewatch-extract-{}.html", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            write!(
                file,
                r#"<meta property="og:price:amount" content="19.99"><meta property="og:price:currency" content="EUR">"#
            )
            .unwrap();
        }

        let result = extract(None, Source::File(&path), None, "css").await.unwrap();
        std::fs::remove_file(&path).ok();

        assert!(result.success);
        assert_eq!(result.currency.as_deref(), Some("EUR"));
        assert_eq!(result.price.map(|p| p.to_string()).as_deref(), Some("19.99"));
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let path = Path::new("/nonexistent/pricewatch/page.html");
        assert!(extract(None, Source::File(path), None, "css").await.is_err());
    }
}
