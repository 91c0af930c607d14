//! Price-change notifications.
//!
//! A batch run hands every detected [`PriceChange`] to one [`Notifier`]. The
//! default logs them; with `PRICEWATCH_NOTIFY_WEBHOOK_URL` set they are also
//! POSTed as JSON.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use anyhow::Context;
use pricewatch_core::{AppConfig, DEFAULT_CURRENCY};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::check::PriceChange;

pub(crate) type NotifyFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Destination for price-change alerts.
pub(crate) trait Notifier: Send + Sync {
    fn notify<'a>(&'a self, changes: &'a [PriceChange]) -> NotifyFuture<'a>;
}

/// `$12.50` style amount with two decimals; a blank currency falls back to `$`.
pub(crate) fn format_amount(currency: &str, amount: Decimal) -> String {
    let currency = if currency.trim().is_empty() {
        DEFAULT_CURRENCY
    } else {
        currency.trim()
    };
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{currency}{rounded:.2}")
}

/// One line per change: `- <name>: <cur><old> -> <cur><new> (<url>)`.
pub(crate) fn render_plain_text(changes: &[PriceChange]) -> String {
    changes
        .iter()
        .map(|c| {
            format!(
                "- {}: {} -> {} ({})",
                c.name,
                format_amount(&c.currency, c.previous),
                format_amount(&c.currency, c.current),
                c.url
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ---------------------------------------------------------------------------
// Log
// ---------------------------------------------------------------------------

/// Writes each change to the log.
#[derive(Debug, Default)]
pub(crate) struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify<'a>(&'a self, changes: &'a [PriceChange]) -> NotifyFuture<'a> {
        Box::pin(async move {
            for change in changes {
                tracing::info!(
                    item_id = change.item_id,
                    name = %change.name,
                    previous = %change.previous,
                    current = %change.current,
                    direction = %change.direction,
                    "price changed"
                );
            }
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Webhook
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    text: String,
    changes: &'a [PriceChange],
}

/// POSTs changes as JSON: `{"text": <plain text>, "changes": [...]}`.
#[derive(Debug, Clone)]
pub(crate) struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub(crate) fn new(url: &str, timeout_secs: u64) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build webhook HTTP client")?;
        Ok(Self {
            client,
            url: url.to_owned(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn notify<'a>(&'a self, changes: &'a [PriceChange]) -> NotifyFuture<'a> {
        Box::pin(async move {
            let payload = WebhookPayload {
                text: render_plain_text(changes),
                changes,
            };
            let response = self
                .client
                .post(&self.url)
                .json(&payload)
                .send()
                .await
                .context("webhook request failed")?;
            let status = response.status();
            if !status.is_success() {
                anyhow::bail!("webhook returned HTTP {status}");
            }
            tracing::debug!(count = changes.len(), "webhook notified");
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Fan-out
// ---------------------------------------------------------------------------

/// Always logs, then forwards to the webhook when one is configured.
pub(crate) struct ConfiguredNotifier {
    log: LogNotifier,
    webhook: Option<WebhookNotifier>,
}

impl Notifier for ConfiguredNotifier {
    fn notify<'a>(&'a self, changes: &'a [PriceChange]) -> NotifyFuture<'a> {
        Box::pin(async move {
            self.log.notify(changes).await?;
            if let Some(webhook) = &self.webhook {
                webhook.notify(changes).await?;
            }
            Ok(())
        })
    }
}

pub(crate) fn build_notifier(config: &AppConfig) -> anyhow::Result<ConfiguredNotifier> {
    let webhook = config
        .notify_webhook_url
        .as_deref()
        .map(|url| WebhookNotifier::new(url, config.request_timeout_secs))
        .transpose()?;
    Ok(ConfiguredNotifier {
        log: LogNotifier,
        webhook,
    })
}

/// Sends `changes` when there are any; failures are logged, not returned.
pub(crate) async fn notify_best_effort(notifier: &dyn Notifier, changes: &[PriceChange]) {
    if changes.is_empty() {
        return;
    }
    if let Err(e) = notifier.notify(changes).await {
        tracing::warn!(error = %e, count = changes.len(), "failed to send price-change notification");
    }
}

#[cfg(test)]
mod tests {
    use pricewatch_core::PriceDirection;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn change(currency: &str) -> PriceChange {
        PriceChange {
            item_id: 3,
            name: "Desk Lamp".to_string(),
            url: "https://shop.example.com/lamp".to_string(),
            currency: currency.to_string(),
            previous: Decimal::new(4990, 2),
            current: Decimal::new(3999, 2),
            direction: PriceDirection::Lower,
        }
    }

    #[test]
    fn plain_text_lines() {
        let text = render_plain_text(&[change("€"), change("")]);
        assert_eq!(
            text,
            "- Desk Lamp: €49.90 -> €39.99 (https://shop.example.com/lamp)\n\
             - Desk Lamp: $49.90 -> $39.99 (https://shop.example.com/lamp)"
        );
    }

    #[test]
    fn amounts_round_to_two_decimals() {
        assert_eq!(format_amount("USD ", Decimal::new(12_345, 3)), "USD12.35");
        assert_eq!(format_amount("$", Decimal::new(7, 0)), "$7.00");
    }

    #[tokio::test]
    async fn webhook_posts_text_and_changes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(body_partial_json(serde_json::json!({
                "changes": [{"item_id": 3, "direction": "lower", "current": "39.99"}]
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(&format!("{}/hook", server.uri()), 5).unwrap();
        notifier.notify(&[change("$")]).await.expect("webhook should succeed");
    }

    #[tokio::test]
    async fn webhook_error_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(&server.uri(), 5).unwrap();
        let err = notifier.notify(&[change("$")]).await.unwrap_err();
        assert!(err.to_string().contains("500"), "{err}");
    }

    #[tokio::test]
    async fn empty_changes_are_not_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::new(&server.uri(), 5).unwrap();
        notify_best_effort(&notifier, &[]).await;
    }
}
