//! Batch price checks.
//!
//! Items are checked concurrently (bounded by `max_concurrent`), each under
//! its own timeout. A failure for one item, whether a fetch error, a timeout,
//! or a database error while recording, never aborts the batch.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use pricewatch_core::PriceDirection;
use pricewatch_db::{DbError, ItemRow, NewPriceCheck};
use pricewatch_scraper::{ExtractError, ExtractionResult, Extractor, Locator, PageClient};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;

/// A price movement between two successful checks of the same item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct PriceChange {
    pub item_id: i64,
    pub name: String,
    pub url: String,
    pub currency: String,
    pub previous: Decimal,
    pub current: Decimal,
    pub direction: PriceDirection,
}

/// Totals for one batch run.
#[derive(Debug, Default)]
pub(crate) struct CheckTotals {
    pub checked: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Items whose check result could not be recorded.
    pub db_errors: usize,
    pub changes: Vec<PriceChange>,
}

/// Shared, read-only inputs for a batch.
pub(crate) struct CheckContext<'a> {
    pub pool: &'a PgPool,
    pub client: &'a PageClient,
    pub extractor: &'a Extractor<'a>,
    pub item_timeout: Duration,
}

enum ItemOutcome {
    Recorded {
        success: bool,
        change: Option<PriceChange>,
    },
    DbError,
}

/// Fetches and extracts one item's page, giving up after `item_timeout`.
pub(crate) async fn check_page(
    client: &PageClient,
    extractor: &Extractor<'_>,
    item: &ItemRow,
    item_timeout: Duration,
) -> ExtractionResult {
    let locator = Locator::from_item(&item.locator, &item.locator_kind);
    match tokio::time::timeout(item_timeout, client.check(&item.url, locator.as_ref(), extractor))
        .await
    {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                item_id = item.id,
                url = %item.url,
                timeout_secs = item_timeout.as_secs(),
                "price check timed out"
            );
            ExtractionResult::failed(
                ExtractError::Fetch(format!(
                    "HTTP error: timed out after {} seconds",
                    item_timeout.as_secs()
                )),
                None,
            )
        }
    }
}

/// Converts an extraction outcome into the row recorded for it.
pub(crate) fn to_new_price_check(result: &ExtractionResult) -> NewPriceCheck {
    NewPriceCheck {
        price: result.price,
        raw_text: result.raw_text.clone(),
        success: result.success,
        error: result.error_message(),
    }
}

/// Compares a successful result with the item's previous successful price.
pub(crate) fn detect_change(
    item: &ItemRow,
    previous: Option<Decimal>,
    result: &ExtractionResult,
) -> Option<PriceChange> {
    let current = result.price.filter(|_| result.success)?;
    let previous = previous?;
    let direction = PriceDirection::between(previous, current)?;
    Some(PriceChange {
        item_id: item.id,
        name: item.name.clone(),
        url: item.url.clone(),
        currency: result
            .currency
            .clone()
            .unwrap_or_else(|| item.currency.clone()),
        previous,
        current,
        direction,
    })
}

/// Records `result` for `item` and returns the price change it represents.
///
/// The previous price is read before the new check is written. The check
/// and the detected currency are stored together or not at all.
pub(crate) async fn record_check(
    pool: &PgPool,
    item: &ItemRow,
    result: &ExtractionResult,
) -> Result<Option<PriceChange>, DbError> {
    let previous = pricewatch_db::get_latest_successful_price(pool, item.id).await?;
    let currency = result.currency.as_deref().filter(|_| result.success);
    pricewatch_db::record_price_check(pool, item.id, &to_new_price_check(result), currency)
        .await?;

    Ok(detect_change(item, previous, result))
}

async fn process_item(ctx: &CheckContext<'_>, item: &ItemRow) -> ItemOutcome {
    let result = check_page(ctx.client, ctx.extractor, item, ctx.item_timeout).await;

    if let Some(error) = &result.error {
        tracing::warn!(item_id = item.id, url = %item.url, error = %error, "price check failed");
    } else {
        tracing::debug!(
            item_id = item.id,
            price = ?result.price,
            currency = ?result.currency,
            "price check succeeded"
        );
    }

    match record_check(ctx.pool, item, &result).await {
        Ok(change) => ItemOutcome::Recorded {
            success: result.success,
            change,
        },
        Err(e) => {
            tracing::error!(item_id = item.id, error = %e, "failed to record price check");
            ItemOutcome::DbError
        }
    }
}

/// Checks every item in `items` and records the outcomes.
pub(crate) async fn run_price_checks(
    ctx: &CheckContext<'_>,
    items: &[ItemRow],
    max_concurrent: usize,
) -> CheckTotals {
    let outcomes: Vec<ItemOutcome> = stream::iter(items)
        .map(|item| process_item(ctx, item))
        .buffer_unordered(max_concurrent.max(1))
        .boxed()
        .collect()
        .await;

    let mut totals = CheckTotals {
        checked: items.len(),
        ..CheckTotals::default()
    };
    for outcome in outcomes {
        match outcome {
            ItemOutcome::Recorded { success, change } => {
                if success {
                    totals.succeeded += 1;
                } else {
                    totals.failed += 1;
                }
                totals.changes.extend(change);
            }
            ItemOutcome::DbError => {
                totals.failed += 1;
                totals.db_errors += 1;
            }
        }
    }
    totals.changes.sort_by_key(|c| c.item_id);

    tracing::info!(
        checked = totals.checked,
        succeeded = totals.succeeded,
        failed = totals.failed,
        db_errors = totals.db_errors,
        changes = totals.changes.len(),
        "price check run complete"
    );
    totals
}

#[cfg(test)]
#[path = "runner_test.rs"]
mod tests;
